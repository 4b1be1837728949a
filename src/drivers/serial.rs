//! Driver de porta serial COM1 (0x3F8).
//!
//! Espelho de debug de todos os logs do kernel. Escritas vão para um
//! buffer circular e são drenadas conforme o transmissor libera; em
//! pânico `force_flush` descarrega tudo de forma bloqueante.

use crate::arch::x86::ports::{inb, outb};
use crate::sync::spinlock::{Spinlock, SpinlockGuard};
use core::fmt;

/// Endereço base da porta COM1.
const COM1_PORT: u16 = 0x3F8;

const DATA_REG: u16 = 0;
const INT_ENABLE: u16 = 1;
const FIFO_CTRL: u16 = 2;
const LINE_CTRL: u16 = 3;
const MODEM_CTRL: u16 = 4;
const LINE_STATUS: u16 = 5;

const SERIAL_BUFFER_SIZE: usize = 4096;
const SERIAL_BUFFER_MASK: usize = SERIAL_BUFFER_SIZE - 1;

pub struct SerialPort {
    buffer: [u8; SERIAL_BUFFER_SIZE],
    head: usize,
    tail: usize,
    dropped_count: usize,
}

static SERIAL: Spinlock<SerialPort> = Spinlock::new(SerialPort {
    buffer: [0; SERIAL_BUFFER_SIZE],
    head: 0,
    tail: 0,
    dropped_count: 0,
});

impl SerialPort {
    /// Inicializa a COM1: 115200 baud, 8N1, FIFO ligada.
    fn init(&mut self) {
        // Desabilitar interrupções do hardware
        outb(COM1_PORT + INT_ENABLE, 0x00);

        // Baud rate (DLAB ligado): divisor 1 = 115200
        outb(COM1_PORT + LINE_CTRL, 0x80);
        outb(COM1_PORT + DATA_REG, 0x01);
        outb(COM1_PORT + INT_ENABLE, 0x00);

        // 8 bits, sem paridade, 1 stop bit
        outb(COM1_PORT + LINE_CTRL, 0x03);

        // FIFO ligada, buffers limpos, threshold de 14 bytes
        outb(COM1_PORT + FIFO_CTRL, 0xC7);

        // RTS/DSR
        outb(COM1_PORT + MODEM_CTRL, 0x0B);
    }

    /// Transmissor vazio? (bit 5 do Line Status, porta 0x3FD)
    fn is_transmit_empty(&self) -> bool {
        inb(COM1_PORT + LINE_STATUS) & 0x20 != 0
    }

    /// Escreve byte no buffer circular (lock já adquirido).
    fn write_byte_internal(&mut self, byte: u8) {
        let next_head = (self.head + 1) & SERIAL_BUFFER_MASK;

        // Buffer cheio: avança a cauda (perde o mais antigo)
        if next_head == self.tail {
            self.tail = (self.tail + 1) & SERIAL_BUFFER_MASK;
            self.dropped_count += 1;
        }

        self.buffer[self.head] = byte;
        self.head = next_head;

        self.drain_internal();
    }

    /// Envia o máximo possível sem bloquear (lock já adquirido).
    fn drain_internal(&mut self) {
        while self.head != self.tail && self.is_transmit_empty() {
            outb(COM1_PORT, self.buffer[self.tail]);
            self.tail = (self.tail + 1) & SERIAL_BUFFER_MASK;
        }
    }

    /// Descarga total do buffer (bloqueante). Para pânico.
    fn force_flush_internal(&mut self) {
        while self.head != self.tail {
            while !self.is_transmit_empty() {
                core::hint::spin_loop();
            }
            outb(COM1_PORT, self.buffer[self.tail]);
            self.tail = (self.tail + 1) & SERIAL_BUFFER_MASK;
        }
    }
}

impl fmt::Write for SerialPort {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            // LF vira CRLF no terminal serial
            if byte == b'\n' {
                self.write_byte_internal(b'\r');
            }
            self.write_byte_internal(byte);
        }
        Ok(())
    }
}

/// Inicializa a serial.
pub fn init() {
    SERIAL.lock().init();
}

/// Acesso ao writer para o logger (None se a serial estiver ocupada).
pub fn writer() -> Option<SpinlockGuard<'static, SerialPort>> {
    SERIAL.try_lock()
}

/// Escreve uma string (atômico).
pub fn write_str(s: &str) {
    use fmt::Write;
    let _ = SERIAL.lock().write_str(s);
}

/// Descarga total do buffer (bloqueante).
pub fn force_flush() {
    if let Some(mut serial) = SERIAL.try_lock() {
        serial.force_flush_internal();
    }
}
