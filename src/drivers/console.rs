//! Console de texto VGA (modo 80x25).
//!
//! Escreve glyphs diretamente no framebuffer 0xB8000 e mantém o cursor de
//! hardware sincronizado via as portas do CRTC (0x3D4/0x3D5). A renderização
//! de fontes fica no hardware; aqui só vão bytes ASCII + atributo.

use crate::arch::x86::ports::outb;
use core::fmt;
use spin::Mutex;

const VGA_BUFFER: u32 = 0xB8000;
const VGA_WIDTH: usize = 80;
const VGA_HEIGHT: usize = 25;

/// Portas do controlador CRT (cursor de hardware).
const CRTC_INDEX: u16 = 0x3D4;
const CRTC_DATA: u16 = 0x3D5;

/// Atributo padrão: cinza claro sobre preto.
const DEFAULT_ATTR: u8 = 0x07;

struct Console {
    position: usize,
    attr: u8,
}

static CONSOLE: Mutex<Console> = Mutex::new(Console {
    position: 0,
    attr: DEFAULT_ATTR,
});

impl Console {
    fn buffer(&self) -> *mut u16 {
        VGA_BUFFER as *mut u16
    }

    fn clear(&mut self) {
        let vga = self.buffer();
        for i in 0..VGA_WIDTH * VGA_HEIGHT {
            // SAFETY: framebuffer VGA identity-mapeado
            unsafe {
                core::ptr::write_volatile(vga.add(i), (self.attr as u16) << 8 | b' ' as u16);
            }
        }
        self.position = 0;
        self.sync_cursor();
    }

    fn put_byte(&mut self, byte: u8) {
        match byte {
            b'\r' => {
                self.position = (self.position / VGA_WIDTH) * VGA_WIDTH;
            }
            b'\n' => {
                self.position = (self.position / VGA_WIDTH + 1) * VGA_WIDTH;
                if self.position >= VGA_WIDTH * VGA_HEIGHT {
                    self.scroll();
                }
            }
            _ => {
                let vga = self.buffer();
                // SAFETY: position < WIDTH*HEIGHT garantido pelo scroll
                unsafe {
                    core::ptr::write_volatile(
                        vga.add(self.position),
                        (self.attr as u16) << 8 | byte as u16,
                    );
                }
                self.position += 1;
                if self.position >= VGA_WIDTH * VGA_HEIGHT {
                    self.scroll();
                }
            }
        }
    }

    fn scroll(&mut self) {
        let vga = self.buffer();
        // SAFETY: cópia dentro do framebuffer
        unsafe {
            for i in 0..VGA_WIDTH * (VGA_HEIGHT - 1) {
                let below = core::ptr::read_volatile(vga.add(i + VGA_WIDTH));
                core::ptr::write_volatile(vga.add(i), below);
            }
            for i in VGA_WIDTH * (VGA_HEIGHT - 1)..VGA_WIDTH * VGA_HEIGHT {
                core::ptr::write_volatile(vga.add(i), (self.attr as u16) << 8 | b' ' as u16);
            }
        }
        self.position -= VGA_WIDTH;
    }

    /// Move o cursor de hardware para a posição lógica atual.
    fn sync_cursor(&self) {
        let pos = self.position as u16;
        outb(CRTC_INDEX, 0x0F);
        outb(CRTC_DATA, (pos & 0xFF) as u8);
        outb(CRTC_INDEX, 0x0E);
        outb(CRTC_DATA, (pos >> 8) as u8);
    }
}

impl fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.put_byte(byte);
        }
        self.sync_cursor();
        Ok(())
    }
}

/// Limpa a tela e inicializa o console.
pub fn init() {
    CONSOLE.lock().clear();
}

/// Escreve argumentos formatados no console.
pub fn print_fmt(args: fmt::Arguments) {
    use fmt::Write;
    if let Some(mut console) = CONSOLE.try_lock() {
        let _ = console.write_fmt(args);
    }
}

/// Escreve uma string no console.
pub fn print(s: &str) {
    print_fmt(format_args!("{}", s));
}
