//! Envelope de mensagem — a ABI de IPC visível ao userspace.

use crate::sys::types::Pid;

/// Payload máximo de um envelope.
pub const MAX_DATA: usize = 256;

// Tipos de mensagem
pub const MSG_DATA: u32 = 0x01;
pub const MSG_CONTROL: u32 = 0x02;
pub const MSG_SIGNAL: u32 = 0x03;
pub const MSG_RESPONSE: u32 = 0x04;
pub const MSG_DRIVER: u32 = 0x05;

/// Envelope de IPC, layout fixo little-endian.
///
/// O mesmo registro circula entre userspace e kernel; na entrada o kernel
/// carimba `msg_id`, `sender_pid` e `timestamp`, e só os primeiros
/// `data_size` bytes de `data` são válidos.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct Envelope {
    /// Identificador monotônico por kernel
    pub msg_id: u32,
    /// Carimbado pelo kernel no send
    pub sender_pid: Pid,
    pub receiver_pid: Pid,
    /// Um de MSG_*
    pub msg_type: u32,
    pub flags: u32,
    /// Tick do kernel no enqueue
    pub timestamp: u32,
    /// 0..=256
    pub data_size: u32,
    pub data: [u8; MAX_DATA],
}

impl Envelope {
    pub const fn new(msg_type: u32) -> Self {
        Self {
            msg_id: 0,
            sender_pid: 0,
            receiver_pid: 0,
            msg_type,
            flags: 0,
            timestamp: 0,
            data_size: 0,
            data: [0; MAX_DATA],
        }
    }

    /// Envelope com payload copiado de `data`.
    pub fn with_data(msg_type: u32, data: &[u8]) -> Self {
        let mut envelope = Self::new(msg_type);
        let len = data.len().min(MAX_DATA);
        envelope.data[..len].copy_from_slice(&data[..len]);
        envelope.data_size = len as u32;
        envelope
    }

    /// Payload válido.
    pub fn payload(&self) -> &[u8] {
        let len = (self.data_size as usize).min(MAX_DATA);
        &self.data[..len]
    }
}

/// Tamanho do header (campos antes de `data`).
pub const HEADER_SIZE: usize = 7 * core::mem::size_of::<u32>();

/// Tamanho total do envelope na ABI.
pub const ENVELOPE_SIZE: usize = HEADER_SIZE + MAX_DATA;

const _: () = assert!(core::mem::size_of::<Envelope>() == ENVELOPE_SIZE);

/// Mensagem residente no kernel: envelope + link da fila.
///
/// Cada mensagem ocupa exatamente um frame; `next` é o endereço físico da
/// próxima mensagem na fila (0 = fim).
#[repr(C)]
pub struct KernelMessage {
    pub envelope: Envelope,
    pub next: u32,
}

const _: () =
    assert!(core::mem::size_of::<KernelMessage>() <= crate::mm::config::PAGE_SIZE);
