//! Encaminhamento de scancodes do teclado PS/2.
//!
//! O kernel não decodifica scancodes (a tabela vive no driver de teclado
//! em userspace, PID 2). A IRQ 1 apenas lê o byte da porta de dados e o
//! despacha num envelope DRIVER. Se o driver ainda não subiu, o byte é
//! descartado.

use crate::arch::x86::ports::inb;
use crate::core::config::KEYBOARD_DRIVER_PID;
use crate::ipc;
use crate::ipc::message::{Envelope, MSG_DRIVER};
use crate::sys::types::KERNEL_PID;

/// Porta de dados do controlador PS/2.
const PS2_DATA: u16 = 0x60;

/// Handler da IRQ 1: lê um scancode e o envia ao driver de teclado.
pub fn handle_irq() {
    let scancode = inb(PS2_DATA);

    let mut envelope = Envelope::new(MSG_DRIVER);
    envelope.data[0] = scancode;
    envelope.data_size = 1;

    // Best-effort: sem driver vivo (boot cedo, driver morto) o byte se perde
    let status = ipc::send_from(KERNEL_PID, KEYBOARD_DRIVER_PID, &envelope);
    if !status.is_ok() {
        crate::ktrace!("(Kbd) Scancode {:#04x} descartado: {:?}", scancode, status);
    }
}
