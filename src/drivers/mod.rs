//! Drivers residentes no kernel.
//!
//! Num microkernel os drivers "de verdade" vivem em userspace (PIDs 2..4);
//! aqui ficam apenas os pedaços que o ring 0 não pode delegar: o PIC, o
//! PIT, a serial de debug, o console de texto e o encaminhamento bruto de
//! scancodes para o driver de teclado.

pub mod console;
pub mod keyboard;
pub mod pic;
pub mod pit;
pub mod registry;
pub mod serial;
