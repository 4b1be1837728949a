//! HAL — camada de abstração de hardware (i386).

pub mod x86;

pub use x86::cpu::Cpu;
