//! Tipos primitivos das interfaces do kernel.
//!
//! `Pid` é `u32` fixo: a ABI de 32 bits transporta identificadores nos
//! registradores inteiros e a representação não pode variar.

/// Identificador de processo. 0 é reservado para o kernel.
pub type Pid = u32;

/// PID do kernel.
pub const KERNEL_PID: Pid = 0;

// Seletores de segmento (GDT fixa do kernel)
pub const KERNEL_CS: u16 = 0x08;
pub const KERNEL_DS: u16 = 0x10;
pub const USER_CS: u16 = 0x1B; // RPL 3
pub const USER_DS: u16 = 0x23; // RPL 3
pub const TSS_SELECTOR: u16 = 0x28;

/// EFLAGS inicial de um processo: IF=1, bit 1 sempre 1.
pub const INITIAL_EFLAGS: u32 = 0x202;
