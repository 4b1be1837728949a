//! Anvil Kernel Library.
//!
//! Ponto central de exportação dos módulos do kernel.
//! Define a estrutura hierárquica do microkernel i386.

#![no_std]
#![allow(clippy::needless_range_loop)]

// --- Módulos de Baixo Nível (Hardware) ---
pub mod arch; // HAL i386 (CPU, GDT/TSS, IDT, portas)
pub mod drivers; // PIC, PIT, Serial, Console VGA, Teclado

// --- Módulos Centrais (Lógica do Kernel) ---
pub mod core; // Inicialização, Logging, Panic, Config
pub mod klib; // Utilitários internos (Bitmap, Align, Test Framework)
pub mod mm; // Gerenciamento de memória física e paginação
pub mod sync; // Primitivas de sincronização (Spinlock)
pub mod sys; // Definições de sistema (Status, Tipos)

// --- Subsistemas ---
pub mod ipc; // Comunicação entre processos
pub mod sched; // Processos e Scheduler
pub mod security; // Capabilities
pub mod syscall; // Interface com userspace
