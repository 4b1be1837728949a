//! Process Control Block.

use super::state::ProcessState;
use crate::mm::PhysAddr;
use crate::sys::types::Pid;

/// Tamanho da kernel stack (2 frames).
pub const KERNEL_STACK_SIZE: u32 = 8192;
/// Tamanho da user stack (4 frames).
pub const USER_STACK_SIZE: u32 = 16384;

/// Process Control Block.
///
/// Processos referenciam-se por PID, nunca por ponteiro; os links da ready
/// list são índices de slot guardados no próprio PCB (lista intrusiva sem
/// ciclos de ownership).
pub struct Pcb {
    /// Identificador único (0 reservado ao kernel)
    pub pid: Pid,
    /// PID do processo pai
    pub parent_pid: Pid,
    /// Estado atual
    pub state: ProcessState,
    /// Prioridade (gravada, não consultada: round-robin puro)
    pub priority: u32,
    /// Ticks acumulados em Running
    pub cpu_time: u32,
    /// Endereço físico do page directory (ownership exclusivo)
    pub page_directory: PhysAddr,
    /// Base física da kernel stack (2 frames, ownership exclusivo)
    pub kernel_stack: PhysAddr,
    /// Base física da user stack (4 frames; zero em processos de kernel)
    pub user_stack: PhysAddr,
    /// Kernel stack pointer salvo para retomar
    pub saved_sp: u32,
    /// Ring alvo no primeiro dispatch
    pub is_user: bool,
    /// Código de saída
    pub exit_code: u32,
    /// Filtro de sender de um receive bloqueado (0 = qualquer)
    pub waiting_for: Pid,

    // --- Links da ready list (índices de slot) ---
    pub next: Option<usize>,
    pub prev: Option<usize>,
}

impl Pcb {
    pub const fn empty() -> Self {
        Self {
            pid: 0,
            parent_pid: 0,
            state: ProcessState::Created,
            priority: 0,
            cpu_time: 0,
            page_directory: PhysAddr::zero(),
            kernel_stack: PhysAddr::zero(),
            user_stack: PhysAddr::zero(),
            saved_sp: 0,
            is_user: false,
            exit_code: 0,
            waiting_for: 0,
            next: None,
            prev: None,
        }
    }

    /// Topo da kernel stack: o valor de TSS.esp0 enquanto este processo roda.
    #[inline]
    pub fn kernel_stack_top(&self) -> u32 {
        self.kernel_stack.as_u32() + KERNEL_STACK_SIZE
    }

    /// Topo da user stack (ESP inicial em ring 3).
    #[inline]
    pub fn user_stack_top(&self) -> u32 {
        self.user_stack.as_u32() + USER_STACK_SIZE
    }
}
