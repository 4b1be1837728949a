//! Estados do ciclo de vida de um processo.

/// Estado de um PCB.
///
/// Invariantes:
/// - no máximo um PCB está `Running`;
/// - um PCB está na ready list se e só se está `Ready`;
/// - `Blocked` está fora de qualquer lista do scheduler;
/// - `Terminated` significa slot em liberação, nunca despachável.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ProcessState {
    Created = 0,
    Ready,
    Running,
    Blocked,
    Terminated,
}
