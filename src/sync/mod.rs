//! Primitivas de Sincronização.
//!
//! Num uniprocessador com kernel não-preemptivo, o spinlock existe para
//! proteger estado compartilhado entre o fluxo normal e os handlers de IRQ:
//! o guard desabilita interrupções durante a seção crítica.

pub mod spinlock;

pub use spinlock::Spinlock;
