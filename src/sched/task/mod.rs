//! Task management: PCB, estados e ciclo de vida.

pub mod entity;
pub mod lifecycle;
pub mod state;

pub use entity::Pcb;
pub use state::ProcessState;
