//! Tabela de capabilities.
//!
//! Cada entrada concede a um PID um conjunto de permissões sobre uma
//! categoria de recurso. A admissão de toda syscall privilegiada passa por
//! `check`. Só o kernel (PID 0) concede ou revoga para terceiros.

pub mod cap;
pub mod rights;
pub mod table;

pub use cap::{CapType, Capability};
pub use rights::CapRights;
pub use table::{
    check, cleanup_expired, count_for_pid, destroy_for_pid, grant, grant_expiring, init, revoke,
    transfer,
};
