//! Definições de Sistema (ABI, Erros, Tipos).

pub mod error;
pub mod types;

pub use error::Status;
pub use types::Pid;
