//! Segurança: controle de acesso por capabilities.

pub mod capability;

#[cfg(feature = "self_tests")]
pub mod test;
