//! Núcleo do kernel: boot, logging, panic e configuração.

pub mod config;
pub mod entry;
pub mod logging;
pub mod panic;

#[cfg(feature = "self_tests")]
pub mod self_test;
