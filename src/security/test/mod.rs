//! Testes do sistema de capabilities.

pub mod capability_test;
