//! Testes do motor de IPC.

pub mod engine_test;
