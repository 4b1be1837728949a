//! Testes de processos e scheduler.

pub mod process_test;
