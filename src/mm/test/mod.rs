//! Testes do subsistema de memória.

pub mod paging_test;
pub mod pmm_test;
