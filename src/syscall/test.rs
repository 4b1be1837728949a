//! Testes do dispatcher de syscalls.

use crate::arch::x86::interrupts::TrapFrame;
use crate::klib::test_framework::{TestCase, TestResult};
use crate::sys::error::Status;

pub const SYSCALL_TESTS: &[TestCase] = &[
    TestCase::new("sys_numero_sem_handler", test_unknown_number),
    TestCase::new("sys_sem_processo_corrente", test_no_current),
    TestCase::new("sys_registro_duplicado", test_register_duplicate),
];

fn frame_with_eax(eax: u32) -> TrapFrame {
    // SAFETY: todos os campos são inteiros; zero é um frame válido para teste
    let mut frame: TrapFrame = unsafe { core::mem::zeroed() };
    frame.eax = eax;
    frame.vector = 0x80;
    frame
}

/// Número sem handler registrado retorna NotImplemented no acumulador.
fn test_unknown_number() -> TestResult {
    let mut frame = frame_with_eax(0xFF);
    crate::syscall::dispatch(&mut frame);
    crate::kassert_eq!(frame.eax, Status::NotImplemented.as_reg());

    let mut frame = frame_with_eax(0x05);
    crate::syscall::dispatch(&mut frame);
    crate::kassert_eq!(frame.eax, Status::NotImplemented.as_reg());

    TestResult::Pass
}

/// Syscall registrada sem processo corrente é negada.
///
/// Durante o boot não há corrente, então o dispatcher tem de barrar antes
/// de chamar o handler.
fn test_no_current() -> TestResult {
    let mut frame = frame_with_eax(crate::syscall::numbers::SYS_PROCESS_YIELD);
    crate::syscall::dispatch(&mut frame);
    crate::kassert_eq!(frame.eax, Status::PermissionDenied.as_reg());
    TestResult::Pass
}

/// Registro avulso duplicado retorna AlreadyExists.
fn test_register_duplicate() -> TestResult {
    fn dummy(_b: u32, _c: u32, _d: u32) -> u32 {
        0
    }

    crate::kassert_eq!(crate::syscall::register(0xF0, dummy), Status::Ok);
    crate::kassert_eq!(
        crate::syscall::register(0xF0, dummy),
        Status::AlreadyExists
    );
    crate::kassert_eq!(crate::syscall::register(0x1FF, dummy), Status::InvalidParam);
    TestResult::Pass
}
