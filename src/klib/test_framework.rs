//! # Framework de Self-Tests do Kernel
//!
//! Fornece estruturas e macros para testes padronizados executados
//! durante o boot (feature `self_tests`).

/// Resultado de um teste individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestResult {
    /// Teste passou com sucesso.
    Pass,
    /// Teste falhou.
    Fail,
    /// Teste foi pulado (não aplicável no contexto atual).
    Skip,
}

/// Estrutura para um caso de teste.
pub struct TestCase {
    /// Nome do teste (para logging).
    pub name: &'static str,
    /// Função que executa o teste.
    pub func: fn() -> TestResult,
}

impl TestCase {
    /// Cria um novo caso de teste.
    pub const fn new(name: &'static str, func: fn() -> TestResult) -> Self {
        Self { name, func }
    }

    /// Executa o teste e retorna o resultado.
    pub fn run(&self) -> TestResult {
        crate::kdebug!("[Test] {}", self.name);
        let result = (self.func)();
        match result {
            TestResult::Pass => crate::kinfo!("[Test] ok   {}", self.name),
            TestResult::Fail => crate::kerror!("[Test] FAIL {}", self.name),
            TestResult::Skip => crate::kwarn!("[Test] skip {}", self.name),
        }
        result
    }
}

/// Executa uma suíte de testes.
///
/// Se algum teste falhar, o kernel entra em panic: o boot só prossegue
/// com todas as suítes verdes.
pub fn run_test_suite(suite_name: &str, tests: &[TestCase]) {
    crate::kinfo!("=== TEST SUITE: {} ===", suite_name);

    let mut passed = 0usize;
    let mut skipped = 0usize;

    for test in tests {
        match test.run() {
            TestResult::Pass => passed += 1,
            TestResult::Fail => {
                crate::kerror!("SUITE FAILED: {}", suite_name);
                panic!("test suite failed - kernel halted");
            }
            TestResult::Skip => skipped += 1,
        }
    }

    if skipped > 0 {
        crate::kinfo!(
            "=== SUITE OK: {} ({} passed, {} skipped) ===",
            suite_name,
            passed,
            skipped
        );
    } else {
        crate::kinfo!("=== SUITE OK: {} ({} passed) ===", suite_name, passed);
    }
}

/// Asserção em testes: loga e retorna `Fail` se a condição for falsa.
#[macro_export]
macro_rules! kassert {
    ($cond:expr) => {
        if !($cond) {
            $crate::kerror!("ASSERTION FAILED: {}", stringify!($cond));
            return $crate::klib::test_framework::TestResult::Fail;
        }
    };
    ($cond:expr, $msg:expr) => {
        if !($cond) {
            $crate::kerror!("ASSERTION FAILED: {}", $msg);
            return $crate::klib::test_framework::TestResult::Fail;
        }
    };
}

/// Asserção de igualdade.
#[macro_export]
macro_rules! kassert_eq {
    ($left:expr, $right:expr) => {
        let l = $left;
        let r = $right;
        if l != r {
            $crate::kerror!("ASSERTION FAILED: {} != {}", stringify!($left), stringify!($right));
            $crate::kerror!("  left  = {:?}", l);
            $crate::kerror!("  right = {:?}", r);
            return $crate::klib::test_framework::TestResult::Fail;
        }
    };
}
