//! Runner das suítes de self-test do boot.
//!
//! Roda com interrupções desabilitadas, depois da subida de todos os
//! subsistemas e antes dos serviços. Qualquer falha derruba o boot com
//! panic. No fim, o estado mutável dos subsistemas volta ao de recém-boot:
//! os serviços dependem do cursor de PID começar do 1.

use crate::klib::test_framework::run_test_suite;

/// Executa todas as suítes e restaura o estado de boot.
pub fn run_all() {
    crate::kinfo!("(SelfTest) Iniciando suítes de boot");

    run_test_suite("PMM", crate::mm::test::pmm_test::PMM_TESTS);
    run_test_suite("Paging", crate::mm::test::paging_test::PAGING_TESTS);
    run_test_suite("Process", crate::sched::test::process_test::PROCESS_TESTS);
    run_test_suite("IPC", crate::ipc::test::engine_test::IPC_TESTS);
    run_test_suite(
        "Capability",
        crate::security::test::capability_test::CAPABILITY_TESTS,
    );
    run_test_suite("Syscall", crate::syscall::test::SYSCALL_TESTS);

    // Restaura o estado de recém-boot (cursor de PID, filas, tabelas)
    crate::sched::lifecycle::init();
    crate::sched::scheduler::init();
    crate::ipc::init();
    crate::security::capability::init();
    crate::syscall::init();

    crate::kok!("(SelfTest) Todas as suítes verdes");
}
