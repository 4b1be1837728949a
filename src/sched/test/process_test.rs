//! Testes do ciclo de vida de processos.
//!
//! Rodam durante o boot, antes dos serviços: não há processo corrente e o
//! caminho de exit portanto nunca reescalona.

use crate::klib::test_framework::{TestCase, TestResult};
use crate::mm::{paging, pmm, VirtAddr};
use crate::sched::task::entity::KERNEL_STACK_SIZE;
use crate::sched::task::state::ProcessState;
use crate::sched::{lifecycle, scheduler};
use crate::sys::types::{INITIAL_EFLAGS, USER_DS};

pub const PROCESS_TESTS: &[TestCase] = &[
    TestCase::new("proc_create_campos", test_create_fields),
    TestCase::new("proc_pids_distintos", test_distinct_pids),
    TestCase::new("proc_kernel_mapeado", test_kernel_mapped),
    TestCase::new("proc_entry_frame_usuario", test_user_entry_frame),
    TestCase::new("proc_exit_devolve_frames", test_exit_reclaims),
    TestCase::new("proc_ready_state", test_ready_state),
    TestCase::new("proc_kill_inexistente", test_kill_missing),
];

/// create preenche o PCB com recursos próprios.
fn test_create_fields() -> TestResult {
    let slot = match lifecycle::create(0, true) {
        Ok(slot) => slot,
        Err(_) => return TestResult::Fail,
    };

    {
        let pcb = lifecycle::pcb_mut(slot);
        crate::kassert!(pcb.pid != 0, "PID 0 atribuído a processo");
        crate::kassert!(pcb.state == ProcessState::Created);
        crate::kassert!(!pcb.page_directory.is_null());
        crate::kassert!(!pcb.kernel_stack.is_null());
        crate::kassert!(!pcb.user_stack.is_null());
        crate::kassert!(pcb.is_user);
        crate::kassert_eq!(pcb.cpu_time, 0);
    }

    lifecycle::exit(slot, 0);
    TestResult::Pass
}

/// Dois processos vivos nunca compartilham PID.
fn test_distinct_pids() -> TestResult {
    let a = match lifecycle::create(0, false) {
        Ok(slot) => slot,
        Err(_) => return TestResult::Fail,
    };
    let b = match lifecycle::create(0, false) {
        Ok(slot) => slot,
        Err(_) => return TestResult::Fail,
    };

    let pid_a = lifecycle::pid_of(a);
    let pid_b = lifecycle::pid_of(b);
    crate::kassert!(pid_a.is_some() && pid_b.is_some());
    crate::kassert!(pid_a != pid_b, "PIDs duplicados");

    // find resolve ambos
    crate::kassert_eq!(lifecycle::find(pid_a.unwrap()), Some(a));
    crate::kassert_eq!(lifecycle::find(pid_b.unwrap()), Some(b));

    lifecycle::exit(a, 0);
    lifecycle::exit(b, 0);
    TestResult::Pass
}

/// O directory de um processo novo identity-mapeia o kernel supervisor.
fn test_kernel_mapped() -> TestResult {
    let slot = match lifecycle::create(0, true) {
        Ok(slot) => slot,
        Err(_) => return TestResult::Fail,
    };
    let dir = lifecycle::pcb_mut(slot).page_directory;

    for &addr in &[0x1000u32, 0x0010_0000, 0x00F0_0000] {
        match paging::translate(dir, VirtAddr::new(addr)) {
            Some((phys, flags)) => {
                crate::kassert_eq!(phys.as_u32(), addr);
                crate::kassert!(!flags.contains(paging::PageFlags::USER));
            }
            None => return TestResult::Fail,
        }
    }

    lifecycle::exit(slot, 0);
    TestResult::Pass
}

/// setup_entry fabrica o frame de primeiro dispatch para o ring 3.
fn test_user_entry_frame() -> TestResult {
    let slot = match lifecycle::create(0, true) {
        Ok(slot) => slot,
        Err(_) => return TestResult::Fail,
    };

    const ENTRY: u32 = 0x0040_0000;
    lifecycle::setup_entry(slot, ENTRY);

    let pcb = lifecycle::pcb_mut(slot);
    let sp = pcb.saved_sp;
    let top = pcb.kernel_stack_top();

    // saved_sp dentro da kernel stack
    crate::kassert!(sp >= top - KERNEL_STACK_SIZE && sp < top);

    // Frame de suspensão: edi esi ebx ebp eflags
    let words = sp as *const u32;
    // SAFETY: faixa validada acima, identity-mapeada
    unsafe {
        crate::kassert_eq!(*words.add(0), 0); // edi
        crate::kassert_eq!(*words.add(3), 0); // ebp
        crate::kassert_eq!(*words.add(4), INITIAL_EFLAGS);

        // Em seguida o endereço do trampolim de ring 3
        let trampoline = *words.add(5);
        crate::kassert_eq!(
            trampoline,
            crate::sched::context::first_run_user as usize as u32
        );

        // No topo do frame fabricado: eip/cs/eflags/esp/ss do iret
        let iret_base = top as *const u32;
        crate::kassert_eq!(*iret_base.sub(1), USER_DS as u32); // ss
        crate::kassert_eq!(*iret_base.sub(2), pcb.user_stack_top()); // esp
        crate::kassert_eq!(*iret_base.sub(3), INITIAL_EFLAGS);
        crate::kassert_eq!(*iret_base.sub(5), ENTRY); // eip
    }

    lifecycle::exit(slot, 0);
    TestResult::Pass
}

/// create seguido de exit devolve todos os frames ao PMM.
fn test_exit_reclaims() -> TestResult {
    let before = pmm::FRAME_ALLOCATOR.lock().used_frames();

    let slot = match lifecycle::create(0, true) {
        Ok(slot) => slot,
        Err(_) => return TestResult::Fail,
    };
    let pid = lifecycle::pid_of(slot).unwrap_or(0);

    lifecycle::exit(slot, 7);

    // Slot liberado, PID morto, frames de volta
    crate::kassert!(lifecycle::find(pid).is_none());
    let after = pmm::FRAME_ALLOCATOR.lock().used_frames();
    crate::kassert_eq!(after, before);
    TestResult::Pass
}

/// scheduler::add marca Ready; exit tira da fila.
fn test_ready_state() -> TestResult {
    let slot = match lifecycle::create(0, false) {
        Ok(slot) => slot,
        Err(_) => return TestResult::Fail,
    };
    lifecycle::setup_entry(slot, 0x0020_0000);

    scheduler::add(slot);
    crate::kassert!(lifecycle::pcb_mut(slot).state == ProcessState::Ready);

    // add repetido não duplica
    scheduler::add(slot);
    crate::kassert!(lifecycle::pcb_mut(slot).state == ProcessState::Ready);

    lifecycle::exit(slot, 0);
    TestResult::Pass
}

/// kill de PID inexistente retorna NotFound.
fn test_kill_missing() -> TestResult {
    use crate::sys::error::Status;
    crate::kassert_eq!(lifecycle::kill(63), Status::NotFound);
    TestResult::Pass
}
