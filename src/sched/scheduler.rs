//! Scheduler round-robin.
//!
//! Uma única ready list FIFO duplamente encadeada (índices de slot no
//! próprio PCB), um ponteiro de corrente, um contador de ticks e um
//! quantum fixo. `priority` é gravada no PCB mas nunca consultada:
//! round-robin puro é um invariante deste design.
//!
//! A troca de contexto acontece em `dispatch`: TSS.esp0 e CR3 do processo
//! que entra são carregados antes de `switch_stacks` trocar a stack.

use crate::arch::x86::gdt;
use crate::arch::Cpu;
use crate::sched::context;
use crate::sched::task::lifecycle::{self, pcb_mut};
use crate::sched::task::state::ProcessState;
use crate::sys::types::Pid;

/// Quantum de tempo em ticks (100 Hz → 100 ms por fatia).
pub const TIME_QUANTUM: u32 = 10;

struct SchedState {
    current: Option<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    ticks: u32,
}

static mut SCHED: SchedState = SchedState {
    current: None,
    head: None,
    tail: None,
    ticks: 0,
};

/// Acesso ao estado do scheduler.
///
/// SAFETY: uniprocessador; todo acesso ocorre com interrupções
/// desabilitadas e o empréstimo nunca atravessa `switch_stacks`.
fn state() -> &'static mut SchedState {
    unsafe { &mut *core::ptr::addr_of_mut!(SCHED) }
}

/// Inicializa o scheduler.
pub fn init() {
    let s = state();
    s.current = None;
    s.head = None;
    s.tail = None;
    s.ticks = 0;
    crate::kinfo!("(Sched) Round-robin, quantum={} ticks", TIME_QUANTUM);
}

/// Slot do processo corrente.
#[inline]
pub fn current_slot() -> Option<usize> {
    state().current
}

/// PID do processo corrente.
pub fn current_pid() -> Option<Pid> {
    current_slot().and_then(lifecycle::pid_of)
}

/// Ticks do scheduler desde o boot.
pub fn ticks() -> u32 {
    state().ticks
}

/// Procura um processo por PID (corrente incluído).
pub fn find(pid: Pid) -> Option<usize> {
    lifecycle::find(pid)
}

/// Enfileira um processo: se ainda não está Ready, vai para o fim da fila.
pub fn add(slot: usize) {
    let pcb = pcb_mut(slot);
    if pcb.state == ProcessState::Ready {
        return;
    }
    pcb.state = ProcessState::Ready;
    push_tail(slot);
}

/// Remove um processo das estruturas do scheduler.
///
/// Detacha incondicionalmente: o chamador (exit) já marcou o PCB como
/// Terminated, e um PCB morto não pode permanecer alcançável pela fila.
/// Retorna true se era o corrente — o chamador deve reescalonar, pois um
/// processo removido não volta a executar.
pub fn remove(slot: usize) -> bool {
    detach(slot);

    let s = state();
    if s.current == Some(slot) {
        s.current = None;
        true
    } else {
        false
    }
}

/// Tick do timer (IRQ 0): contabiliza e reescalona no fim do quantum.
pub fn tick() {
    let s = state();
    s.ticks = s.ticks.wrapping_add(1);

    match s.current {
        None => {
            // CPU ociosa: tenta despachar o que estiver pronto
            yield_now();
        }
        Some(cur) => {
            pcb_mut(cur).cpu_time += 1;
            if s.ticks % TIME_QUANTUM == 0 {
                yield_now();
            }
        }
    }
}

/// Cede a CPU: o corrente (se ainda runnable) vai para o fim da fila e a
/// cabeça assume. Com a fila vazia, retorna sem trocar.
pub fn yield_now() {
    if state().head.is_none() {
        return;
    }

    let prev = state().current;

    // Re-enfileira o corrente enquanto ainda é runnable
    if let Some(cur) = prev {
        let pcb = pcb_mut(cur);
        if pcb.state == ProcessState::Running {
            pcb.state = ProcessState::Ready;
            push_tail(cur);
        }
    }

    let next = match pop_head() {
        Some(slot) => slot,
        None => return,
    };

    if prev == Some(next) {
        // Único runnable: segue na CPU sem trocar de stack
        pcb_mut(next).state = ProcessState::Running;
        return;
    }

    dispatch(next, prev);
}

/// Bloqueia o processo corrente até `unblock`.
///
/// Retorna quando o processo volta a executar. Se não há mais ninguém
/// pronto, espera parado (hlt) até uma IRQ destravar alguém — possivelmente
/// o próprio corrente, que então retoma no lugar.
pub fn block_current() {
    let cur = match current_slot() {
        Some(slot) => slot,
        None => return,
    };

    pcb_mut(cur).state = ProcessState::Blocked;
    yield_now();

    loop {
        if pcb_mut(cur).state == ProcessState::Running {
            // Fomos reescalonados normalmente
            return;
        }

        // Ninguém para rodar: espera uma IRQ com a CPU parada
        Cpu::enable_interrupts();
        Cpu::halt();
        Cpu::disable_interrupts();

        if pcb_mut(cur).state == ProcessState::Ready && current_slot() == Some(cur) {
            // Acordado sem nunca ter saído da CPU: retoma no lugar
            detach(cur);
            pcb_mut(cur).state = ProcessState::Running;
            return;
        }
    }
}

/// Desbloqueia um processo (wake do IPC): Blocked → Ready + fim da fila.
pub fn unblock(slot: usize) {
    let pcb = pcb_mut(slot);
    if pcb.state == ProcessState::Blocked {
        pcb.state = ProcessState::Ready;
        pcb.waiting_for = 0;
        push_tail(slot);
    }
}

/// Reescalona sem jamais voltar ao contexto chamador (caminho de exit).
pub fn reschedule_never_return() -> ! {
    Cpu::disable_interrupts();

    if let Some(next) = pop_head() {
        dispatch(next, None);
        unreachable!("dispatch sem contexto de retorno");
    }

    // Nada pronto. A stack corrente pode já ter voltado ao PMM; o idle
    // continua numa stack dedicada.
    // SAFETY: enter_idle não retorna e não toca a stack antiga
    unsafe { context::enter_idle() }
}

/// Idle loop do kernel: despacha quando houver trabalho, senão hlt.
///
/// Executa no contexto de boot (fim de `kernel_main`) ou na stack de idle
/// (depois de um exit sem sucessor). Ambos os contextos são abandonados
/// sem salvamento quando um processo assume.
#[no_mangle]
pub extern "C" fn idle_main() -> ! {
    loop {
        Cpu::disable_interrupts();
        if let Some(next) = pop_head() {
            dispatch(next, None);
            // dispatch com prev=None não retorna
        }
        Cpu::enable_interrupts();
        Cpu::halt();
    }
}

// ============================================================================
// INTERNO
// ============================================================================

/// Troca para `next`. Com `prev`, o contexto de saída é salvo no PCB dele
/// e esta chamada retorna quando ele for reescalonado; sem `prev`, o
/// contexto atual é abandonado e a chamada não retorna.
fn dispatch(next: usize, prev: Option<usize>) {
    let (esp0, cr3, load_from) = {
        let pcb = pcb_mut(next);
        pcb.state = ProcessState::Running;
        (
            pcb.kernel_stack_top(),
            pcb.page_directory.as_u32(),
            &pcb.saved_sp as *const u32,
        )
    };

    state().current = Some(next);

    // Ring-transition e espaço de endereçamento do processo que entra
    gdt::set_kernel_stack(esp0);
    if cr3 != 0 {
        // SAFETY: o directory do processo mantém o kernel identity-mapeado
        unsafe { Cpu::write_cr3(cr3) };
    }

    let save_into = match prev {
        Some(p) => &mut pcb_mut(p).saved_sp as *mut u32,
        None => core::ptr::null_mut(),
    };

    // SAFETY: esp0/CR3 já apontam para o processo que entra; nenhum lock
    // está retido; save_into/load_from vivem na tabela de processos estática
    unsafe {
        context::switch_stacks(save_into, load_from);
    }
    // Só chegamos aqui quando ESTE contexto for retomado no futuro
}

fn push_tail(slot: usize) {
    let s = state();
    pcb_mut(slot).next = None;
    pcb_mut(slot).prev = s.tail;

    match s.tail {
        Some(tail) => {
            pcb_mut(tail).next = Some(slot);
            s.tail = Some(slot);
        }
        None => {
            s.head = Some(slot);
            s.tail = Some(slot);
        }
    }
}

fn pop_head() -> Option<usize> {
    let s = state();
    let head = s.head?;
    detach(head);
    Some(head)
}

fn detach(slot: usize) {
    let s = state();
    let (prev, next) = {
        let pcb = pcb_mut(slot);
        (pcb.prev, pcb.next)
    };

    match prev {
        Some(p) => pcb_mut(p).next = next,
        None => {
            if s.head == Some(slot) {
                s.head = next;
            } else {
                // Não estava na lista
                return;
            }
        }
    }

    match next {
        Some(n) => pcb_mut(n).prev = prev,
        None => {
            if s.tail == Some(slot) {
                s.tail = prev;
            }
        }
    }

    let pcb = pcb_mut(slot);
    pcb.next = None;
    pcb.prev = None;
}
