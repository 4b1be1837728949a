//! Ciclo de vida de processos.
//!
//! Tabela fixa de 64 slots. O espaço de PIDs tem o tamanho da tabela; a
//! alocação usa um cursor rolante que pula o 0 e os PIDs vivos, então
//! qualquer PID livre é encontrado em tempo limitado.
//!
//! A cascata de exit: PCB → scheduler (detach) → IPC (fila descartada) →
//! capabilities (revogadas) → paginação (directory destruído) → PMM
//! (frames devolvidos) → slot e PID liberados. Filhos órfãos são
//! reparentados para o PID 0 e o pai original recebe um envelope SIGNAL
//! com o exit code (best-effort).

use super::entity::Pcb;
use super::state::ProcessState;
use crate::ipc;
use crate::ipc::message::{Envelope, MSG_SIGNAL};
use crate::mm::paging::{self, PageFlags};
use crate::mm::{pmm, PhysAddr, VirtAddr};
use crate::sched::scheduler;
use crate::security::capability;
use crate::sys::error::{KResult, Status};
use crate::sys::types::{Pid, INITIAL_EFLAGS, KERNEL_PID, USER_CS, USER_DS};

/// Capacidade da tabela de processos (= espaço de PIDs).
pub const MAX_PROCESSES: usize = 64;

/// Frames da kernel stack.
const KERNEL_STACK_FRAMES: usize = 2;
/// Frames da user stack.
const USER_STACK_FRAMES: usize = 4;

/// Prioridade default (gravada, não consultada).
const DEFAULT_PRIORITY: u32 = 5;

pub struct ProcessTable {
    slots: [Pcb; MAX_PROCESSES],
    used: [bool; MAX_PROCESSES],
    pid_cursor: Pid,
}

const EMPTY_PCB: Pcb = Pcb::empty();

static mut PROCESS_TABLE: ProcessTable = ProcessTable {
    slots: [EMPTY_PCB; MAX_PROCESSES],
    used: [false; MAX_PROCESSES],
    pid_cursor: 1,
};

/// Acesso à tabela de processos.
///
/// SAFETY: uniprocessador com ring 0 não-preemptivo; todo chamador executa
/// com interrupções desabilitadas (contexto de trap ou boot) e mantém o
/// empréstimo curto, nunca através de um context switch.
fn table() -> &'static mut ProcessTable {
    unsafe { &mut *core::ptr::addr_of_mut!(PROCESS_TABLE) }
}

/// Acesso direto a um PCB por slot.
///
/// Mesmo regime de segurança de `table`.
pub(crate) fn pcb_mut(slot: usize) -> &'static mut Pcb {
    &mut table().slots[slot]
}

/// Inicializa a tabela de processos.
pub fn init() {
    let t = table();
    for used in t.used.iter_mut() {
        *used = false;
    }
    t.pid_cursor = 1;
    crate::kinfo!("(Proc) Tabela de processos: {} slots", MAX_PROCESSES);
}

/// Procura o slot de um PID vivo.
pub fn find(pid: Pid) -> Option<usize> {
    let t = table();
    (0..MAX_PROCESSES).find(|&i| t.used[i] && t.slots[i].pid == pid)
}

/// PID do slot, se vivo.
pub fn pid_of(slot: usize) -> Option<Pid> {
    let t = table();
    if slot < MAX_PROCESSES && t.used[slot] {
        Some(t.slots[slot].pid)
    } else {
        None
    }
}

/// Itera os PIDs vivos.
pub fn live_pids(mut f: impl FnMut(Pid)) {
    let t = table();
    for i in 0..MAX_PROCESSES {
        if t.used[i] {
            f(t.slots[i].pid);
        }
    }
}

/// Cria um processo: slot, PID, page directory com o kernel mapeado,
/// kernel stack (2 frames, supervisor/RW) e — se usuário — user stack
/// (4 frames, user/RW). Estado final: `Created`.
pub fn create(parent_pid: Pid, is_user: bool) -> KResult<usize> {
    let slot = {
        let t = table();
        (0..MAX_PROCESSES)
            .find(|&i| !t.used[i])
            .ok_or(Status::OutOfMemory)?
    };
    let pid = allocate_pid().ok_or(Status::OutOfMemory)?;

    let page_directory = paging::create_directory()?;
    if let Err(e) = paging::map_kernel(page_directory) {
        paging::destroy_directory(page_directory);
        return Err(e);
    }

    let kernel_stack = match pmm::alloc_contiguous(KERNEL_STACK_FRAMES) {
        Some(addr) => addr,
        None => {
            paging::destroy_directory(page_directory);
            return Err(Status::OutOfMemory);
        }
    };
    // Identity map explícito da kernel stack (supervisor/RW)
    for i in 0..KERNEL_STACK_FRAMES {
        let addr = kernel_stack.as_u32() + (i * crate::mm::config::PAGE_SIZE) as u32;
        if let Err(e) = paging::map_page(
            page_directory,
            VirtAddr::new(addr),
            PhysAddr::new(addr),
            PageFlags::KERNEL_RW,
        ) {
            pmm::free(kernel_stack, KERNEL_STACK_FRAMES);
            paging::destroy_directory(page_directory);
            return Err(e);
        }
    }

    let user_stack = if is_user {
        match pmm::alloc_contiguous(USER_STACK_FRAMES) {
            Some(addr) => {
                for i in 0..USER_STACK_FRAMES {
                    let page = addr.as_u32() + (i * crate::mm::config::PAGE_SIZE) as u32;
                    if let Err(e) = paging::map_page(
                        page_directory,
                        VirtAddr::new(page),
                        PhysAddr::new(page),
                        PageFlags::USER_RW,
                    ) {
                        pmm::free(addr, USER_STACK_FRAMES);
                        pmm::free(kernel_stack, KERNEL_STACK_FRAMES);
                        paging::destroy_directory(page_directory);
                        return Err(e);
                    }
                }
                addr
            }
            None => {
                pmm::free(kernel_stack, KERNEL_STACK_FRAMES);
                paging::destroy_directory(page_directory);
                return Err(Status::OutOfMemory);
            }
        }
    } else {
        PhysAddr::zero()
    };

    let t = table();
    let pcb = &mut t.slots[slot];
    *pcb = Pcb::empty();
    pcb.pid = pid;
    pcb.parent_pid = parent_pid;
    pcb.state = ProcessState::Created;
    pcb.priority = DEFAULT_PRIORITY;
    pcb.is_user = is_user;
    pcb.page_directory = page_directory;
    pcb.kernel_stack = kernel_stack;
    pcb.user_stack = user_stack;

    t.used[slot] = true;

    crate::kdebug!(
        "(Proc) create: pid={} parent={} user={}",
        pid,
        parent_pid,
        is_user
    );
    Ok(slot)
}

/// Prepara a kernel stack para o primeiro dispatch em `entry_point`.
///
/// O frame fabricado é consumido em duas etapas: `switch_stacks` desempilha
/// o frame de suspensão; o `ret` final cai em `first_run_user` (processos
/// de usuário, que então faz `iretd` para o ring 3) ou diretamente em
/// `entry_point` (processos de kernel).
pub fn setup_entry(slot: usize, entry_point: u32) {
    let pcb = pcb_mut(slot);
    debug_assert!(entry_point != 0);

    let mut sp = pcb.kernel_stack_top() as *mut u32;

    // SAFETY: a kernel stack foi alocada em create e está identity-mapeada;
    // escrevemos descendo a partir do topo, bem dentro dos 2 frames
    unsafe {
        if pcb.is_user {
            // Frame de iret para o ring 3
            push(&mut sp, USER_DS as u32); // ss
            push(&mut sp, pcb.user_stack_top()); // esp
            push(&mut sp, INITIAL_EFLAGS); // eflags (IF=1)
            push(&mut sp, USER_CS as u32); // cs
            push(&mut sp, entry_point); // eip

            // Error code e vetor dummy (formato do trap frame)
            push(&mut sp, 0);
            push(&mut sp, 0);

            // Bloco pusha zerado: eax ecx edx ebx esp ebp esi edi
            for _ in 0..8 {
                push(&mut sp, 0);
            }

            // Seletores de dados do usuário: ds es fs gs
            for _ in 0..4 {
                push(&mut sp, USER_DS as u32);
            }

            // O ret do switch_stacks cai no trampolim
            push(&mut sp, crate::sched::context::first_run_user as usize as u32);
        } else {
            // Processo de kernel: o ret cai direto no entry point
            push(&mut sp, entry_point);
        }

        // Frame de suspensão consumido por switch_stacks:
        // popfd, ebp, ebx, esi, edi
        push(&mut sp, INITIAL_EFLAGS);
        push(&mut sp, 0); // ebp
        push(&mut sp, 0); // ebx
        push(&mut sp, 0); // esi
        push(&mut sp, 0); // edi
    }

    pcb.saved_sp = sp as u32;
}

#[inline]
unsafe fn push(sp: &mut *mut u32, value: u32) {
    *sp = sp.sub(1);
    core::ptr::write(*sp, value);
}

/// Termina um processo e libera todos os seus recursos.
///
/// Se o alvo é o processo corrente, esta função não retorna: o scheduler
/// despacha outro processo (ou entra em idle).
pub fn exit(slot: usize, exit_code: u32) {
    let (pid, parent) = {
        let t = table();
        if slot >= MAX_PROCESSES || !t.used[slot] {
            return;
        }
        t.slots[slot].state = ProcessState::Terminated;
        t.slots[slot].exit_code = exit_code;
        (t.slots[slot].pid, t.slots[slot].parent_pid)
    };

    crate::kinfo!("(Proc) exit: pid={} code={}", pid, exit_code);

    let was_current = scheduler::remove(slot);

    // Fila de mensagens pendente morre com o processo
    ipc::clear_queue(pid);

    // Capabilities revogadas; registro de driver removido se houver
    capability::destroy_for_pid(pid);
    let _ = crate::drivers::registry::unregister(pid);

    // Órfãos reparentados para o kernel
    {
        let t = table();
        for i in 0..MAX_PROCESSES {
            if t.used[i] && i != slot && t.slots[i].parent_pid == pid {
                t.slots[i].parent_pid = KERNEL_PID;
            }
        }
    }

    // Sinal de exit para o pai original (best-effort; descartado se falhar)
    if parent != pid && find(parent).is_some() {
        let mut envelope = Envelope::new(MSG_SIGNAL);
        envelope.data[..4].copy_from_slice(&exit_code.to_le_bytes());
        envelope.data_size = 4;
        let _ = ipc::send_from(pid, parent, &envelope);
    }

    // Devolução de memória: directory (com suas page tables) e stacks
    let (page_directory, kernel_stack, user_stack) = {
        let pcb = pcb_mut(slot);
        (pcb.page_directory, pcb.kernel_stack, pcb.user_stack)
    };
    if !page_directory.is_null() {
        paging::destroy_directory(page_directory);
    }
    if !kernel_stack.is_null() {
        pmm::free(kernel_stack, KERNEL_STACK_FRAMES);
    }
    if !user_stack.is_null() {
        pmm::free(user_stack, USER_STACK_FRAMES);
    }

    {
        let t = table();
        t.slots[slot] = Pcb::empty();
        t.used[slot] = false;
    }

    if was_current {
        // O CR3 ainda aponta para o directory recém-destruído; o kernel
        // directory assume até o próximo dispatch trocar de novo.
        // SAFETY: o directory do kernel identity-mapeia todo o código
        unsafe {
            crate::arch::Cpu::write_cr3(paging::kernel_directory().as_u32());
        }

        // Yield implícito do exit: nunca volta para o morto
        scheduler::reschedule_never_return();
    }
}

/// Termina o processo corrente. Nunca retorna.
pub fn exit_current(exit_code: u32) -> ! {
    if let Some(slot) = scheduler::current_slot() {
        exit(slot, exit_code);
    }
    // Sem processo corrente: nada a liberar, só reescalonar
    scheduler::reschedule_never_return();
}

/// Mata um processo por PID. A admissão é verificada na camada de syscall.
pub fn kill(pid: Pid) -> Status {
    match find(pid) {
        Some(slot) => {
            exit(slot, 0);
            Status::Ok
        }
        None => Status::NotFound,
    }
}

/// Aloca um PID com cursor rolante sobre o espaço [1, MAX_PROCESSES).
fn allocate_pid() -> Option<Pid> {
    let t = table();
    let cursor = t.pid_cursor;
    for i in 0..MAX_PROCESSES as u32 {
        let pid = (cursor + i) % MAX_PROCESSES as u32;
        if pid == 0 {
            continue;
        }
        let in_use = (0..MAX_PROCESSES).any(|j| t.used[j] && t.slots[j].pid == pid);
        if !in_use {
            t.pid_cursor = (pid + 1) % MAX_PROCESSES as u32;
            return Some(pid);
        }
    }
    None
}
