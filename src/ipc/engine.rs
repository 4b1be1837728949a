//! Motor de filas de mensagens.
//!
//! Uma fila FIFO por PID destinatário, criada preguiçosamente no primeiro
//! enqueue. O header da fila e cada mensagem ocupam um frame próprio; os
//! links são endereços físicos (a faixa do kernel é identity-mapeada).
//!
//! Overflow: com a fila cheia a mensagem mais antiga é descartada
//! (head-drop) e a nova entra. Ordem garantida apenas por par
//! (remetente, destinatário).

use core::sync::atomic::{AtomicU32, Ordering};

use super::message::{Envelope, KernelMessage, MAX_DATA};
use crate::mm::{pmm, PhysAddr};
use crate::sched::scheduler;
use crate::sched::task::lifecycle::{self, pcb_mut, MAX_PROCESSES};
use crate::sched::task::state::ProcessState;
use crate::sync::Spinlock;
use crate::sys::error::Status;
use crate::sys::types::{Pid, KERNEL_PID};

/// Profundidade máxima de uma fila.
pub const QUEUE_CAP: u32 = 100;

/// Slots de handler por tipo de mensagem (syscall ipc_register).
const MAX_HANDLERS: usize = 32;

/// Header de fila, residente num frame próprio.
///
/// `head`/`tail` são endereços físicos de `KernelMessage` (0 = vazia).
#[repr(C)]
struct QueueHeader {
    head: u32,
    tail: u32,
    count: u32,
    max_count: u32,
}

struct QueueTable {
    /// Endereço físico do header da fila de cada PID (0 = sem fila).
    headers: [u32; MAX_PROCESSES],
}

static QUEUES: Spinlock<QueueTable> = Spinlock::new(QueueTable {
    headers: [0; MAX_PROCESSES],
});

static NEXT_MSG_ID: AtomicU32 = AtomicU32::new(1);

/// Handlers registrados por tipo de mensagem (endereço no userspace).
static HANDLERS: Spinlock<[u32; MAX_HANDLERS]> = Spinlock::new([0; MAX_HANDLERS]);

/// Inicializa o subsistema de IPC.
pub fn init() {
    let mut queues = QUEUES.lock();
    queues.headers = [0; MAX_PROCESSES];
    drop(queues);

    *HANDLERS.lock() = [0; MAX_HANDLERS];
    NEXT_MSG_ID.store(1, Ordering::Relaxed);

    crate::kinfo!("(IPC) Filas por processo, cap={}", QUEUE_CAP);
}

/// Envia carimbando o processo corrente como remetente.
pub fn send(receiver: Pid, envelope: &Envelope) -> Status {
    let sender = scheduler::current_pid().unwrap_or(KERNEL_PID);
    send_from(sender, receiver, envelope)
}

/// Envia em nome de `sender` (kernel e caminho de exit usam diretamente).
pub fn send_from(sender: Pid, receiver: Pid, envelope: &Envelope) -> Status {
    if envelope.data_size as usize > MAX_DATA {
        return Status::InvalidParam;
    }
    if receiver as usize >= MAX_PROCESSES {
        return Status::NotFound;
    }

    let receiver_slot = match lifecycle::find(receiver) {
        Some(slot) => slot,
        None => return Status::NotFound,
    };

    // Envelope residente no kernel, um frame por mensagem
    let frame = match pmm::alloc_frame() {
        Some(frame) => frame,
        None => return Status::OutOfMemory,
    };

    let msg: *mut KernelMessage = frame.as_mut_ptr();
    // SAFETY: frame recém-alocado, identity-mapeado, exclusivo desta mensagem
    unsafe {
        (*msg).envelope.msg_id = NEXT_MSG_ID.fetch_add(1, Ordering::Relaxed);
        (*msg).envelope.sender_pid = sender;
        (*msg).envelope.receiver_pid = receiver;
        (*msg).envelope.msg_type = envelope.msg_type;
        (*msg).envelope.flags = envelope.flags;
        (*msg).envelope.timestamp = crate::drivers::pit::ticks();
        (*msg).envelope.data_size = envelope.data_size;
        (*msg).envelope.data = [0; MAX_DATA];
        let len = envelope.data_size as usize;
        (*msg).envelope.data[..len].copy_from_slice(&envelope.data[..len]);
        (*msg).next = 0;
    }

    {
        let mut queues = QUEUES.lock();
        let header = match ensure_queue(&mut queues, receiver) {
            Some(h) => h,
            None => {
                drop(queues);
                pmm::free(frame, 1);
                return Status::OutOfMemory;
            }
        };
        // SAFETY: header e mensagens vivem em frames do kernel; o lock
        // serializa toda mutação de fila
        unsafe {
            if (*header).count >= (*header).max_count {
                // Head-drop: o mais antigo sai, o novo entra
                if let Some(oldest) = dequeue_head(header) {
                    pmm::free(oldest, 1);
                }
            }
            enqueue_tail(header, frame.as_u32());
        }
    }

    // Wake-on-send: destinatário bloqueado esperando este remetente (ou
    // qualquer um) volta para a ready list
    let pcb = pcb_mut(receiver_slot);
    if pcb.state == ProcessState::Blocked
        && (pcb.waiting_for == 0 || pcb.waiting_for == sender)
    {
        scheduler::unblock(receiver_slot);
    }

    Status::Ok
}

/// Recebe a primeira mensagem cujo remetente casa com `sender_filter`
/// (0 = qualquer). Sem mensagem: retorna `NotFound` ou bloqueia.
///
/// Modelo de bloqueio: grava `waiting_for`, bloqueia, e re-tenta o dequeue
/// ao acordar. O remetente só desbloqueia, nunca deposita diretamente.
pub fn receive(sender_filter: Pid, out: &mut Envelope, block: bool) -> Status {
    let slot = match scheduler::current_slot() {
        Some(slot) => slot,
        None => return Status::PermissionDenied,
    };
    let pid = match lifecycle::pid_of(slot) {
        Some(pid) => pid,
        None => return Status::PermissionDenied,
    };

    loop {
        let found = {
            let mut queues = QUEUES.lock();
            take_matching(&mut queues, pid, sender_filter)
        };

        if let Some(frame) = found {
            let msg: *const KernelMessage = frame.as_ptr();
            // SAFETY: frame pertence à mensagem destacada; copiamos e liberamos
            unsafe {
                *out = (*msg).envelope;
            }
            pmm::free(frame, 1);
            return Status::Ok;
        }

        if !block {
            return Status::NotFound;
        }

        pcb_mut(slot).waiting_for = sender_filter;
        scheduler::block_current();
        pcb_mut(slot).waiting_for = 0;
    }
}

/// Envia a todos os PIDs vivos exceto o kernel (0). Falhas são por
/// destinatário e não-fatais.
pub fn broadcast(msg_type: u32, envelope: &Envelope) -> Status {
    let mut stamped = *envelope;
    stamped.msg_type = msg_type;

    let mut sent = 0u32;
    let mut targets = [0 as Pid; MAX_PROCESSES];
    let mut n = 0usize;
    lifecycle::live_pids(|pid| {
        if pid != KERNEL_PID && n < MAX_PROCESSES {
            targets[n] = pid;
            n += 1;
        }
    });

    for &pid in &targets[..n] {
        if send(pid, &stamped).is_ok() {
            sent += 1;
        }
    }

    if sent > 0 {
        Status::Ok
    } else {
        Status::GenericError
    }
}

/// Descarta todas as mensagens pendentes de `pid` e devolve o header.
pub fn clear_queue(pid: Pid) -> Status {
    if pid as usize >= MAX_PROCESSES {
        return Status::InvalidParam;
    }

    let mut queues = QUEUES.lock();
    let header_addr = queues.headers[pid as usize];
    if header_addr == 0 {
        return Status::Ok;
    }
    queues.headers[pid as usize] = 0;
    drop(queues);

    let header: *mut QueueHeader = PhysAddr::new(header_addr).as_mut_ptr();
    // SAFETY: header destacado da tabela; mais ninguém o alcança
    unsafe {
        let mut cursor = (*header).head;
        while cursor != 0 {
            let msg: *const KernelMessage = PhysAddr::new(cursor).as_ptr();
            let next = (*msg).next;
            pmm::free(PhysAddr::new(cursor), 1);
            cursor = next;
        }
    }
    pmm::free(PhysAddr::new(header_addr), 1);

    Status::Ok
}

/// Comprimento atual da fila de `pid`.
pub fn queue_len(pid: Pid) -> u32 {
    if pid as usize >= MAX_PROCESSES {
        return 0;
    }
    let queues = QUEUES.lock();
    let header_addr = queues.headers[pid as usize];
    if header_addr == 0 {
        return 0;
    }
    let header: *const QueueHeader = PhysAddr::new(header_addr).as_ptr();
    // SAFETY: leitura sob o lock da tabela
    unsafe { (*header).count }
}

/// Registra um handler de userspace para um tipo de mensagem.
pub fn register_handler(msg_type: u32, handler: u32) -> Status {
    if msg_type as usize >= MAX_HANDLERS || handler == 0 {
        return Status::InvalidParam;
    }

    let mut handlers = HANDLERS.lock();
    if handlers[msg_type as usize] != 0 {
        return Status::AlreadyExists;
    }
    handlers[msg_type as usize] = handler;
    Status::Ok
}

/// Destaca e devolve a primeira mensagem compatível sem precisar de um
/// processo corrente. Hook das suítes de self-test.
#[cfg(feature = "self_tests")]
pub fn test_take(pid: Pid, sender_filter: Pid) -> Option<Envelope> {
    let frame = {
        let mut queues = QUEUES.lock();
        take_matching(&mut queues, pid, sender_filter)
    }?;

    let msg: *const KernelMessage = frame.as_ptr();
    // SAFETY: mensagem destacada, frame exclusivo
    let envelope = unsafe { (*msg).envelope };
    pmm::free(frame, 1);
    Some(envelope)
}

// ============================================================================
// INTERNO
// ============================================================================

/// Garante a fila de `pid`, criando o header no primeiro uso.
fn ensure_queue(queues: &mut QueueTable, pid: Pid) -> Option<*mut QueueHeader> {
    let entry = &mut queues.headers[pid as usize];
    if *entry == 0 {
        let frame = pmm::alloc_frame_zeroed()?;
        let header: *mut QueueHeader = frame.as_mut_ptr();
        // SAFETY: frame zerado e exclusivo
        unsafe {
            (*header).head = 0;
            (*header).tail = 0;
            (*header).count = 0;
            (*header).max_count = QUEUE_CAP;
        }
        *entry = frame.as_u32();
    }
    Some(PhysAddr::new(*entry).as_mut_ptr())
}

/// Anexa no fim da fila. Chamador garante espaço.
unsafe fn enqueue_tail(header: *mut QueueHeader, msg_addr: u32) {
    let msg: *mut KernelMessage = PhysAddr::new(msg_addr).as_mut_ptr();
    (*msg).next = 0;

    if (*header).head == 0 {
        (*header).head = msg_addr;
        (*header).tail = msg_addr;
    } else {
        let tail: *mut KernelMessage = PhysAddr::new((*header).tail).as_mut_ptr();
        (*tail).next = msg_addr;
        (*header).tail = msg_addr;
    }
    (*header).count += 1;
}

/// Remove e retorna a cabeça da fila.
unsafe fn dequeue_head(header: *mut QueueHeader) -> Option<PhysAddr> {
    let head_addr = (*header).head;
    if head_addr == 0 {
        return None;
    }

    let msg: *mut KernelMessage = PhysAddr::new(head_addr).as_mut_ptr();
    (*header).head = (*msg).next;
    if (*header).head == 0 {
        (*header).tail = 0;
    }
    (*header).count -= 1;
    (*msg).next = 0;

    Some(PhysAddr::new(head_addr))
}

/// Destaca a primeira mensagem de `sender_filter` (0 = qualquer).
fn take_matching(queues: &mut QueueTable, pid: Pid, sender_filter: Pid) -> Option<PhysAddr> {
    let header_addr = queues.headers[pid as usize];
    if header_addr == 0 {
        return None;
    }
    let header: *mut QueueHeader = PhysAddr::new(header_addr).as_mut_ptr();

    // SAFETY: mutação sob o lock da tabela de filas
    unsafe {
        let mut cursor = (*header).head;
        let mut prev: u32 = 0;

        while cursor != 0 {
            let msg: *mut KernelMessage = PhysAddr::new(cursor).as_mut_ptr();
            let matches = sender_filter == 0 || (*msg).envelope.sender_pid == sender_filter;

            if matches {
                let next = (*msg).next;
                if prev == 0 {
                    (*header).head = next;
                } else {
                    let prev_msg: *mut KernelMessage = PhysAddr::new(prev).as_mut_ptr();
                    (*prev_msg).next = next;
                }
                if (*header).tail == cursor {
                    (*header).tail = prev;
                }
                (*header).count -= 1;
                (*msg).next = 0;
                return Some(PhysAddr::new(cursor));
            }

            prev = cursor;
            cursor = (*msg).next;
        }
    }
    None
}
