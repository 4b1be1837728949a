//! Tabela global de capabilities.
//!
//! Armazenamento fixo: 16 entradas por PID sobre a capacidade da tabela de
//! processos. A soma de integridade é conferida em toda admissão; uma
//! entrada adulterada é tratada como ausente.

use super::cap::{CapType, Capability};
use super::rights::CapRights;
use crate::sched::task::lifecycle::MAX_PROCESSES;
use crate::sync::Spinlock;
use crate::sys::error::Status;
use crate::sys::types::{Pid, KERNEL_PID};

/// Entradas máximas por PID.
pub const CAPS_PER_PROCESS: usize = 16;

/// Capacidade total da tabela.
const TABLE_CAPACITY: usize = MAX_PROCESSES * CAPS_PER_PROCESS;

struct CapTable {
    slots: [Option<Capability>; TABLE_CAPACITY],
    next_cap_id: u32,
    count: usize,
}

const NO_CAP: Option<Capability> = None;

static TABLE: Spinlock<CapTable> = Spinlock::new(CapTable {
    slots: [NO_CAP; TABLE_CAPACITY],
    next_cap_id: 1,
    count: 0,
});

/// Inicializa a tabela de capabilities.
pub fn init() {
    let mut table = TABLE.lock();
    table.slots = [NO_CAP; TABLE_CAPACITY];
    table.next_cap_id = 1;
    table.count = 0;
    drop(table);

    crate::kinfo!(
        "(Cap) Tabela: {} entradas ({} por PID)",
        TABLE_CAPACITY,
        CAPS_PER_PROCESS
    );
}

/// Concede uma capability a `pid`. Só o kernel (PID 0) concede.
pub fn grant(
    granter: Pid,
    pid: Pid,
    cap_type: CapType,
    permissions: CapRights,
    resource_id: u32,
) -> Status {
    if granter != KERNEL_PID {
        return Status::PermissionDenied;
    }

    let mut table = TABLE.lock();

    if owned_entries(&table, pid) >= CAPS_PER_PROCESS {
        return Status::OutOfMemory;
    }

    let cap_id = table.next_cap_id;
    table.next_cap_id += 1;
    let cap = Capability::new(cap_id, pid, cap_type, permissions, resource_id, 0);

    match table.slots.iter().position(|slot| slot.is_none()) {
        Some(free) => {
            table.slots[free] = Some(cap);
            table.count += 1;
            Status::Ok
        }
        None => Status::OutOfMemory,
    }
}

/// Admissão: `pid` possui `cap_type` com todos os bits de `required`?
///
/// Nega quando não há entrada, quando a soma de integridade não confere ou
/// quando o tick de expiração já passou.
pub fn check(pid: Pid, cap_type: CapType, required: CapRights) -> Status {
    let now = crate::drivers::pit::ticks();
    let table = TABLE.lock();

    for cap in table.slots.iter().flatten() {
        if cap.owner_pid == pid
            && cap.cap_type == cap_type
            && cap.permissions.has(required)
            && cap.is_live(now)
            && cap.verify()
        {
            return Status::Ok;
        }
    }

    Status::PermissionDenied
}

/// Revoga entradas de `pid`/`cap_type`. `resource_id` 0 casa com qualquer
/// recurso. Só o kernel revoga.
pub fn revoke(revoker: Pid, pid: Pid, cap_type: CapType, resource_id: u32) -> Status {
    if revoker != KERNEL_PID {
        return Status::PermissionDenied;
    }

    let mut table = TABLE.lock();
    let mut removed = 0usize;

    for slot in table.slots.iter_mut() {
        let matches = slot.as_ref().is_some_and(|cap| {
            cap.owner_pid == pid
                && cap.cap_type == cap_type
                && (resource_id == 0 || cap.resource_id == resource_id)
        });
        if matches {
            *slot = None;
            removed += 1;
        }
    }
    table.count -= removed;

    if removed > 0 {
        Status::Ok
    } else {
        Status::NotFound
    }
}

/// Transfere uma entrada para outro dono e regrava a soma.
///
/// Exige que o chamador seja o dono atual e que a entrada tenha o bit
/// TRANSFER. O limite de 16 entradas por PID vale também aqui: um
/// destinatário cheio não recebe por transferência.
pub fn transfer(caller: Pid, cap_id: u32, new_owner: Pid) -> Status {
    let mut table = TABLE.lock();

    let index = match table
        .slots
        .iter()
        .position(|slot| slot.as_ref().is_some_and(|cap| cap.cap_id == cap_id))
    {
        Some(index) => index,
        None => return Status::NotFound,
    };

    if let Some(cap) = table.slots[index].as_ref() {
        if cap.owner_pid != caller {
            return Status::PermissionDenied;
        }
        if !cap.permissions.has(CapRights::TRANSFER) {
            return Status::PermissionDenied;
        }
    }

    if new_owner != caller && owned_entries(&table, new_owner) >= CAPS_PER_PROCESS {
        return Status::OutOfMemory;
    }

    if let Some(cap) = table.slots[index].as_mut() {
        cap.owner_pid = new_owner;
        cap.seal();
    }
    Status::Ok
}

/// Destrói todas as entradas de um PID (caminho de exit).
pub fn destroy_for_pid(pid: Pid) {
    let mut table = TABLE.lock();
    let mut removed = 0usize;

    for slot in table.slots.iter_mut() {
        if slot.as_ref().is_some_and(|cap| cap.owner_pid == pid) {
            *slot = None;
            removed += 1;
        }
    }
    table.count -= removed;
}

/// Varre e destrói entradas expiradas.
pub fn cleanup_expired() {
    let now = crate::drivers::pit::ticks();
    let mut table = TABLE.lock();
    let mut removed = 0usize;

    for slot in table.slots.iter_mut() {
        if slot
            .as_ref()
            .is_some_and(|cap| cap.expiration != 0 && cap.expiration <= now)
        {
            *slot = None;
            removed += 1;
        }
    }
    table.count -= removed;
}

/// Entradas vivas de um PID.
pub fn count_for_pid(pid: Pid) -> usize {
    owned_entries(&TABLE.lock(), pid)
}

/// Entradas de `pid` numa tabela já travada. Todo caminho que insere ou
/// re-parenta uma entrada confere o limite por PID através daqui.
fn owned_entries(table: &CapTable, pid: Pid) -> usize {
    table
        .slots
        .iter()
        .flatten()
        .filter(|cap| cap.owner_pid == pid)
        .count()
}

/// Concede uma capability com expiração explícita (kernel).
pub fn grant_expiring(
    granter: Pid,
    pid: Pid,
    cap_type: CapType,
    permissions: CapRights,
    resource_id: u32,
    expiration: u32,
) -> Status {
    if granter != KERNEL_PID {
        return Status::PermissionDenied;
    }

    let mut table = TABLE.lock();

    if owned_entries(&table, pid) >= CAPS_PER_PROCESS {
        return Status::OutOfMemory;
    }

    let cap_id = table.next_cap_id;
    table.next_cap_id += 1;
    let cap = Capability::new(cap_id, pid, cap_type, permissions, resource_id, expiration);

    match table.slots.iter().position(|slot| slot.is_none()) {
        Some(free) => {
            table.slots[free] = Some(cap);
            table.count += 1;
            Status::Ok
        }
        None => Status::OutOfMemory,
    }
}
