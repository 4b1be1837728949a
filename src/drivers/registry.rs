//! Registro de drivers de userspace.
//!
//! Tabela fixa com um slot por driver registrado via syscall 0x30. O
//! kernel só guarda a identidade (PID, nome, capacidades declaradas) e os
//! entry points de init/cleanup — dois campos distintos, um driver pode
//! legitimamente ter rotinas diferentes para subir e desmontar.

use crate::sync::Spinlock;
use crate::sys::error::Status;
use crate::sys::types::Pid;

const MAX_DRIVERS: usize = 16;
const NAME_LEN: usize = 32;

/// Entrada de um driver registrado.
#[derive(Clone, Copy)]
pub struct DriverEntry {
    pub pid: Pid,
    pub name: [u8; NAME_LEN],
    pub capabilities: u32,
    /// Entry point de inicialização (endereço virtual no driver).
    pub init_entry: u32,
    /// Entry point de desmontagem. Distinto de `init_entry`.
    pub cleanup_entry: u32,
}

struct Registry {
    slots: [Option<DriverEntry>; MAX_DRIVERS],
    count: usize,
}

static REGISTRY: Spinlock<Registry> = Spinlock::new(Registry {
    slots: [None; MAX_DRIVERS],
    count: 0,
});

/// Registra um driver. `AlreadyExists` se o PID já tem registro.
pub fn register(pid: Pid, name: &[u8], capabilities: u32) -> Status {
    let mut guard = REGISTRY.lock();
    let registry = &mut *guard;

    if registry
        .slots
        .iter()
        .flatten()
        .any(|entry| entry.pid == pid)
    {
        return Status::AlreadyExists;
    }

    let mut name_buf = [0u8; NAME_LEN];
    let len = name.len().min(NAME_LEN - 1);
    name_buf[..len].copy_from_slice(&name[..len]);

    match registry.slots.iter().position(|slot| slot.is_none()) {
        Some(free) => {
            registry.slots[free] = Some(DriverEntry {
                pid,
                name: name_buf,
                capabilities,
                init_entry: 0,
                cleanup_entry: 0,
            });
            registry.count += 1;
            Status::Ok
        }
        None => Status::OutOfMemory,
    }
}

/// Remove o registro de um PID (caminho de exit).
pub fn unregister(pid: Pid) -> Status {
    let mut guard = REGISTRY.lock();
    let registry = &mut *guard;

    let found = registry
        .slots
        .iter()
        .position(|slot| slot.as_ref().is_some_and(|entry| entry.pid == pid));

    match found {
        Some(index) => {
            registry.slots[index] = None;
            registry.count -= 1;
            Status::Ok
        }
        None => Status::NotFound,
    }
}

/// Procura um driver pelo nome.
pub fn find_by_name(name: &[u8]) -> Option<Pid> {
    let registry = REGISTRY.lock();

    for slot in registry.slots.iter().flatten() {
        let stored_len = slot
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_LEN);
        if &slot.name[..stored_len] == name {
            return Some(slot.pid);
        }
    }
    None
}

/// Verifica se o PID tem driver registrado.
pub fn is_registered(pid: Pid) -> bool {
    REGISTRY
        .lock()
        .slots
        .iter()
        .flatten()
        .any(|entry| entry.pid == pid)
}

/// Número de drivers registrados.
pub fn count() -> usize {
    REGISTRY.lock().count
}
