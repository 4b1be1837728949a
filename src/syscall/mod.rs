//! Interface de syscalls com o userspace.
//!
//! Entrada via `int 0x80`: EAX = número, EBX/ECX/EDX = argumentos na ordem
//! declarada, retorno em EAX. O dispatcher valida o número, exige um
//! processo corrente, admite via tabela de capabilities e grava o
//! resultado no slot EAX do trap frame antes do `iretd`.

pub mod numbers;

#[cfg(feature = "self_tests")]
pub mod test;

use numbers::*;

use crate::arch::x86::interrupts::TrapFrame;
use crate::arch::Cpu;
use crate::ipc::{self, message::Envelope};
use crate::mm::config::MEMORY_SIZE;
use crate::mm::paging::{self, PageFlags};
use crate::mm::{pmm, PhysAddr, VirtAddr};
use crate::sched::{lifecycle, scheduler};
use crate::security::capability::{self, CapRights, CapType};
use crate::sync::Spinlock;
use crate::sys::error::Status;
use crate::sys::types::{Pid, KERNEL_PID};

/// Handler de syscall: três argumentos, retorno no acumulador.
pub type SyscallFn = fn(u32, u32, u32) -> u32;

static TABLE: Spinlock<[Option<SyscallFn>; SYSCALL_TABLE_SIZE]> =
    Spinlock::new([None; SYSCALL_TABLE_SIZE]);

/// Registra os handlers do kernel.
pub fn init() {
    let mut table = TABLE.lock();
    *table = [None; SYSCALL_TABLE_SIZE];

    table[SYS_PROCESS_CREATE as usize] = Some(sys_process_create as SyscallFn);
    table[SYS_PROCESS_EXIT as usize] = Some(sys_process_exit as SyscallFn);
    table[SYS_PROCESS_YIELD as usize] = Some(sys_process_yield as SyscallFn);
    table[SYS_PROCESS_KILL as usize] = Some(sys_process_kill as SyscallFn);
    table[SYS_MEMORY_ALLOC as usize] = Some(sys_memory_alloc as SyscallFn);
    table[SYS_MEMORY_FREE as usize] = Some(sys_memory_free as SyscallFn);
    table[SYS_MEMORY_MAP as usize] = Some(sys_memory_map as SyscallFn);
    table[SYS_IPC_SEND as usize] = Some(sys_ipc_send as SyscallFn);
    table[SYS_IPC_RECEIVE as usize] = Some(sys_ipc_receive as SyscallFn);
    table[SYS_IPC_REGISTER as usize] = Some(sys_ipc_register as SyscallFn);
    table[SYS_DRIVER_REGISTER as usize] = Some(sys_driver_register as SyscallFn);
    table[SYS_DRIVER_REQUEST as usize] = Some(sys_driver_request as SyscallFn);
    table[SYS_SYSTEM_SHUTDOWN as usize] = Some(sys_system_shutdown as SyscallFn);
    table[SYS_DEBUG_PRINT as usize] = Some(sys_debug_print as SyscallFn);
    drop(table);

    crate::kinfo!("(Sys) 14 syscalls registradas");
}

/// Registra um handler avulso. `AlreadyExists` em registro duplicado.
pub fn register(num: u32, handler: SyscallFn) -> Status {
    if num as usize >= SYSCALL_TABLE_SIZE {
        return Status::InvalidParam;
    }
    let mut table = TABLE.lock();
    if table[num as usize].is_some() {
        return Status::AlreadyExists;
    }
    table[num as usize] = Some(handler);
    Status::Ok
}

/// Capability exigida por syscall. `None` = sem admissão (exit, yield,
/// debug_print).
fn required_capability(num: u32) -> Option<(CapType, CapRights)> {
    match num {
        SYS_PROCESS_CREATE => Some((CapType::Process, CapRights::CREATE)),
        SYS_PROCESS_KILL => Some((CapType::Process, CapRights::DELETE)),
        SYS_MEMORY_ALLOC => Some((CapType::Memory, CapRights::ALLOC)),
        SYS_MEMORY_FREE => Some((CapType::Memory, CapRights::FREE)),
        SYS_MEMORY_MAP => Some((CapType::Memory, CapRights::WRITE)),
        SYS_IPC_SEND => Some((CapType::Ipc, CapRights::WRITE)),
        SYS_IPC_RECEIVE => Some((CapType::Ipc, CapRights::READ)),
        SYS_IPC_REGISTER => Some((CapType::Ipc, CapRights::CREATE)),
        SYS_DRIVER_REGISTER => Some((CapType::Driver, CapRights::CREATE)),
        SYS_DRIVER_REQUEST => Some((CapType::Driver, CapRights::WRITE)),
        SYS_SYSTEM_SHUTDOWN => Some((CapType::System, CapRights::EXECUTE)),
        _ => None,
    }
}

/// Despacho do vetor 0x80.
pub fn dispatch(frame: &mut TrapFrame) {
    let num = frame.eax;

    let handler = if (num as usize) < SYSCALL_TABLE_SIZE {
        TABLE.lock()[num as usize]
    } else {
        None
    };
    let Some(handler) = handler else {
        frame.eax = Status::NotImplemented.as_reg();
        return;
    };

    let Some(caller) = scheduler::current_pid() else {
        frame.eax = Status::PermissionDenied.as_reg();
        return;
    };

    if let Some((cap_type, required)) = required_capability(num) {
        if !capability::check(caller, cap_type, required).is_ok() {
            crate::kdebug!(
                "(Sys) PID {} sem capability para syscall {:#04x}",
                caller,
                num
            );
            frame.eax = Status::PermissionDenied.as_reg();
            return;
        }
    }

    frame.eax = handler(frame.ebx, frame.ecx, frame.edx);
}

// ============================================================================
// VALIDAÇÃO DE PONTEIROS DE USUÁRIO
// ============================================================================

/// Ponteiro de usuário aceitável: não-nulo e com `len` bytes dentro da
/// faixa mapeada. Todo endereço < 16 MiB está presente em qualquer
/// directory (identity map do kernel), então o bounds-check basta para o
/// kernel não faultar.
fn user_range_ok(ptr: u32, len: usize) -> bool {
    ptr != 0 && (ptr as u64 + len as u64) <= MEMORY_SIZE as u64
}

/// Copia um envelope do userspace.
fn copy_envelope_in(ptr: u32) -> Option<Envelope> {
    if !user_range_ok(ptr, ipc::message::ENVELOPE_SIZE) {
        return None;
    }
    // SAFETY: faixa validada, mapeada em todo espaço de endereçamento
    Some(unsafe { core::ptr::read_unaligned(ptr as *const Envelope) })
}

/// Copia um envelope para o userspace.
fn copy_envelope_out(ptr: u32, envelope: &Envelope) -> bool {
    if !user_range_ok(ptr, ipc::message::ENVELOPE_SIZE) {
        return false;
    }
    // SAFETY: faixa validada
    unsafe {
        core::ptr::write_unaligned(ptr as *mut Envelope, *envelope);
    }
    true
}

// ============================================================================
// PROCESSOS
// ============================================================================

/// 0x01: cria um filho do processo corrente. Retorna o PID do filho.
///
/// O filho nasce `Created` e só é despachado depois que alguém preparar o
/// entry point dele; enfileirar um PCB sem frame de entrada derrubaria o
/// primeiro dispatch.
fn sys_process_create(_ebx: u32, _ecx: u32, _edx: u32) -> u32 {
    let parent = scheduler::current_pid().unwrap_or(KERNEL_PID);

    match lifecycle::create(parent, true) {
        Ok(slot) => lifecycle::pid_of(slot).unwrap_or(0),
        Err(status) => status.as_reg(),
    }
}

/// 0x02: termina o processo corrente. Não retorna.
fn sys_process_exit(exit_code: u32, _ecx: u32, _edx: u32) -> u32 {
    lifecycle::exit_current(exit_code)
}

/// 0x03: cede a CPU voluntariamente.
fn sys_process_yield(_ebx: u32, _ecx: u32, _edx: u32) -> u32 {
    scheduler::yield_now();
    0
}

/// 0x04: mata um processo por PID.
fn sys_process_kill(target_pid: u32, _ecx: u32, _edx: u32) -> u32 {
    lifecycle::kill(target_pid).as_reg()
}

// ============================================================================
// MEMÓRIA
// ============================================================================

/// 0x10: aloca `byte_size` arredondado a páginas, mapeado no espaço do
/// chamador. Retorna o endereço virtual, ou 0 em falha.
fn sys_memory_alloc(byte_size: u32, _ecx: u32, _edx: u32) -> u32 {
    if byte_size == 0 {
        return 0;
    }

    let Some(slot) = scheduler::current_slot() else {
        return 0;
    };
    let pcb = lifecycle::pcb_mut(slot);

    let pages = crate::klib::align::pages_for(byte_size) as usize;
    let Some(base) = pmm::alloc_contiguous(pages) else {
        return 0;
    };

    // Identity map na faixa do processo; usuário ganha acesso direto
    let flags = if pcb.is_user {
        PageFlags::USER_RW
    } else {
        PageFlags::KERNEL_RW
    };
    for i in 0..pages {
        let addr = base.as_u32() + (i * crate::mm::config::PAGE_SIZE) as u32;
        if paging::map_page(
            pcb.page_directory,
            VirtAddr::new(addr),
            PhysAddr::new(addr),
            flags,
        )
        .is_err()
        {
            pmm::free(base, pages);
            return 0;
        }
    }

    base.as_u32()
}

/// 0x11: devolve uma página alocada por `memory_alloc`.
///
/// Libera exatamente uma página por chamada; regiões maiores são
/// devolvidas página a página.
fn sys_memory_free(virt_addr: u32, _ecx: u32, _edx: u32) -> u32 {
    if virt_addr == 0 || virt_addr % crate::mm::config::PAGE_SIZE as u32 != 0 {
        return Status::InvalidParam.as_reg();
    }

    let Some(slot) = scheduler::current_slot() else {
        return Status::PermissionDenied.as_reg();
    };
    let pcb = lifecycle::pcb_mut(slot);

    paging::unmap_page(pcb.page_directory, VirtAddr::new(virt_addr));
    pmm::free(PhysAddr::new(virt_addr), 1);

    Status::Ok.as_reg()
}

/// 0x12: mapeia `virt` → `phys` no espaço do chamador.
fn sys_memory_map(virt: u32, phys: u32, flags: u32) -> u32 {
    let Some(slot) = scheduler::current_slot() else {
        return Status::PermissionDenied.as_reg();
    };
    let pcb = lifecycle::pcb_mut(slot);

    match paging::map_page(
        pcb.page_directory,
        VirtAddr::new(virt),
        PhysAddr::new(phys),
        PageFlags::from_bits_truncate(flags),
    ) {
        Ok(()) => Status::Ok.as_reg(),
        Err(status) => status.as_reg(),
    }
}

// ============================================================================
// IPC
// ============================================================================

/// 0x20: envia um envelope para `receiver_pid`.
fn sys_ipc_send(receiver_pid: u32, envelope_ptr: u32, _edx: u32) -> u32 {
    let Some(envelope) = copy_envelope_in(envelope_ptr) else {
        return Status::InvalidParam.as_reg();
    };
    ipc::send(receiver_pid, &envelope).as_reg()
}

/// 0x21: recebe um envelope. `sender_filter` 0 = qualquer; `block` != 0
/// bloqueia até chegar mensagem compatível.
fn sys_ipc_receive(sender_filter: u32, envelope_ptr: u32, block: u32) -> u32 {
    if !user_range_ok(envelope_ptr, ipc::message::ENVELOPE_SIZE) {
        return Status::InvalidParam.as_reg();
    }

    let mut envelope = Envelope::new(0);
    let status = ipc::receive(sender_filter as Pid, &mut envelope, block != 0);
    if status.is_ok() && !copy_envelope_out(envelope_ptr, &envelope) {
        return Status::InvalidParam.as_reg();
    }
    status.as_reg()
}

/// 0x22: registra um handler de mensagem por tipo.
fn sys_ipc_register(msg_type: u32, handler_ptr: u32, _edx: u32) -> u32 {
    ipc::register_handler(msg_type, handler_ptr).as_reg()
}

// ============================================================================
// DRIVERS
// ============================================================================

/// Comprimento máximo aceito para o nome de um driver.
const DRIVER_NAME_MAX: usize = 32;

/// 0x30: registra o processo corrente como driver.
fn sys_driver_register(name_ptr: u32, capabilities: u32, _edx: u32) -> u32 {
    let Some(caller) = scheduler::current_pid() else {
        return Status::PermissionDenied.as_reg();
    };

    let mut name_buf = [0u8; DRIVER_NAME_MAX];
    let Some(name_len) = copy_cstring_in(name_ptr, &mut name_buf) else {
        return Status::InvalidParam.as_reg();
    };

    let status = crate::drivers::registry::register(caller, &name_buf[..name_len], capabilities);
    if !status.is_ok() {
        return status.as_reg();
    }

    // Direitos de driver ficam registrados como capability
    let grant = capability::grant(
        KERNEL_PID,
        caller,
        CapType::Driver,
        CapRights::from_bits_truncate(capabilities) | CapRights::WRITE,
        0,
    );
    if !grant.is_ok() {
        let _ = crate::drivers::registry::unregister(caller);
        return grant.as_reg();
    }

    crate::kinfo!(
        "(Sys) Driver registrado: pid={} caps={:#x}",
        caller,
        capabilities
    );
    Status::Ok.as_reg()
}

/// 0x31: encaminha um pedido ao driver (send direto).
fn sys_driver_request(driver_pid: u32, envelope_ptr: u32, _edx: u32) -> u32 {
    let Some(envelope) = copy_envelope_in(envelope_ptr) else {
        return Status::InvalidParam.as_reg();
    };
    ipc::send(driver_pid, &envelope).as_reg()
}

// ============================================================================
// SISTEMA
// ============================================================================

/// 0x40: desliga o sistema. Não retorna.
fn sys_system_shutdown(_ebx: u32, _ecx: u32, _edx: u32) -> u32 {
    let caller = scheduler::current_pid().unwrap_or(KERNEL_PID);
    crate::kinfo!("(Sys) Shutdown requisitado pelo PID {}", caller);

    Cpu::disable_interrupts();
    crate::kprintln!("Sistema parado.");
    crate::drivers::serial::force_flush();
    Cpu::hang()
}

/// 0x41: escreve uma C-string do usuário no log do kernel.
fn sys_debug_print(cstring_ptr: u32, _ecx: u32, _edx: u32) -> u32 {
    let mut buf = [0u8; 256];
    let Some(len) = copy_cstring_in(cstring_ptr, &mut buf) else {
        return Status::InvalidParam.as_reg();
    };

    let pid = scheduler::current_pid().unwrap_or(KERNEL_PID);
    match core::str::from_utf8(&buf[..len]) {
        Ok(text) => crate::kprintln!("(PID {}) {}", pid, text),
        Err(_) => crate::kprintln!("(PID {}) <{} bytes não-UTF8>", pid, len),
    }
    0
}

/// Copia uma C-string limitada do userspace. Retorna o comprimento.
fn copy_cstring_in(ptr: u32, buf: &mut [u8]) -> Option<usize> {
    if !user_range_ok(ptr, 1) {
        return None;
    }

    for i in 0..buf.len() {
        let addr = ptr + i as u32;
        if !user_range_ok(addr, 1) {
            return Some(i);
        }
        // SAFETY: endereço validado no identity map
        let byte = unsafe { core::ptr::read(addr as *const u8) };
        if byte == 0 {
            return Some(i);
        }
        buf[i] = byte;
    }
    Some(buf.len())
}
