//! Sequência de boot do kernel.
//!
//! Ordem de subida (folhas primeiro): console/serial → GDT+TSS → PIC →
//! memória (PMM + paginação) → scheduler → processos → IPC → capabilities
//! → syscalls → IDT → PIT. Interrupções só habilitam com tudo de pé;
//! depois os serviços são lançados e o kernel cai no idle loop.

use crate::arch::x86::{gdt, interrupts};
use crate::arch::Cpu;
use crate::core::config::{
    SERVICE_COPY_WINDOW, SERVICE_IMAGE_BASE, SERVICE_IMAGE_SIZE, SERVICE_NAMES, SERVICE_VIRT_BASE,
};
use crate::drivers::{console, pic, pit, serial};
use crate::ipc;
use crate::mm::config::PAGE_SIZE;
use crate::mm::paging::{self, PageFlags};
use crate::mm::{pmm, VirtAddr};
use crate::sched::{lifecycle, scheduler};
use crate::security::capability::{self, CapRights, CapType};
use crate::sys::types::{Pid, KERNEL_PID};
use crate::syscall;

/// Frequência do timer do sistema (Hz).
const TIMER_HZ: u32 = 100;

/// Entry point do kernel, chamado pelo stub `_start`.
#[no_mangle]
pub extern "C" fn kernel_main() -> ! {
    Cpu::disable_interrupts();

    // O bootloader copia só a imagem; o BSS chega com lixo
    clear_bss();

    serial::init();
    console::init();

    crate::kprintln!("Anvil OS v0.3");
    crate::kprintln!("=============");

    unsafe {
        gdt::init();
    }
    pic::init();

    unsafe {
        crate::mm::init();
    }

    scheduler::init();
    lifecycle::init();
    ipc::init();
    capability::init();
    syscall::init();

    unsafe {
        interrupts::init();
    }
    pit::init(TIMER_HZ);
    pic::unmask(0); // timer
    pic::unmask(1); // teclado

    #[cfg(feature = "self_tests")]
    crate::core::self_test::run_all();

    start_system_services();

    crate::kok!("Boot completo; habilitando interrupções");
    Cpu::enable_interrupts();

    // Idle: o próximo tick despacha o primeiro serviço
    scheduler::idle_main()
}

/// Zera a seção BSS. A stack de boot fica numa seção própria, fora da
/// faixa zerada.
fn clear_bss() {
    extern "C" {
        static mut __bss_start: u8;
        static mut __bss_end: u8;
    }

    // SAFETY: símbolos do linker script delimitando o BSS; nenhum static
    // foi tocado ainda
    unsafe {
        let start = core::ptr::addr_of_mut!(__bss_start);
        let end = core::ptr::addr_of_mut!(__bss_end);
        let len = end as usize - start as usize;
        core::ptr::write_bytes(start, 0, len);
    }
}

/// Lança os serviços de sistema nos PIDs 1..=5.
fn start_system_services() {
    for (index, name) in SERVICE_NAMES.iter().enumerate() {
        let offset = index as u32 * SERVICE_IMAGE_SIZE;
        match start_service(offset) {
            Ok(pid) => crate::kinfo!("(Boot) Serviço '{}' no PID {}", name, pid),
            Err(status) => crate::kerror!("(Boot) Falha ao subir '{}': {:?}", name, status),
        }
    }
}

/// Sobe um serviço: copia a imagem (depositada pelo bootloader) para
/// frames novos mapeados user/RW na base virtual fixa, prepara o entry
/// frame e enfileira no scheduler.
fn start_service(binary_offset: u32) -> Result<Pid, crate::sys::error::Status> {
    let slot = lifecycle::create(KERNEL_PID, true)?;
    let pid = lifecycle::pid_of(slot).unwrap_or(0);
    let page_directory = lifecycle::pcb_mut(slot).page_directory;

    let pages_needed = (SERVICE_IMAGE_SIZE as usize) / PAGE_SIZE;
    let src_base = SERVICE_IMAGE_BASE + binary_offset;
    let kernel_dir = paging::kernel_directory();

    for i in 0..pages_needed {
        let frame = match pmm::alloc_frame() {
            Some(frame) => frame,
            None => {
                lifecycle::exit(slot, 0);
                return Err(crate::sys::error::Status::OutOfMemory);
            }
        };

        let page_offset = (i * PAGE_SIZE) as u32;

        // Destino no espaço do serviço (user/RW) + janela temporária do
        // kernel para escrever o conteúdo
        let mapped = paging::map_page(
            page_directory,
            VirtAddr::new(SERVICE_VIRT_BASE + page_offset),
            frame,
            PageFlags::USER_RW,
        )
        .and_then(|_| {
            paging::map_page(
                kernel_dir,
                VirtAddr::new(SERVICE_COPY_WINDOW),
                frame,
                PageFlags::KERNEL_RW,
            )
        });
        if let Err(status) = mapped {
            pmm::free(frame, 1);
            lifecycle::exit(slot, 0);
            return Err(status);
        }

        // SAFETY: origem identity-mapeada (imagem do bootloader), destino
        // é a janela recém-mapeada; ambas de PAGE_SIZE bytes
        unsafe {
            core::ptr::copy_nonoverlapping(
                (src_base + page_offset) as *const u8,
                SERVICE_COPY_WINDOW as *mut u8,
                PAGE_SIZE,
            );
        }

        paging::unmap_page(kernel_dir, VirtAddr::new(SERVICE_COPY_WINDOW));
    }

    // Restaura o identity map do kernel na janela de cópia
    let _ = paging::map_page(
        kernel_dir,
        VirtAddr::new(SERVICE_COPY_WINDOW),
        crate::mm::PhysAddr::new(SERVICE_COPY_WINDOW),
        PageFlags::KERNEL_RW,
    );

    lifecycle::setup_entry(slot, SERVICE_VIRT_BASE);
    grant_service_capabilities(pid);
    scheduler::add(slot);

    Ok(pid)
}

/// Concede as capabilities de cada serviço. Só o kernel chega aqui.
fn grant_service_capabilities(pid: Pid) {
    // Todos os serviços falam IPC e gerenciam a própria memória
    let _ = capability::grant(
        KERNEL_PID,
        pid,
        CapType::Ipc,
        CapRights::READ | CapRights::WRITE | CapRights::CREATE,
        0,
    );
    let _ = capability::grant(
        KERNEL_PID,
        pid,
        CapType::Memory,
        CapRights::ALLOC | CapRights::FREE | CapRights::WRITE,
        0,
    );

    match pid {
        // init: gerencia processos e pode desligar o sistema
        1 => {
            let _ = capability::grant(
                KERNEL_PID,
                pid,
                CapType::Process,
                CapRights::CREATE | CapRights::DELETE,
                0,
            );
            let _ = capability::grant(KERNEL_PID, pid, CapType::System, CapRights::EXECUTE, 0);
        }
        // drivers: teclado, console, timer
        2..=4 => {
            let _ = capability::grant(
                KERNEL_PID,
                pid,
                CapType::Driver,
                CapRights::CREATE | CapRights::WRITE,
                0,
            );
            let _ = capability::grant(
                KERNEL_PID,
                pid,
                CapType::Hardware,
                CapRights::READ | CapRights::WRITE,
                0,
            );
        }
        // shell: cria/mata processos e fala com drivers
        5 => {
            let _ = capability::grant(
                KERNEL_PID,
                pid,
                CapType::Process,
                CapRights::CREATE | CapRights::DELETE,
                0,
            );
            let _ = capability::grant(KERNEL_PID, pid, CapType::Driver, CapRights::WRITE, 0);
        }
        _ => {}
    }
}
