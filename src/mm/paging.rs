//! Paginação i386 de dois níveis.
//!
//! Entrada de 32 bits: bits 31..12 = base do frame; bit 0 = present;
//! bit 1 = writable; bit 2 = user. Entradas de directory usam o mesmo
//! layout apontando para a page table correspondente.
//!
//! Regras:
//! - o bit present é sempre setado na escrita;
//! - ausência do bit user significa ring-0-only;
//! - toda faixa [0, 16 MiB) é identity-mapeada supervisor/RW em todo
//!   espaço de endereçamento (`map_kernel`), exceto as stacks de usuário
//!   mapeadas explicitamente com o bit user;
//! - o directory do kernel nunca é destruído.

use super::addr::{PhysAddr, VirtAddr};
use super::config::{MEMORY_SIZE, PAGE_SIZE, TABLE_ENTRIES};
use super::pmm;
use crate::arch::Cpu;
use crate::bitflags;
use crate::sys::error::{KResult, Status};

bitflags! {
    /// Flags de uma entrada de página.
    pub struct PageFlags: u32 {
        const PRESENT = 1 << 0;
        const WRITABLE = 1 << 1;
        const USER = 1 << 2;
    }
}

impl PageFlags {
    /// Supervisor, leitura/escrita (mapeamentos do kernel).
    pub const KERNEL_RW: PageFlags = PageFlags::from_bits_truncate(0x03);
    /// Usuário, leitura/escrita (stacks e imagens de serviço).
    pub const USER_RW: PageFlags = PageFlags::from_bits_truncate(0x07);
}

/// Máscara da base de frame numa entrada.
const ENTRY_ADDR_MASK: u32 = 0xFFFF_F000;
/// Máscara dos bits de flag aproveitados de uma entrada.
const ENTRY_FLAGS_MASK: u32 = 0x0000_0FFF;

/// Directory do kernel (distinto; nunca é destruído).
static mut KERNEL_PAGE_DIR: u32 = 0;

/// Base física do directory do kernel.
pub fn kernel_directory() -> PhysAddr {
    // SAFETY: escrito uma vez em init_kernel_directory, lido depois
    unsafe { PhysAddr::new(KERNEL_PAGE_DIR) }
}

/// Cria o directory do kernel e o identity map de [0, 16 MiB).
///
/// # Safety
///
/// Uma única chamada, durante `mm::init`, antes da paginação ligar.
pub unsafe fn init_kernel_directory() -> KResult<PhysAddr> {
    let dir = create_directory()?;
    map_kernel(dir)?;
    KERNEL_PAGE_DIR = dir.as_u32();
    Ok(dir)
}

/// Aloca um page directory zerado.
pub fn create_directory() -> KResult<PhysAddr> {
    pmm::alloc_frame_zeroed().ok_or(Status::OutOfMemory)
}

/// Destrói um directory: libera cada page table presente e depois o root.
///
/// Não aceita o directory do kernel.
pub fn destroy_directory(dir: PhysAddr) {
    debug_assert!(dir.as_u32() != kernel_directory().as_u32());
    if dir.is_null() || dir.as_u32() == kernel_directory().as_u32() {
        return;
    }

    let pd: *mut u32 = dir.as_mut_ptr();
    for i in 0..TABLE_ENTRIES {
        // SAFETY: directory identity-mapeado, owned pelo chamador
        let entry = unsafe { *pd.add(i) };
        if entry & PageFlags::PRESENT.bits() != 0 {
            pmm::free(PhysAddr::new(entry & ENTRY_ADDR_MASK), 1);
        }
    }
    pmm::free(dir, 1);
}

/// Mapeia `virt` → `phys` em `dir`, criando a page table folha se preciso.
///
/// Se a entrada nova é acessível a usuário, a entrada de directory também
/// ganha o bit user (a CPU exige permissão nos dois níveis).
pub fn map_page(dir: PhysAddr, virt: VirtAddr, phys: PhysAddr, flags: PageFlags) -> KResult<()> {
    if dir.is_null() {
        return Err(Status::InvalidParam);
    }

    let pd: *mut u32 = dir.as_mut_ptr();
    let pd_index = virt.pd_index();
    let pt_index = virt.pt_index();

    // SAFETY: tabelas identity-mapeadas; mutação serializada pelo regime
    // ring-0 não-preemptivo
    unsafe {
        let pde = *pd.add(pd_index);
        let table: *mut u32 = if pde & PageFlags::PRESENT.bits() == 0 {
            let table_frame = pmm::alloc_frame_zeroed().ok_or(Status::OutOfMemory)?;
            // Propaga as flags do pedido para a entrada de directory
            *pd.add(pd_index) =
                table_frame.as_u32() | (flags.bits() & 0x07) | PageFlags::PRESENT.bits();
            table_frame.as_mut_ptr()
        } else {
            if flags.contains(PageFlags::USER) {
                *pd.add(pd_index) = pde | PageFlags::USER.bits();
            }
            PhysAddr::new(pde & ENTRY_ADDR_MASK).as_mut_ptr()
        };

        *table.add(pt_index) = (phys.as_u32() & ENTRY_ADDR_MASK)
            | (flags.bits() & ENTRY_FLAGS_MASK)
            | PageFlags::PRESENT.bits();
    }

    Cpu::flush_tlb();
    Ok(())
}

/// Remove o mapeamento de `virt` em `dir`, se presente.
pub fn unmap_page(dir: PhysAddr, virt: VirtAddr) {
    if dir.is_null() {
        return;
    }

    let pd: *mut u32 = dir.as_mut_ptr();

    // SAFETY: ver map_page
    unsafe {
        let pde = *pd.add(virt.pd_index());
        if pde & PageFlags::PRESENT.bits() == 0 {
            return;
        }
        let table: *mut u32 = PhysAddr::new(pde & ENTRY_ADDR_MASK).as_mut_ptr();
        *table.add(virt.pt_index()) = 0;
    }

    Cpu::flush_tlb();
}

/// Consulta a entrada folha de `virt` em `dir`.
pub fn translate(dir: PhysAddr, virt: VirtAddr) -> Option<(PhysAddr, PageFlags)> {
    let pd: *const u32 = dir.as_ptr();

    // SAFETY: leitura de tabelas identity-mapeadas
    unsafe {
        let pde = *pd.add(virt.pd_index());
        if pde & PageFlags::PRESENT.bits() == 0 {
            return None;
        }
        let table: *const u32 = PhysAddr::new(pde & ENTRY_ADDR_MASK).as_ptr();
        let pte = *table.add(virt.pt_index());
        if pte & PageFlags::PRESENT.bits() == 0 {
            return None;
        }
        Some((
            PhysAddr::new(pte & ENTRY_ADDR_MASK),
            PageFlags::from_bits_truncate(pte & ENTRY_FLAGS_MASK),
        ))
    }
}

/// Identity-mapeia a faixa linear do kernel [0, 16 MiB) em `dir`,
/// supervisor/RW.
pub fn map_kernel(dir: PhysAddr) -> KResult<()> {
    let total_pages = MEMORY_SIZE / PAGE_SIZE;

    for i in 0..total_pages {
        let addr = (i * PAGE_SIZE) as u32;
        map_page(
            dir,
            VirtAddr::new(addr),
            PhysAddr::new(addr),
            PageFlags::KERNEL_RW,
        )?;
    }
    Ok(())
}
