//! Testes da paginação (page directories de processo).

use crate::klib::test_framework::{TestCase, TestResult};
use crate::mm::paging::{self, PageFlags};
use crate::mm::{pmm, VirtAddr};

pub const PAGING_TESTS: &[TestCase] = &[
    TestCase::new("paging_map_unmap_roundtrip", test_map_unmap),
    TestCase::new("paging_user_flag_propagation", test_user_flag),
    TestCase::new("paging_kernel_identity_map", test_kernel_map),
    TestCase::new("paging_destroy_reclaims", test_destroy_reclaims),
];

/// Endereço virtual de teste fora da faixa do kernel.
const TEST_VIRT: u32 = 0x0108_0000;

/// map_page seguido de unmap_page deixa a entrada folha ausente.
fn test_map_unmap() -> TestResult {
    let dir = match paging::create_directory() {
        Ok(dir) => dir,
        Err(_) => return TestResult::Fail,
    };
    let frame = match pmm::alloc_frame() {
        Some(frame) => frame,
        None => return TestResult::Fail,
    };

    let virt = VirtAddr::new(TEST_VIRT);
    crate::kassert!(paging::map_page(dir, virt, frame, PageFlags::KERNEL_RW).is_ok());

    match paging::translate(dir, virt) {
        Some((phys, flags)) => {
            crate::kassert_eq!(phys.as_u32(), frame.as_u32());
            crate::kassert!(flags.contains(PageFlags::PRESENT));
            crate::kassert!(flags.contains(PageFlags::WRITABLE));
            crate::kassert!(!flags.contains(PageFlags::USER));
        }
        None => return TestResult::Fail,
    }

    paging::unmap_page(dir, virt);
    crate::kassert!(paging::translate(dir, virt).is_none());

    pmm::free(frame, 1);
    paging::destroy_directory(dir);
    TestResult::Pass
}

/// Mapear página de usuário propaga o bit user para a entrada de directory.
fn test_user_flag() -> TestResult {
    let dir = match paging::create_directory() {
        Ok(dir) => dir,
        Err(_) => return TestResult::Fail,
    };
    let frame = match pmm::alloc_frame() {
        Some(frame) => frame,
        None => return TestResult::Fail,
    };

    let virt = VirtAddr::new(TEST_VIRT);
    crate::kassert!(paging::map_page(dir, virt, frame, PageFlags::USER_RW).is_ok());

    // Folha com bit user
    match paging::translate(dir, virt) {
        Some((_, flags)) => crate::kassert!(flags.contains(PageFlags::USER)),
        None => return TestResult::Fail,
    }

    // Entrada de directory também
    let pde = unsafe { *dir.as_ptr::<u32>().add(virt.pd_index()) };
    crate::kassert!(pde & PageFlags::USER.bits() != 0, "PDE sem bit user");

    pmm::free(frame, 1);
    paging::destroy_directory(dir);
    TestResult::Pass
}

/// Um directory novo com map_kernel cobre a faixa [0, 16 MiB) supervisor.
fn test_kernel_map() -> TestResult {
    let dir = match paging::create_directory() {
        Ok(dir) => dir,
        Err(_) => return TestResult::Fail,
    };
    if paging::map_kernel(dir).is_err() {
        paging::destroy_directory(dir);
        return TestResult::Fail;
    }

    for &addr in &[0x1000u32, 0x000B_8000, 0x0010_0000, 0x00FF_F000] {
        match paging::translate(dir, VirtAddr::new(addr)) {
            Some((phys, flags)) => {
                crate::kassert_eq!(phys.as_u32(), addr & 0xFFFF_F000);
                crate::kassert!(!flags.contains(PageFlags::USER), "kernel map com bit user");
            }
            None => return TestResult::Fail,
        }
    }

    paging::destroy_directory(dir);
    TestResult::Pass
}

/// destroy_directory devolve todos os frames das tabelas.
fn test_destroy_reclaims() -> TestResult {
    let before = pmm::FRAME_ALLOCATOR.lock().used_frames();

    let dir = match paging::create_directory() {
        Ok(dir) => dir,
        Err(_) => return TestResult::Fail,
    };
    if paging::map_kernel(dir).is_err() {
        return TestResult::Fail;
    }

    paging::destroy_directory(dir);

    let after = pmm::FRAME_ALLOCATOR.lock().used_frames();
    crate::kassert_eq!(after, before);
    TestResult::Pass
}
