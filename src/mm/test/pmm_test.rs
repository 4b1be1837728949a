//! Testes do PMM (alocador de frames físicos).

use crate::klib::test_framework::{TestCase, TestResult};
use crate::mm::config::{PAGE_SIZE, PHYS_FRAMES};
use crate::mm::pmm;

pub const PMM_TESTS: &[TestCase] = &[
    TestCase::new("pmm_alloc_dealloc", test_alloc_dealloc),
    TestCase::new("pmm_frame_alignment", test_frame_alignment),
    TestCase::new("pmm_contiguous", test_contiguous),
    TestCase::new("pmm_double_free_idempotente", test_double_free),
    TestCase::new("pmm_oom_sentinela", test_oom_sentinel),
];

/// Alocar e desalocar devolve o bitmap ao estado anterior.
fn test_alloc_dealloc() -> TestResult {
    let before = pmm::FRAME_ALLOCATOR.lock().used_frames();

    let mut frames = [crate::mm::PhysAddr::zero(); 10];
    for slot in frames.iter_mut() {
        match pmm::alloc_frame() {
            Some(frame) => *slot = frame,
            None => return TestResult::Fail,
        }
    }

    // Endereços todos distintos
    for i in 0..frames.len() {
        for j in i + 1..frames.len() {
            crate::kassert!(frames[i] != frames[j], "frames duplicados");
        }
    }

    for &frame in frames.iter() {
        pmm::free(frame, 1);
    }

    kassert_used_restored(before)
}

/// Frames saem alinhados a página.
fn test_frame_alignment() -> TestResult {
    for _ in 0..5 {
        match pmm::alloc_frame() {
            Some(frame) => {
                crate::kassert!(frame.is_page_aligned(), "frame desalinhado");
                pmm::free(frame, 1);
            }
            None => return TestResult::Fail,
        }
    }
    TestResult::Pass
}

/// alloc_contiguous devolve frames adjacentes.
fn test_contiguous() -> TestResult {
    let before = pmm::FRAME_ALLOCATOR.lock().used_frames();

    let base = match pmm::alloc_contiguous(4) {
        Some(base) => base,
        None => return TestResult::Fail,
    };
    crate::kassert!(base.is_page_aligned());

    // Os 4 frames estão em uso: outro alloc não pode cair dentro da faixa
    let probe = match pmm::alloc_frame() {
        Some(frame) => frame,
        None => return TestResult::Fail,
    };
    let inside = probe.as_u32() >= base.as_u32()
        && probe.as_u32() < base.as_u32() + (4 * PAGE_SIZE) as u32;
    crate::kassert!(!inside, "alloc caiu dentro da faixa contígua");

    pmm::free(probe, 1);
    pmm::free(base, 4);
    kassert_used_restored(before)
}

/// Liberar duas vezes não corrompe a contagem.
fn test_double_free() -> TestResult {
    let frame = match pmm::alloc_frame() {
        Some(frame) => frame,
        None => return TestResult::Fail,
    };
    let before = pmm::FRAME_ALLOCATOR.lock().used_frames();

    pmm::free(frame, 1);
    let after_first = pmm::FRAME_ALLOCATOR.lock().used_frames();
    crate::kassert_eq!(after_first, before - 1);

    // Segunda liberação é coalescida em silêncio
    pmm::free(frame, 1);
    let after_second = pmm::FRAME_ALLOCATOR.lock().used_frames();
    crate::kassert_eq!(after_second, before - 1);

    TestResult::Pass
}

/// Pedir mais frames contíguos do que o pool tem retorna a sentinela.
fn test_oom_sentinel() -> TestResult {
    crate::kassert!(pmm::alloc_contiguous(PHYS_FRAMES + 1).is_none());
    crate::kassert!(pmm::alloc_contiguous(PHYS_FRAMES).is_none());
    TestResult::Pass
}

fn kassert_used_restored(before: usize) -> TestResult {
    let after = pmm::FRAME_ALLOCATOR.lock().used_frames();
    crate::kassert_eq!(after, before);
    TestResult::Pass
}
