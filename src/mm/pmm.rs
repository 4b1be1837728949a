//! PMM — Alocador de frames físicos por bitmap.
//!
//! Um bit por frame de 4 KiB sobre os 16 MiB gerenciados. Bit 1 = em uso.
//! A inicialização reserva o primeiro MiB (BIOS/VGA) e a região da imagem
//! do kernel antes de qualquer alocação de usuário.
//!
//! Falha de alocação retorna `None`; o chamador propaga. Nunca panica.

use core::sync::atomic::{AtomicUsize, Ordering};

use super::addr::PhysAddr;
use super::config::{
    BITMAP_WORDS, KERNEL_IMAGE_END, LOW_RESERVED_END, PAGE_SIZE, PHYS_FRAMES,
};
use crate::klib::Bitmap;
use crate::sync::Spinlock;

/// Estatísticas do PMM.
pub struct PmmStats {
    pub used_frames: AtomicUsize,
    pub alloc_count: AtomicUsize,
    pub free_count: AtomicUsize,
}

impl PmmStats {
    const fn new() -> Self {
        Self {
            used_frames: AtomicUsize::new(0),
            alloc_count: AtomicUsize::new(0),
            free_count: AtomicUsize::new(0),
        }
    }
}

/// BitmapFrameAllocator - gerencia memória física usando um bitmap.
pub struct BitmapFrameAllocator {
    bitmap: [u32; BITMAP_WORDS],
    next_free: usize,
    stats: PmmStats,
}

impl BitmapFrameAllocator {
    pub const fn empty() -> Self {
        Self {
            bitmap: [0; BITMAP_WORDS],
            next_free: 0,
            stats: PmmStats::new(),
        }
    }

    /// Visão de bitmap sobre o armazenamento fixo.
    fn view(&mut self) -> Bitmap<'_> {
        Bitmap::new(&mut self.bitmap, PHYS_FRAMES)
    }

    /// Marca as regiões fixas como ocupadas.
    fn reserve_boot_regions(&mut self) {
        let mut bitmap = self.view();
        // BIOS / EBDA / VGA e imagem do kernel (carregada em 1 MiB)
        for frame in 0..(KERNEL_IMAGE_END as usize / PAGE_SIZE) {
            bitmap.set(frame, true);
        }
        debug_assert!(LOW_RESERVED_END <= KERNEL_IMAGE_END);
    }

    /// Aloca um frame físico qualquer.
    pub fn allocate_frame(&mut self) -> Option<PhysAddr> {
        let start = self.next_free / 32;

        for i in 0..BITMAP_WORDS {
            let word_idx = (start + i) % BITMAP_WORDS;
            let word = self.bitmap[word_idx];
            if word != u32::MAX {
                let bit = word.trailing_ones() as usize;
                let frame_idx = word_idx * 32 + bit;
                if frame_idx < PHYS_FRAMES {
                    self.bitmap[word_idx] |= 1 << bit;
                    self.next_free = frame_idx;
                    self.stats.used_frames.fetch_add(1, Ordering::Relaxed);
                    self.stats.alloc_count.fetch_add(1, Ordering::Relaxed);
                    return Some(PhysAddr::new((frame_idx * PAGE_SIZE) as u32));
                }
            }
        }
        None
    }

    /// Aloca `count` frames físicos adjacentes (first-fit).
    pub fn allocate_contiguous(&mut self, count: usize) -> Option<PhysAddr> {
        if count == 0 || count > PHYS_FRAMES {
            return None;
        }

        let run_start = self.view().find_first_run(false, count)?;
        let mut bitmap = self.view();
        for frame in run_start..run_start + count {
            bitmap.set(frame, true);
        }

        self.stats.used_frames.fetch_add(count, Ordering::Relaxed);
        self.stats.alloc_count.fetch_add(1, Ordering::Relaxed);
        Some(PhysAddr::new((run_start * PAGE_SIZE) as u32))
    }

    /// Libera `count` frames a partir de `base`.
    ///
    /// Limpar um bit já limpo é idempotente; double-free é silenciosamente
    /// coalescido.
    pub fn free(&mut self, base: PhysAddr, count: usize) {
        let first = base.frame_index();
        let mut freed = 0usize;
        {
            let mut bitmap = self.view();
            for frame_idx in first..first + count {
                if frame_idx >= PHYS_FRAMES {
                    break;
                }
                if bitmap.get(frame_idx) {
                    bitmap.set(frame_idx, false);
                    freed += 1;
                }
            }
        }
        self.stats.used_frames.fetch_sub(freed, Ordering::Relaxed);
        self.stats.free_count.fetch_add(1, Ordering::Relaxed);
        if first < self.next_free {
            self.next_free = first;
        }
    }

    /// Frames atualmente marcados como em uso.
    pub fn used_frames(&self) -> usize {
        self.stats.used_frames.load(Ordering::Relaxed)
    }

    /// Frames livres.
    pub fn free_frames(&self) -> usize {
        PHYS_FRAMES - self.used_frames()
    }
}

/// Singleton do alocador de frames.
pub static FRAME_ALLOCATOR: Spinlock<BitmapFrameAllocator> =
    Spinlock::new(BitmapFrameAllocator::empty());

/// Inicializa o PMM reservando as regiões de boot.
pub fn init() {
    let mut pmm = FRAME_ALLOCATOR.lock();
    pmm.reserve_boot_regions();
    pmm.stats
        .used_frames
        .store(reserved_frame_count(), Ordering::Relaxed);
    drop(pmm);

    crate::kinfo!(
        "(PMM) {} frames gerenciados, {} reservados (boot)",
        PHYS_FRAMES,
        reserved_frame_count()
    );
}

const fn reserved_frame_count() -> usize {
    KERNEL_IMAGE_END as usize / PAGE_SIZE
}

/// Aloca um frame qualquer.
pub fn alloc_frame() -> Option<PhysAddr> {
    FRAME_ALLOCATOR.lock().allocate_frame()
}

/// Aloca um frame e o preenche com zeros.
pub fn alloc_frame_zeroed() -> Option<PhysAddr> {
    let frame = alloc_frame()?;
    zero_frame(frame);
    Some(frame)
}

/// Aloca `count` frames adjacentes.
pub fn alloc_contiguous(count: usize) -> Option<PhysAddr> {
    FRAME_ALLOCATOR.lock().allocate_contiguous(count)
}

/// Libera `count` frames a partir de `base`.
pub fn free(base: PhysAddr, count: usize) {
    FRAME_ALLOCATOR.lock().free(base, count);
}

/// Zera o conteúdo de um frame (via identity map do kernel).
pub fn zero_frame(frame: PhysAddr) {
    let ptr: *mut u8 = frame.as_mut_ptr();
    // SAFETY: o frame acabou de ser alocado e está identity-mapeado
    unsafe {
        core::ptr::write_bytes(ptr, 0, PAGE_SIZE);
    }
}
