//! Constantes de configuração de memória.

/// Tamanho de página/frame (4 KiB).
pub const PAGE_SIZE: usize = 4096;

/// Memória física gerenciada (16 MiB).
pub const MEMORY_SIZE: usize = 16 * 1024 * 1024;

/// Total de frames físicos.
pub const PHYS_FRAMES: usize = MEMORY_SIZE / PAGE_SIZE;

/// Palavras de 32 bits no bitmap de frames.
pub const BITMAP_WORDS: usize = PHYS_FRAMES / 32;

/// Primeiro MiB: BIOS, EBDA, memória de vídeo. Nunca alocável.
pub const LOW_RESERVED_END: u32 = 1024 * 1024;

/// Fim da região reservada para a imagem do kernel (carregada em 1 MiB).
pub const KERNEL_IMAGE_END: u32 = 2 * 1024 * 1024;

/// Entradas por page directory / page table.
pub const TABLE_ENTRIES: usize = 1024;
