//! Gerenciamento de Memória.
//!
//! - `pmm`: alocador de frames físicos (bitmap, 16 MiB / 4096 frames)
//! - `paging`: page directories de dois níveis por processo
//! - `addr`: newtypes de endereço físico/virtual
//!
//! Ordem de dependência: pmm → paging → resto do kernel.

pub mod addr;
pub mod config;
pub mod paging;
pub mod pmm;

#[cfg(feature = "self_tests")]
pub mod test;

pub use addr::{PhysAddr, VirtAddr};

use crate::arch::Cpu;

/// Inicializa a memória: bitmap de frames, directory do kernel e paginação.
///
/// # Safety
///
/// Chamar uma única vez no boot, antes de qualquer alocação, com
/// interrupções desabilitadas.
pub unsafe fn init() {
    pmm::init();

    let kernel_dir = paging::init_kernel_directory().expect("sem frames para o directory do kernel");

    // A partir daqui todo acesso passa pela MMU; o kernel está
    // identity-mapeado, então nada muda de endereço.
    Cpu::enable_paging(kernel_dir.as_u32());

    crate::kinfo!(
        "(MM) Paginação ativa, kernel directory em {:#010x}",
        kernel_dir.as_u32()
    );
}
