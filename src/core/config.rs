//! Layout fixo das imagens de serviço.
//!
//! O bootloader lê os binários do disco e os deposita em offsets físicos
//! fixos antes do kernel assumir. Cada serviço é mapeado no seu espaço de
//! endereçamento na mesma base virtual.

/// Base física onde o bootloader deposita as imagens.
pub const SERVICE_IMAGE_BASE: u32 = 0x40_0000;

/// Tamanho máximo de uma imagem de serviço (32 KiB).
pub const SERVICE_IMAGE_SIZE: u32 = 0x8000;

/// Base virtual de execução dos serviços (entry no offset 0).
pub const SERVICE_VIRT_BASE: u32 = 0x40_0000;

/// Janela virtual temporária do kernel para copiar páginas de imagem.
pub const SERVICE_COPY_WINDOW: u32 = 0xE0_0000;

/// Serviços lançados no boot, na ordem dos PIDs 1..=5.
pub const SERVICE_NAMES: [&str; 5] = ["init", "keyboard", "console", "timer", "shell"];

/// PID do driver de teclado (destino dos scancodes da IRQ 1).
pub const KEYBOARD_DRIVER_PID: u32 = 2;
