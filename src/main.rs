//! Anvil OS — Binário Principal.
//!
//! Responsabilidade:
//! 1. Receber o controle do bootloader (modo protegido, paginação desligada).
//! 2. Apontar ESP para a stack provisória do kernel.
//! 3. Saltar para `core::entry::kernel_main` (da biblioteca `anvil`).

#![no_std]
#![no_main]

use anvil::core as kernel_core;

// Stack provisória do kernel (16 KB). Usada até o primeiro context switch.
// Vive numa seção própria: o clear_bss do boot não pode zerá-la em uso.
#[repr(align(16))]
struct KernelStack([u8; 16 * 1024]);

#[no_mangle]
#[link_section = ".kernel_stack"]
static KERNEL_STACK: KernelStack = KernelStack([0; 16 * 1024]);

// Ponto de entrada. O bootloader salta para cá com:
// - modo protegido ativo, GDT plana provisória (0x08/0x10)
// - interrupções desabilitadas, CR3 ainda não carregado
// - imagens de serviço já copiadas para os offsets físicos fixos
core::arch::global_asm!(
    r#"
.section .text._start
.global _start
_start:
    // 1. Stack Pointer na stack dedicada
    lea esp, [{stack} + {stack_size}]

    // 2. Zerar EBP (frame pointer) e direção de string
    xor ebp, ebp
    cld

    // 3. Entrar no Rust
    call {kernel_main}

    // 4. Trap (halt loop robusto)
2:
    cli
    hlt
    jmp 2b
"#,
    stack = sym KERNEL_STACK,
    stack_size = const 16 * 1024,
    kernel_main = sym kernel_core::entry::kernel_main,
);
