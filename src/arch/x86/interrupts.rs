//! Dispatch de traps, IRQs e do gate de syscall.
//!
//! Todos os vetores convergem para `trap_common` (assembly), que monta o
//! trap frame completo na kernel stack e chama `trap_dispatch` com um
//! ponteiro para ele. O frame é a ABI entre assembly e Rust: qualquer
//! mudança de layout exige mudar os dois lados.
//!
//! Triagem de exceções:
//! - ring 3: o processo ofensor é terminado com o vetor como exit code.
//! - ring 0: estado irrecuperável, panic com relatório formatado.
//!
//! IRQs recebem EOI aqui. No timer o EOI precede `scheduler::tick()`:
//! tick pode trocar de contexto e só voltar a este frame vários quanta
//! depois, e um EOI pendente silenciaria o PIC inteiro nesse intervalo.

use crate::arch::Cpu;
use crate::drivers::pic;
use crate::sched::scheduler;

/// Trap frame comum, como empilhado em `trap_common`.
///
/// Ordem dos campos = ordem inversa dos pushes (endereços crescentes).
/// `user_esp`/`user_ss` só existem quando a CPU veio do ring 3.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct TrapFrame {
    // Seletores de segmento (pushes manuais)
    pub gs: u32,
    pub fs: u32,
    pub es: u32,
    pub ds: u32,
    // Registradores inteiros (pusha)
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    pub esp_dummy: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    // Identificação do trap (pushes do stub)
    pub vector: u32,
    pub error_code: u32,
    // Frame de iret (push do hardware)
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
    pub user_esp: u32,
    pub user_ss: u32,
}

impl TrapFrame {
    /// A CPU estava em ring 3 quando o trap disparou?
    #[inline]
    pub fn from_user(&self) -> bool {
        (self.cs & 0x3) == 3
    }
}

// ============================================================================
// STUBS DE ENTRADA
// ============================================================================
//
// Exceções sem error code empilham um dummy 0 para manter o frame uniforme;
// nas exceções 8, 10-14 e 17 a própria CPU já empilhou o error code.
// Em seguida todos empilham o número do vetor e saltam para trap_common.

macro_rules! isr_decls {
    ($($name:ident),+ $(,)?) => {
        extern "C" {
            $(fn $name();)+
        }
    };
}

isr_decls!(
    isr0, isr1, isr2, isr3, isr4, isr5, isr6, isr7, isr8, isr9, isr10, isr11, isr12, isr13,
    isr14, isr15, isr16, isr17, isr18, isr19, isr20, isr21, isr22, isr23, isr24, isr25, isr26,
    isr27, isr28, isr29, isr30, isr31, irq0, irq1, irq2, irq3, irq4, irq5, irq6, irq7, irq8,
    irq9, irq10, irq11, irq12, irq13, irq14, irq15, syscall_gate,
);

core::arch::global_asm!(
    r#"
// Exceções sem error code da CPU
.macro ISR_NOERR name, vec
.global \name
\name:
    push 0
    push \vec
    jmp trap_common
.endm

// Exceções com error code da CPU (já empilhado)
.macro ISR_ERR name, vec
.global \name
\name:
    push \vec
    jmp trap_common
.endm

ISR_NOERR isr0, 0
ISR_NOERR isr1, 1
ISR_NOERR isr2, 2
ISR_NOERR isr3, 3
ISR_NOERR isr4, 4
ISR_NOERR isr5, 5
ISR_NOERR isr6, 6
ISR_NOERR isr7, 7
ISR_ERR   isr8, 8
ISR_NOERR isr9, 9
ISR_ERR   isr10, 10
ISR_ERR   isr11, 11
ISR_ERR   isr12, 12
ISR_ERR   isr13, 13
ISR_ERR   isr14, 14
ISR_NOERR isr15, 15
ISR_NOERR isr16, 16
ISR_ERR   isr17, 17
ISR_NOERR isr18, 18
ISR_NOERR isr19, 19
ISR_NOERR isr20, 20
ISR_NOERR isr21, 21
ISR_NOERR isr22, 22
ISR_NOERR isr23, 23
ISR_NOERR isr24, 24
ISR_NOERR isr25, 25
ISR_NOERR isr26, 26
ISR_NOERR isr27, 27
ISR_NOERR isr28, 28
ISR_NOERR isr29, 29
ISR_NOERR isr30, 30
ISR_NOERR isr31, 31

ISR_NOERR irq0, 32
ISR_NOERR irq1, 33
ISR_NOERR irq2, 34
ISR_NOERR irq3, 35
ISR_NOERR irq4, 36
ISR_NOERR irq5, 37
ISR_NOERR irq6, 38
ISR_NOERR irq7, 39
ISR_NOERR irq8, 40
ISR_NOERR irq9, 41
ISR_NOERR irq10, 42
ISR_NOERR irq11, 43
ISR_NOERR irq12, 44
ISR_NOERR irq13, 45
ISR_NOERR irq14, 46
ISR_NOERR irq15, 47

ISR_NOERR syscall_gate, 0x80

// Caminho comum: salva registradores e segmentos, entra no kernel com
// seletores de dados do ring 0, chama o dispatcher Rust com o frame.
.global trap_common
trap_common:
    pushad
    push ds
    push es
    push fs
    push gs

    mov ax, 0x10
    mov ds, ax
    mov es, ax
    mov fs, ax
    mov gs, ax

    push esp
    call trap_dispatch
    add esp, 4

    pop gs
    pop fs
    pop es
    pop ds
    popad
    add esp, 8      // descarta vetor + error code
    iretd
"#
);

// ============================================================================
// INSTALAÇÃO
// ============================================================================

/// Instala todos os gates e carrega a IDT.
///
/// Interrupções continuam desabilitadas ao retornar; quem habilita é a
/// sequência de boot, depois que o resto do kernel está de pé.
///
/// # Safety
///
/// Chamar uma única vez, após a GDT definitiva e o remap do PIC.
pub unsafe fn init() {
    use super::idt::{self, GATE_KERNEL, GATE_USER};

    let exceptions: [unsafe extern "C" fn(); 32] = [
        isr0, isr1, isr2, isr3, isr4, isr5, isr6, isr7, isr8, isr9, isr10, isr11, isr12, isr13,
        isr14, isr15, isr16, isr17, isr18, isr19, isr20, isr21, isr22, isr23, isr24, isr25, isr26,
        isr27, isr28, isr29, isr30, isr31,
    ];
    for (vec, handler) in exceptions.iter().enumerate() {
        idt::set_gate(vec, *handler as u32, GATE_KERNEL);
    }

    let irqs: [unsafe extern "C" fn(); 16] = [
        irq0, irq1, irq2, irq3, irq4, irq5, irq6, irq7, irq8, irq9, irq10, irq11, irq12, irq13,
        irq14, irq15,
    ];
    for (i, handler) in irqs.iter().enumerate() {
        idt::set_gate(32 + i, *handler as u32, GATE_KERNEL);
    }

    // Gate de syscall: DPL 3 para que o ring 3 possa invocar int 0x80
    idt::set_gate(0x80, syscall_gate as u32, GATE_USER);

    idt::load();

    crate::kinfo!("(IDT) 256 gates instalados, syscall em 0x80 (DPL 3)");
}

// ============================================================================
// DISPATCH
// ============================================================================

/// Dispatcher central, chamado de `trap_common`.
#[no_mangle]
extern "C" fn trap_dispatch(frame: &mut TrapFrame) {
    match frame.vector {
        0..=31 => handle_exception(frame),
        32..=47 => handle_irq(frame),
        0x80 => crate::syscall::dispatch(frame),
        other => {
            crate::kwarn!("(Trap) Vetor inesperado {:#x}", other);
        }
    }
}

/// Triagem de exceções da CPU.
fn handle_exception(frame: &mut TrapFrame) {
    let fault_addr = if frame.vector == 14 {
        Some(Cpu::read_cr2())
    } else {
        None
    };

    if frame.from_user() {
        if let Some(pid) = scheduler::current_pid() {
            match fault_addr {
                Some(addr) => crate::kwarn!(
                    "(Trap) Page fault em ring 3: PID={} addr={:#010x} err={:#x} eip={:#010x}",
                    pid,
                    addr,
                    frame.error_code,
                    frame.eip
                ),
                None => crate::kwarn!(
                    "(Trap) Exceção {} em ring 3: PID={} err={:#x} eip={:#010x}",
                    frame.vector,
                    pid,
                    frame.error_code,
                    frame.eip
                ),
            }

            // Termina o ofensor; o scheduler escolhe outro processo.
            // Não retorna para este frame.
            crate::sched::lifecycle::exit_current(frame.vector);
        }
    }

    // Exceção em ring 0 (ou sem processo corrente): irrecuperável.
    panic_with_frame(frame, fault_addr);
}

/// Relatório de pânico com snapshot de registradores.
fn panic_with_frame(frame: &TrapFrame, fault_addr: Option<u32>) -> ! {
    Cpu::disable_interrupts();

    crate::kerror!("(Trap) EXCECAO FATAL NO KERNEL");
    crate::kerror!(
        "  vetor={} err={:#x} eip={:#010x} cs={:#x} eflags={:#010x}",
        frame.vector,
        frame.error_code,
        frame.eip,
        frame.cs,
        frame.eflags
    );
    if let Some(addr) = fault_addr {
        crate::kerror!("  cr2={:#010x}", addr);
    }
    crate::kerror!(
        "  eax={:#010x} ebx={:#010x} ecx={:#010x} edx={:#010x}",
        frame.eax,
        frame.ebx,
        frame.ecx,
        frame.edx
    );
    crate::kerror!(
        "  esi={:#010x} edi={:#010x} ebp={:#010x}",
        frame.esi,
        frame.edi,
        frame.ebp
    );
    if let Some(pid) = scheduler::current_pid() {
        crate::kerror!("  pid={}", pid);
    }

    panic!("unhandled CPU exception in ring 0");
}

/// Roteamento de IRQs do PIC (vetores 32..47).
fn handle_irq(frame: &mut TrapFrame) {
    let irq = (frame.vector - 32) as u8;

    match irq {
        0 => {
            // EOI antes do tick: tick() pode trocar de contexto e este
            // frame só é retomado muito depois.
            pic::send_eoi(0);
            crate::drivers::pit::on_tick();

            // Varredura periódica de capabilities expiradas (~10 s)
            if crate::drivers::pit::ticks() % 1024 == 0 {
                crate::security::capability::cleanup_expired();
            }

            scheduler::tick();
        }
        1 => {
            crate::drivers::keyboard::handle_irq();
            pic::send_eoi(1);
        }
        n => {
            crate::kdebug!("(Trap) IRQ {} sem handler, ignorada", n);
            pic::send_eoi(n);
        }
    }
}
