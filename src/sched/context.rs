//! Primitivas assembly de troca de contexto.
//!
//! `switch_stacks` é o único ponto onde a execução muda de kernel stack.
//! O chamador já atualizou TSS.esp0 e CR3 para o processo que entra.
//!
//! Frame de suspensão (o que `switch_stacks` empilha e desempilha):
//!
//! ```text
//! esp -> EDI ESI EBX EBP EFLAGS [endereço de retorno do call]
//! ```
//!
//! O primeiro dispatch usa um frame fabricado por `lifecycle::setup_entry`
//! com o mesmo formato; em processos de usuário o "retorno" cai em
//! `first_run_user`, que desempilha um trap frame completo e executa
//! `iretd` para o ring 3.

core::arch::global_asm!(
    r#"
// switch_stacks(save_into: *mut u32, load_from: *const u32)
//
// save_into == 0: o contexto de saída é abandonado (boot, exit).
.global switch_stacks
switch_stacks:
    mov eax, [esp + 4]
    mov edx, [esp + 8]

    test eax, eax
    jz 2f

    pushfd
    push ebp
    push ebx
    push esi
    push edi

    mov [eax], esp

2:
    mov esp, [edx]

    pop edi
    pop esi
    pop ebx
    pop ebp
    popfd
    ret

// Trampolim do primeiro dispatch de um processo de usuário.
// A stack contém o trap frame fabricado: segmentos, bloco pusha,
// err/vec dummy e o frame de iret para o ring 3.
.global first_run_user
first_run_user:
    pop gs
    pop fs
    pop es
    pop ds
    popad
    add esp, 8
    iretd

// Abandona a stack corrente e entra no idle loop do scheduler numa
// stack dedicada. Usado quando um processo termina e não há outro
// pronto: a stack do morto já foi devolvida ao PMM.
.global enter_idle
enter_idle:
    lea esp, [IDLE_STACK + {idle_size}]
    jmp {idle_main}
"#,
    idle_size = const IDLE_STACK_SIZE,
    idle_main = sym crate::sched::scheduler::idle_main,
);

/// Tamanho da stack de idle.
pub const IDLE_STACK_SIZE: usize = 4096;

#[repr(align(16))]
struct IdleStack([u8; IDLE_STACK_SIZE]);

/// Stack dedicada do idle loop.
#[no_mangle]
static IDLE_STACK: IdleStack = IdleStack([0; IDLE_STACK_SIZE]);

extern "C" {
    /// Salva o contexto em `*save_into` (se não-nulo) e retoma o contexto
    /// apontado por `*load_from`.
    ///
    /// Só retorna quando este contexto for retomado por outra chamada.
    pub fn switch_stacks(save_into: *mut u32, load_from: *const u32);

    /// Transição fabricada para o ring 3. Nunca retorna.
    pub fn first_run_user() -> !;

    /// Salta para o idle loop na stack dedicada. Nunca retorna.
    pub fn enter_idle() -> !;
}
