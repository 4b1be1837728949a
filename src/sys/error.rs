//! Códigos de Status do Sistema.
//!
//! Retornados no acumulador (EAX) por todas as syscalls e propagados
//! internamente via `Result<T, Status>`.

/// Status de uma operação do kernel.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok = 0,
    GenericError = -1,
    /// Argumento malformado, tamanho inválido, null onde não pode
    InvalidParam = -2,
    /// Exaustão de frames ou envelopes
    OutOfMemory = -3,
    /// Capability ausente, adulterada ou expirada
    PermissionDenied = -4,
    /// PID desconhecido, mensagem ou capability inexistente
    NotFound = -5,
    /// Reservado; este core não o produz
    Timeout = -6,
    /// Registro duplicado
    AlreadyExists = -7,
    /// Syscall sem handler registrado
    NotImplemented = -8,
}

impl Status {
    /// Representação para o acumulador de retorno de syscall.
    #[inline]
    pub const fn as_reg(self) -> u32 {
        self as i32 as u32
    }

    #[inline]
    pub const fn is_ok(self) -> bool {
        matches!(self, Status::Ok)
    }
}

impl From<Status> for u32 {
    fn from(s: Status) -> u32 {
        s.as_reg()
    }
}

/// Resultado padrão das operações internas do kernel.
pub type KResult<T> = core::result::Result<T, Status>;
