//! Capability - token de acesso.

use super::rights::CapRights;
use crate::sys::types::Pid;

/// Categoria de recurso que a capability governa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CapType {
    Process = 0,
    Memory = 1,
    Driver = 2,
    Hardware = 3,
    System = 4,
    Ipc = 5,
}

/// Bytes do campo de assinatura.
pub const SIGNATURE_LEN: usize = 16;

/// Uma entrada de capability.
///
/// `signature` guarda a soma de integridade nos bytes 0..4; os bytes
/// restantes são reservados-zero e entram na verificação.
#[derive(Debug, Clone, Copy)]
pub struct Capability {
    /// Identificador único da entrada
    pub cap_id: u32,
    /// PID dono
    pub owner_pid: Pid,
    /// Categoria
    pub cap_type: CapType,
    /// Bits de permissão
    pub permissions: CapRights,
    /// Recurso específico (0 = categoria inteira)
    pub resource_id: u32,
    /// Tick de expiração (0 = nunca)
    pub expiration: u32,
    /// Soma de integridade + reservado
    pub signature: [u8; SIGNATURE_LEN],
}

impl Capability {
    pub fn new(
        cap_id: u32,
        owner_pid: Pid,
        cap_type: CapType,
        permissions: CapRights,
        resource_id: u32,
        expiration: u32,
    ) -> Self {
        let mut cap = Self {
            cap_id,
            owner_pid,
            cap_type,
            permissions,
            resource_id,
            expiration,
            signature: [0; SIGNATURE_LEN],
        };
        cap.seal();
        cap
    }

    /// Dobra XOR dos campos numéricos.
    fn integrity_sum(&self) -> u32 {
        self.cap_id
            ^ self.owner_pid
            ^ self.cap_type as u32
            ^ self.permissions.bits()
            ^ self.resource_id
            ^ self.expiration
    }

    /// Regrava a assinatura: soma nos bytes 0..4, resto zerado.
    pub fn seal(&mut self) {
        self.signature = [0; SIGNATURE_LEN];
        let sum = self.integrity_sum();
        self.signature[..4].copy_from_slice(&sum.to_le_bytes());
    }

    /// Verifica a soma e os bytes reservados.
    pub fn verify(&self) -> bool {
        let mut stored = [0u8; 4];
        stored.copy_from_slice(&self.signature[..4]);
        if u32::from_le_bytes(stored) != self.integrity_sum() {
            return false;
        }
        self.signature[4..].iter().all(|&b| b == 0)
    }

    /// Capability válida neste tick? (expiração 0 = nunca expira)
    pub fn is_live(&self, current_tick: u32) -> bool {
        self.expiration == 0 || self.expiration > current_tick
    }
}
