//! Direitos de capability.

use bitflags::bitflags;

bitflags! {
    /// Bits de permissão de uma capability.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CapRights: u32 {
        const READ = 0x01;
        const WRITE = 0x02;
        const EXECUTE = 0x04;
        const CREATE = 0x08;
        const DELETE = 0x10;
        const TRANSFER = 0x20;
        const ALLOC = 0x40;
        const FREE = 0x80;
    }
}

impl CapRights {
    /// Verifica se contém todos os direitos pedidos.
    #[inline]
    pub fn has(self, required: Self) -> bool {
        self.contains(required)
    }
}
