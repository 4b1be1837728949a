//! Spinlock - bloqueio com busy-wait e seção crítica IRQ-safe.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

use crate::arch::Cpu;

/// Spinlock - usa busy-wait, NÃO pode dormir.
///
/// # Quando usar
///
/// - Seções críticas muito curtas
/// - Estado tocado por handlers de interrupção
///
/// # Quando NÃO usar
///
/// - Seções que atravessam um context switch (o guard não pode estar vivo
///   quando `switch_stacks` roda)
pub struct Spinlock<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

// SAFETY: o acesso ao dado é serializado pelo flag atômico
unsafe impl<T: Send> Send for Spinlock<T> {}
unsafe impl<T: Send> Sync for Spinlock<T> {}

impl<T> Spinlock<T> {
    /// Cria novo spinlock.
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    /// Adquire o lock, desabilitando interrupções.
    pub fn lock(&self) -> SpinlockGuard<'_, T> {
        let interrupts_enabled = Cpu::interrupts_enabled();
        Cpu::disable_interrupts();

        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            core::hint::spin_loop();
        }

        SpinlockGuard {
            lock: self,
            interrupts_were_enabled: interrupts_enabled,
        }
    }

    /// Tenta adquirir sem bloquear.
    pub fn try_lock(&self) -> Option<SpinlockGuard<'_, T>> {
        let interrupts_enabled = Cpu::interrupts_enabled();
        Cpu::disable_interrupts();

        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(SpinlockGuard {
                lock: self,
                interrupts_were_enabled: interrupts_enabled,
            })
        } else {
            // Não conseguiu, restaurar interrupções
            if interrupts_enabled {
                Cpu::enable_interrupts();
            }
            None
        }
    }
}

/// Guard do spinlock - libera ao sair do escopo.
pub struct SpinlockGuard<'a, T> {
    lock: &'a Spinlock<T>,
    interrupts_were_enabled: bool,
}

impl<T> Deref for SpinlockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: Lock está adquirido
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinlockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: Lock está adquirido
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinlockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);

        // Restaurar interrupções se estavam habilitadas
        if self.interrupts_were_enabled {
            Cpu::enable_interrupts();
        }
    }
}
