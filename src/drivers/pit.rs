//! Programmable Interval Timer (8254).
//!
//! Canal 0 programado em onda quadrada; cada disparo vira a IRQ 0 e um
//! tick do scheduler. O contador de ticks daqui é a base de tempo do
//! kernel (timestamps de IPC, expiração de capabilities).

use core::sync::atomic::{AtomicU32, Ordering};

use crate::arch::x86::ports::outb;

/// Frequência base do PIT (Hz).
const PIT_FREQUENCY: u32 = 1_193_182;

/// Portas do PIT.
const PIT_CHANNEL0: u16 = 0x40;
const PIT_COMMAND: u16 = 0x43;

static TICKS: AtomicU32 = AtomicU32::new(0);
static FREQUENCY_HZ: AtomicU32 = AtomicU32::new(100);

/// Inicializa o PIT para a frequência pedida (o kernel usa 100 Hz).
pub fn init(frequency_hz: u32) {
    let divisor = PIT_FREQUENCY / frequency_hz;

    // Channel 0, lobyte/hibyte, mode 3 (square wave)
    outb(PIT_COMMAND, 0x36);

    // Divisor
    outb(PIT_CHANNEL0, (divisor & 0xFF) as u8);
    outb(PIT_CHANNEL0, ((divisor >> 8) & 0xFF) as u8);

    FREQUENCY_HZ.store(frequency_hz, Ordering::Relaxed);
    TICKS.store(0, Ordering::Relaxed);

    crate::kinfo!("(PIT) Inicializado com freq={} Hz", frequency_hz);
}

/// Registra um tick. Chamado pelo handler da IRQ 0.
#[inline]
pub fn on_tick() {
    TICKS.fetch_add(1, Ordering::Relaxed);
}

/// Ticks desde o boot.
#[inline]
pub fn ticks() -> u32 {
    TICKS.load(Ordering::Relaxed)
}

/// Uptime em milissegundos.
pub fn uptime_ms() -> u32 {
    let hz = FREQUENCY_HZ.load(Ordering::Relaxed);
    ticks().wrapping_mul(1000) / hz.max(1)
}

/// Uptime em segundos.
pub fn uptime_seconds() -> u32 {
    ticks() / FREQUENCY_HZ.load(Ordering::Relaxed).max(1)
}
