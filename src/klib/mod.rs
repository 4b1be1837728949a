//! Utilitários internos do kernel.

pub mod align;
pub mod bitflags;
pub mod bitmap;
pub mod test_framework;

pub use bitmap::Bitmap;
