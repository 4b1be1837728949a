//! Comunicação entre processos por passagem de mensagens.
//!
//! Envelopes de tamanho fixo copiados pelo kernel; uma fila FIFO por
//! destinatário com profundidade limitada; receive bloqueante com filtro
//! de remetente e wake-on-send.

pub mod engine;
pub mod message;

#[cfg(feature = "self_tests")]
pub mod test;

pub use engine::{
    broadcast, clear_queue, init, queue_len, receive, register_handler, send, send_from,
};
pub use message::Envelope;
