//! Testes das filas de mensagens.
//!
//! Os envios usam `send_from` (caminho do kernel): não há processo
//! corrente durante o boot. Destinatários são processos reais criados e
//! terminados dentro de cada teste.

use crate::ipc::engine::{self, QUEUE_CAP};
use crate::ipc::message::{Envelope, MAX_DATA, MSG_DATA};
use crate::klib::test_framework::{TestCase, TestResult};
use crate::mm::pmm;
use crate::sched::lifecycle;
use crate::sys::error::Status;
use crate::sys::types::{KERNEL_PID, Pid};

pub const IPC_TESTS: &[TestCase] = &[
    TestCase::new("ipc_send_dead_pid", test_send_dead_pid),
    TestCase::new("ipc_data_size_bounds", test_data_size_bounds),
    TestCase::new("ipc_roundtrip_payload", test_roundtrip_payload),
    TestCase::new("ipc_fifo_por_remetente", test_fifo_order),
    TestCase::new("ipc_filtro_de_remetente", test_sender_filter),
    TestCase::new("ipc_overflow_head_drop", test_overflow),
    TestCase::new("ipc_clear_devolve_frames", test_clear_reclaims),
    TestCase::new("ipc_register_duplicado", test_register_duplicate),
];

fn spawn_receiver() -> Option<(usize, Pid)> {
    let slot = lifecycle::create(KERNEL_PID, false).ok()?;
    let pid = lifecycle::pid_of(slot)?;
    Some((slot, pid))
}

/// Enviar para PID morto retorna NotFound.
fn test_send_dead_pid() -> TestResult {
    let envelope = Envelope::new(MSG_DATA);
    crate::kassert_eq!(engine::send_from(KERNEL_PID, 61, &envelope), Status::NotFound);
    crate::kassert_eq!(engine::send_from(KERNEL_PID, 9999, &envelope), Status::NotFound);
    TestResult::Pass
}

/// data_size 0 e 256 são legais; 257 é rejeitado.
fn test_data_size_bounds() -> TestResult {
    let (slot, pid) = match spawn_receiver() {
        Some(pair) => pair,
        None => return TestResult::Fail,
    };

    let mut envelope = Envelope::new(MSG_DATA);

    envelope.data_size = 0;
    crate::kassert_eq!(engine::send_from(KERNEL_PID, pid, &envelope), Status::Ok);

    envelope.data_size = MAX_DATA as u32;
    crate::kassert_eq!(engine::send_from(KERNEL_PID, pid, &envelope), Status::Ok);

    envelope.data_size = MAX_DATA as u32 + 1;
    crate::kassert_eq!(
        engine::send_from(KERNEL_PID, pid, &envelope),
        Status::InvalidParam
    );

    crate::kassert_eq!(engine::queue_len(pid), 2);

    lifecycle::exit(slot, 0);
    TestResult::Pass
}

/// O receive recupera header carimbado e payload idênticos.
fn test_roundtrip_payload() -> TestResult {
    let (slot, pid) = match spawn_receiver() {
        Some(pair) => pair,
        None => return TestResult::Fail,
    };

    let sent = Envelope::with_data(MSG_DATA, b"test\0abc");
    crate::kassert_eq!(engine::send_from(7, pid, &sent), Status::Ok);

    let got = match engine::test_take(pid, 0) {
        Some(envelope) => envelope,
        None => return TestResult::Fail,
    };

    crate::kassert_eq!(got.sender_pid, 7);
    crate::kassert_eq!(got.receiver_pid, pid);
    crate::kassert_eq!(got.msg_type, MSG_DATA);
    crate::kassert_eq!(got.data_size, 8);
    crate::kassert!(got.msg_id != 0);
    crate::kassert!(got.payload() == b"test\0abc", "payload diferente");

    lifecycle::exit(slot, 0);
    TestResult::Pass
}

/// Mensagens de um mesmo remetente saem na ordem de envio.
fn test_fifo_order() -> TestResult {
    let (slot, pid) = match spawn_receiver() {
        Some(pair) => pair,
        None => return TestResult::Fail,
    };

    for seq in 1u8..=5 {
        let envelope = Envelope::with_data(MSG_DATA, &[seq]);
        crate::kassert_eq!(engine::send_from(KERNEL_PID, pid, &envelope), Status::Ok);
    }

    let mut last_id = 0;
    for seq in 1u8..=5 {
        let got = match engine::test_take(pid, 0) {
            Some(envelope) => envelope,
            None => return TestResult::Fail,
        };
        crate::kassert_eq!(got.data[0], seq);
        crate::kassert!(got.msg_id > last_id, "msg_id fora de ordem");
        last_id = got.msg_id;
    }

    lifecycle::exit(slot, 0);
    TestResult::Pass
}

/// O filtro de remetente destaca a primeira mensagem do remetente pedido.
fn test_sender_filter() -> TestResult {
    let (slot, pid) = match spawn_receiver() {
        Some(pair) => pair,
        None => return TestResult::Fail,
    };

    crate::kassert_eq!(
        engine::send_from(7, pid, &Envelope::with_data(MSG_DATA, b"de7")),
        Status::Ok
    );
    crate::kassert_eq!(
        engine::send_from(9, pid, &Envelope::with_data(MSG_DATA, b"de9")),
        Status::Ok
    );
    crate::kassert_eq!(
        engine::send_from(7, pid, &Envelope::with_data(MSG_DATA, b"de7b")),
        Status::Ok
    );

    // Filtrando o 9, a mensagem do meio sai primeiro
    let got = match engine::test_take(pid, 9) {
        Some(envelope) => envelope,
        None => return TestResult::Fail,
    };
    crate::kassert_eq!(got.sender_pid, 9);

    // Sem filtro, restam as do 7 em ordem
    let first = engine::test_take(pid, 0);
    let second = engine::test_take(pid, 0);
    match (first, second) {
        (Some(a), Some(b)) => {
            crate::kassert_eq!(a.sender_pid, 7);
            crate::kassert_eq!(b.sender_pid, 7);
            crate::kassert!(a.msg_id < b.msg_id);
        }
        _ => return TestResult::Fail,
    }

    crate::kassert!(engine::test_take(pid, 0).is_none(), "fila deveria estar vazia");

    lifecycle::exit(slot, 0);
    TestResult::Pass
}

/// A 101ª mensagem derruba a mais antiga; a fila estabiliza em 100.
fn test_overflow() -> TestResult {
    let (slot, pid) = match spawn_receiver() {
        Some(pair) => pair,
        None => return TestResult::Fail,
    };

    for seq in 1u32..=QUEUE_CAP + 1 {
        let envelope = Envelope::with_data(MSG_DATA, &seq.to_le_bytes());
        crate::kassert_eq!(engine::send_from(KERNEL_PID, pid, &envelope), Status::Ok);
    }

    crate::kassert_eq!(engine::queue_len(pid), QUEUE_CAP);

    // A primeira sobrevivente é a mensagem 2
    let got = match engine::test_take(pid, 0) {
        Some(envelope) => envelope,
        None => return TestResult::Fail,
    };
    let mut seq_bytes = [0u8; 4];
    seq_bytes.copy_from_slice(&got.data[..4]);
    crate::kassert_eq!(u32::from_le_bytes(seq_bytes), 2);

    lifecycle::exit(slot, 0);
    TestResult::Pass
}

/// clear_queue devolve mensagens e header ao PMM.
fn test_clear_reclaims() -> TestResult {
    let before = pmm::FRAME_ALLOCATOR.lock().used_frames();

    let (slot, pid) = match spawn_receiver() {
        Some(pair) => pair,
        None => return TestResult::Fail,
    };

    for _ in 0..10 {
        let envelope = Envelope::with_data(MSG_DATA, b"x");
        if engine::send_from(KERNEL_PID, pid, &envelope) != Status::Ok {
            return TestResult::Fail;
        }
    }
    crate::kassert_eq!(engine::queue_len(pid), 10);

    // O exit limpa a fila e devolve tudo
    lifecycle::exit(slot, 0);
    crate::kassert_eq!(engine::queue_len(pid), 0);

    let after = pmm::FRAME_ALLOCATOR.lock().used_frames();
    crate::kassert_eq!(after, before);
    TestResult::Pass
}

/// Registro duplicado de handler retorna AlreadyExists.
fn test_register_duplicate() -> TestResult {
    crate::kassert_eq!(engine::register_handler(31, 0x0040_1000), Status::Ok);
    crate::kassert_eq!(
        engine::register_handler(31, 0x0040_2000),
        Status::AlreadyExists
    );
    crate::kassert_eq!(engine::register_handler(32, 0x0040_1000), Status::InvalidParam);
    crate::kassert_eq!(engine::register_handler(5, 0), Status::InvalidParam);
    TestResult::Pass
}
