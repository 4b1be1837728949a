//! Testes de admissão por capability.

use crate::klib::test_framework::{TestCase, TestResult};
use crate::security::capability::{self, CapRights, CapType, Capability};
use crate::sys::error::Status;
use crate::sys::types::KERNEL_PID;

pub const CAPABILITY_TESTS: &[TestCase] = &[
    TestCase::new("cap_grant_check", test_grant_check),
    TestCase::new("cap_bits_insuficientes", test_insufficient_bits),
    TestCase::new("cap_integridade_xor", test_integrity_sum),
    TestCase::new("cap_expiracao", test_expiration),
    TestCase::new("cap_grant_nao_kernel", test_grant_non_kernel),
    TestCase::new("cap_revoke_e_destroy", test_revoke_destroy),
    TestCase::new("cap_transfer", test_transfer),
    TestCase::new("cap_limite_por_pid", test_per_pid_limit),
];

/// PID fictício alto para não colidir com processos dos outros testes.
const TEST_PID: u32 = 50;

/// grant + check com os bits certos passa.
fn test_grant_check() -> TestResult {
    crate::kassert_eq!(
        capability::grant(
            KERNEL_PID,
            TEST_PID,
            CapType::Ipc,
            CapRights::READ | CapRights::WRITE,
            0
        ),
        Status::Ok
    );

    crate::kassert_eq!(
        capability::check(TEST_PID, CapType::Ipc, CapRights::READ),
        Status::Ok
    );
    crate::kassert_eq!(
        capability::check(TEST_PID, CapType::Ipc, CapRights::READ | CapRights::WRITE),
        Status::Ok
    );

    // Categoria não concedida: negado
    crate::kassert_eq!(
        capability::check(TEST_PID, CapType::System, CapRights::EXECUTE),
        Status::PermissionDenied
    );

    capability::destroy_for_pid(TEST_PID);
    TestResult::Pass
}

/// Bits além dos concedidos são negados.
fn test_insufficient_bits() -> TestResult {
    crate::kassert_eq!(
        capability::grant(KERNEL_PID, TEST_PID, CapType::Memory, CapRights::ALLOC, 0),
        Status::Ok
    );

    crate::kassert_eq!(
        capability::check(TEST_PID, CapType::Memory, CapRights::ALLOC | CapRights::FREE),
        Status::PermissionDenied
    );

    capability::destroy_for_pid(TEST_PID);
    TestResult::Pass
}

/// A dobra XOR detecta adulteração de qualquer campo.
fn test_integrity_sum() -> TestResult {
    let cap = Capability::new(42, TEST_PID, CapType::Driver, CapRights::WRITE, 3, 0);
    crate::kassert!(cap.verify());

    // Campo adulterado sem re-selar: soma não confere
    let mut tampered = cap;
    tampered.resource_id = 4;
    crate::kassert!(!tampered.verify(), "adulteração não detectada");

    let mut tampered_owner = cap;
    tampered_owner.owner_pid = TEST_PID + 1;
    crate::kassert!(!tampered_owner.verify());

    // Bytes reservados precisam ser zero
    let mut dirty_reserved = cap;
    dirty_reserved.signature[8] = 1;
    crate::kassert!(!dirty_reserved.verify());

    // Re-selar legitima
    tampered.seal();
    crate::kassert!(tampered.verify());

    TestResult::Pass
}

/// Entrada com tick de expiração no passado é negada e varrida.
fn test_expiration() -> TestResult {
    let now = crate::drivers::pit::ticks();

    // Expiração no passado (tick 0 do boot já passou se now > 1)
    crate::kassert_eq!(
        capability::grant_expiring(
            KERNEL_PID,
            TEST_PID,
            CapType::Hardware,
            CapRights::READ,
            0,
            1
        ),
        Status::Ok
    );

    if now >= 1 {
        crate::kassert_eq!(
            capability::check(TEST_PID, CapType::Hardware, CapRights::READ),
            Status::PermissionDenied
        );

        capability::cleanup_expired();
        crate::kassert_eq!(capability::count_for_pid(TEST_PID), 0);
    } else {
        // Timer ainda não andou: só garante a limpeza manual
        capability::destroy_for_pid(TEST_PID);
    }

    TestResult::Pass
}

/// Só o kernel concede e revoga.
fn test_grant_non_kernel() -> TestResult {
    crate::kassert_eq!(
        capability::grant(5, TEST_PID, CapType::System, CapRights::EXECUTE, 0),
        Status::PermissionDenied
    );
    crate::kassert_eq!(
        capability::revoke(5, TEST_PID, CapType::System, 0),
        Status::PermissionDenied
    );
    TestResult::Pass
}

/// revoke remove por categoria; destroy_for_pid limpa tudo.
fn test_revoke_destroy() -> TestResult {
    crate::kassert_eq!(
        capability::grant(KERNEL_PID, TEST_PID, CapType::Ipc, CapRights::READ, 0),
        Status::Ok
    );
    crate::kassert_eq!(
        capability::grant(KERNEL_PID, TEST_PID, CapType::Memory, CapRights::ALLOC, 0),
        Status::Ok
    );
    crate::kassert_eq!(capability::count_for_pid(TEST_PID), 2);

    crate::kassert_eq!(
        capability::revoke(KERNEL_PID, TEST_PID, CapType::Ipc, 0),
        Status::Ok
    );
    crate::kassert_eq!(capability::count_for_pid(TEST_PID), 1);
    crate::kassert_eq!(
        capability::check(TEST_PID, CapType::Ipc, CapRights::READ),
        Status::PermissionDenied
    );

    capability::destroy_for_pid(TEST_PID);
    crate::kassert_eq!(capability::count_for_pid(TEST_PID), 0);
    TestResult::Pass
}

/// Nenhum caminho ultrapassa as 16 entradas por PID: nem grant, nem
/// grant_expiring, nem transfer para um destinatário cheio.
fn test_per_pid_limit() -> TestResult {
    use crate::security::capability::table::CAPS_PER_PROCESS;

    let full = TEST_PID;
    let donor = TEST_PID + 1;

    for i in 0..CAPS_PER_PROCESS as u32 {
        crate::kassert_eq!(
            capability::grant(KERNEL_PID, full, CapType::Ipc, CapRights::READ, i + 1),
            Status::Ok
        );
    }
    crate::kassert_eq!(capability::count_for_pid(full), CAPS_PER_PROCESS);

    // 17ª entrada negada nos dois caminhos de grant
    crate::kassert_eq!(
        capability::grant(KERNEL_PID, full, CapType::Ipc, CapRights::READ, 0),
        Status::OutOfMemory
    );
    crate::kassert_eq!(
        capability::grant_expiring(KERNEL_PID, full, CapType::Ipc, CapRights::READ, 0, 0),
        Status::OutOfMemory
    );

    // Transferência para um destinatário cheio também é barrada
    crate::kassert_eq!(
        capability::grant(
            KERNEL_PID,
            donor,
            CapType::Driver,
            CapRights::WRITE | CapRights::TRANSFER,
            0
        ),
        Status::Ok
    );
    let mut denied = false;
    for cap_id in 1..128 {
        match capability::transfer(donor, cap_id, full) {
            Status::OutOfMemory => {
                denied = true;
                break;
            }
            Status::Ok => return TestResult::Fail,
            _ => continue,
        }
    }
    crate::kassert!(denied, "transfer encheu o destinatário além do limite");
    crate::kassert_eq!(capability::count_for_pid(full), CAPS_PER_PROCESS);

    capability::destroy_for_pid(full);
    capability::destroy_for_pid(donor);
    TestResult::Pass
}

/// transfer re-parenta a entrada e regrava a soma.
fn test_transfer() -> TestResult {
    crate::kassert_eq!(
        capability::grant(
            KERNEL_PID,
            TEST_PID,
            CapType::Driver,
            CapRights::WRITE | CapRights::TRANSFER,
            0
        ),
        Status::Ok
    );

    // Sem o bit TRANSFER: negado
    crate::kassert_eq!(
        capability::grant(KERNEL_PID, TEST_PID, CapType::Memory, CapRights::ALLOC, 0),
        Status::Ok
    );

    // Quem não é dono não transfere (cap_id 1 não pertence ao 51)
    // Transferência legítima: dono com TRANSFER
    let new_owner = TEST_PID + 1;

    // Localiza o cap_id transferível via check de sucesso + tentativa
    let mut moved = false;
    for cap_id in 1..64 {
        if capability::transfer(TEST_PID, cap_id, new_owner) == Status::Ok {
            moved = true;
            break;
        }
    }
    crate::kassert!(moved, "nenhuma entrada transferível");

    // O novo dono passa na admissão (soma regravada confere)
    crate::kassert_eq!(
        capability::check(new_owner, CapType::Driver, CapRights::WRITE),
        Status::Ok
    );
    crate::kassert_eq!(
        capability::check(TEST_PID, CapType::Driver, CapRights::WRITE),
        Status::PermissionDenied
    );

    capability::destroy_for_pid(TEST_PID);
    capability::destroy_for_pid(new_owner);
    TestResult::Pass
}
