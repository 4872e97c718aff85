#![cfg(unix)]

mod common;

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use common::ToyBackend;
use privacy_crypto::Fr;
use privacy_prover::{
    BackendConfig, CircuitArtifacts, CircuitInputs, CircuitKind, CommandBackend, ProverError,
    ProvingBackend,
};

fn script(path: &Path, body: &str) -> PathBuf {
    std::fs::write(path, format!("#!/bin/sh\nset -e\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).unwrap();
    path.to_path_buf()
}

fn inputs() -> CircuitInputs {
    CircuitInputs::new(CircuitKind::Ownership)
        .private("signatureR", Fr::from(11u64))
        .private("signatureS", Fr::from(12u64))
        .private("signatureV", Fr::from(27u64))
        .public("commitmentHash", Fr::from(1u64))
        .public("intentHash", Fr::from(2u64))
        .public("nonce", Fr::from(3u64))
}

#[tokio::test]
async fn runs_witness_generator_then_prover() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let expected = ToyBackend::new().prove_signals(
        CircuitKind::Ownership,
        &[Fr::from(1u64), Fr::from(2u64), Fr::from(3u64)],
    );
    std::fs::write(
        root.join("fixture_proof.json"),
        serde_json::to_vec(&expected.proof).unwrap(),
    )
    .unwrap();
    std::fs::write(
        root.join("fixture_public.json"),
        serde_json::to_vec(&expected.public_signals).unwrap(),
    )
    .unwrap();

    let seen_input = root.join("seen_input.json");
    let witness_generator = script(
        &root.join("ownership"),
        &format!("cp \"$1\" \"{}\"\necho wtns > \"$2\"", seen_input.display()),
    );
    let prover = script(
        &root.join("rapidsnark"),
        &format!(
            "test -f \"$1\"\ntest -f \"$2\"\ncp \"{}\" \"$3\"\ncp \"{}\" \"$4\"",
            root.join("fixture_proof.json").display(),
            root.join("fixture_public.json").display()
        ),
    );
    let mut artifacts = CircuitArtifacts::in_dir(root, "ownership", "test");
    artifacts.witness_generator = witness_generator;
    std::fs::write(&artifacts.proving_key, b"zkey").unwrap();

    let backend = CommandBackend::new(BackendConfig {
        prover_executable: prover,
        work_dir: Some(root.to_path_buf()),
    });
    let raw = backend.prove(&artifacts, &inputs()).await.unwrap();
    assert_eq!(raw, expected);

    let written: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&seen_input).unwrap()).unwrap();
    assert_eq!(written["signatureV"], "27");
    assert_eq!(written["nonce"], "3");
}

#[tokio::test]
async fn failing_step_reports_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let witness_generator = script(&root.join("ownership"), "echo 'constraint 17 failed' >&2\nexit 3");
    let mut artifacts = CircuitArtifacts::in_dir(root, "ownership", "test");
    artifacts.witness_generator = witness_generator;

    let backend = CommandBackend::new(BackendConfig::default());
    match backend.prove(&artifacts, &inputs()).await {
        Err(ProverError::Backend(message)) => assert!(message.contains("constraint 17 failed")),
        other => panic!("unexpected result: {other:?}"),
    }
}
