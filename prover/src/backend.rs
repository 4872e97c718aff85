//! Proof generation backends.
//!
//! Provers assemble [`CircuitInputs`] and hand them to a [`ProvingBackend`].
//! The default [`CommandBackend`] shells out to the circuit's compiled
//! witness generator and to a rapidsnark-compatible Groth16 prover, and reads
//! back the snarkjs JSON they write.

use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::circuit::CircuitInputs;
use crate::config::{BackendConfig, CircuitArtifacts};
use crate::error::ProverError;
use crate::groth16::SnarkProof;

/// Backend output before it is turned into a [`crate::groth16::ProofBundle`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawProof {
    pub proof: SnarkProof,
    /// Decimal strings, in circuit order.
    pub public_signals: Vec<String>,
}

#[async_trait]
pub trait ProvingBackend: Send + Sync {
    async fn prove(
        &self,
        artifacts: &CircuitArtifacts,
        inputs: &CircuitInputs,
    ) -> Result<RawProof, ProverError>;
}

#[derive(Clone, Debug)]
pub struct CommandBackend {
    config: BackendConfig,
}

impl CommandBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }

    fn scratch_dir(&self) -> Result<tempfile::TempDir, ProverError> {
        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix("credit-note-proof-");
            builder
        };
        Ok(match &self.config.work_dir {
            Some(dir) => builder.tempdir_in(dir)?,
            None => builder.tempdir()?,
        })
    }
}

async fn run(program: &Path, args: &[&Path]) -> Result<(), ProverError> {
    let start = Instant::now();
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|err| ProverError::Backend(format!("failed to run {}: {err}", program.display())))?;
    if !output.status.success() {
        return Err(ProverError::Backend(format!(
            "{} exited with {}: {}",
            program.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    debug!(
        program = %program.display(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "backend step finished"
    );
    Ok(())
}

#[async_trait]
impl ProvingBackend for CommandBackend {
    async fn prove(
        &self,
        artifacts: &CircuitArtifacts,
        inputs: &CircuitInputs,
    ) -> Result<RawProof, ProverError> {
        let dir = self.scratch_dir()?;
        let input_path = dir.path().join("input.json");
        let witness_path = dir.path().join("witness.wtns");
        let proof_path = dir.path().join("proof.json");
        let public_path = dir.path().join("public.json");

        tokio::fs::write(&input_path, serde_json::to_vec(&inputs.to_json())?).await?;
        run(&artifacts.witness_generator, &[&input_path, &witness_path]).await?;
        run(
            &self.config.prover_executable,
            &[&artifacts.proving_key, &witness_path, &proof_path, &public_path],
        )
        .await?;

        let proof: SnarkProof = serde_json::from_slice(&tokio::fs::read(&proof_path).await?)?;
        let public_signals: Vec<String> =
            serde_json::from_slice(&tokio::fs::read(&public_path).await?)?;
        Ok(RawProof {
            proof,
            public_signals,
        })
    }
}
