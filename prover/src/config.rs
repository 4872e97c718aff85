use std::path::{Path, PathBuf};

use alloy_json_abi::JsonAbi;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::ProverError;

/// Compiled artifacts of one circuit version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitArtifacts {
    pub version: String,
    /// Executable that turns `input.json` into a `.wtns` witness file.
    pub witness_generator: PathBuf,
    /// Groth16 proving key (`.zkey`).
    pub proving_key: PathBuf,
    /// snarkjs `verification_key.json`.
    pub verification_key: PathBuf,
}

impl CircuitArtifacts {
    /// Conventional layout of a circuit build directory:
    /// `<stem>`, `<stem>.zkey` and `<stem>_vk.json`.
    pub fn in_dir(dir: impl AsRef<Path>, stem: &str, version: impl Into<String>) -> Self {
        let dir = dir.as_ref();
        Self {
            version: version.into(),
            witness_generator: dir.join(stem),
            proving_key: dir.join(format!("{stem}.zkey")),
            verification_key: dir.join(format!("{stem}_vk.json")),
        }
    }

    fn resolve(&mut self, base: &Path) {
        for path in [
            &mut self.witness_generator,
            &mut self.proving_key,
            &mut self.verification_key,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// Groth16 prover invoked as `<exe> <zkey> <wtns> <proof.json> <public.json>`.
    #[serde(default = "default_prover_executable")]
    pub prover_executable: PathBuf,
    /// Parent directory for per-proof scratch directories. Defaults to the
    /// system temp dir.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
}

fn default_prover_executable() -> PathBuf {
    PathBuf::from("prover")
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            prover_executable: default_prover_executable(),
            work_dir: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProverConfig {
    pub ownership: CircuitArtifacts,
    /// Present when credit-note pool support is wanted.
    #[serde(default)]
    pub credit_note: Option<CircuitArtifacts>,
    #[serde(default)]
    pub backend: BackendConfig,
}

impl ProverConfig {
    pub fn new(ownership: CircuitArtifacts) -> Self {
        Self {
            ownership,
            credit_note: None,
            backend: BackendConfig::default(),
        }
    }

    pub fn with_credit_note(mut self, artifacts: CircuitArtifacts) -> Self {
        self.credit_note = Some(artifacts);
        self
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn pool_enabled(&self) -> bool {
        self.credit_note.is_some()
    }

    /// Reads a JSON config file. Relative artifact paths are resolved
    /// against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProverError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&contents)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.ownership.resolve(base);
        if let Some(credit_note) = config.credit_note.as_mut() {
            credit_note.resolve(base);
        }
        if config.backend.prover_executable.components().count() > 1
            && config.backend.prover_executable.is_relative()
        {
            config.backend.prover_executable = base.join(&config.backend.prover_executable);
        }
        Ok(config)
    }
}

/// Addresses and capabilities of one protocol deployment.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub chain_id: u64,
    pub issuer_proxy: Address,
    #[serde(default)]
    pub credit_note_pool: Option<Address>,
    #[serde(default)]
    pub privacy_enabled: bool,
    /// First block to scan for pool events.
    #[serde(default)]
    pub pool_deployment_block: u64,
    pub issuer_proxy_abi: JsonAbi,
}
