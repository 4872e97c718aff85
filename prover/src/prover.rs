//! Prover session orchestrator.
//!
//! [`Prover`] owns the session's configuration and proving backend and moves
//! through two states:
//!
//! - **Uninitialized**: nothing is built yet. Every accessor fails with
//!   [`ProverError::Uninitialized`].
//! - **Ready**: the primitive registry is built and the sub-provers hold
//!   their verification keys. The credit-note pool prover exists only when
//!   the configuration carries credit-note artifacts.
//!
//! ## Design
//!
//! - **Two independent failure axes**: asking for the pool prover when pool
//!   support was never configured is [`ProverError::PoolDisabled`] in either
//!   state; asking before `init` is [`ProverError::Uninitialized`].
//! - **Shared read-only primitives**: the registry is built once on the
//!   blocking pool and shared through `Arc`.
//! - **Idempotent init**: calling `init` on a ready prover is a no-op.
//!
//! ## Usage
//!
//! ```ignore
//! let mut prover = Prover::new(ProverConfig::load("prover.json")?);
//! prover.init().await?;
//! let intent = prover
//!     .issuer_proxy()?
//!     .compute_intent_hash(&protocol, "redeem", &args, false)?;
//! let bundle = prover
//!     .issuer_proxy()?
//!     .generate_proof(&protocol, token_id, &fr_to_hex(&intent))
//!     .await?;
//! ```

use std::sync::Arc;
use std::time::Instant;

use privacy_crypto::PrimitiveRegistry;
use tracing::info;

use crate::backend::{CommandBackend, ProvingBackend};
use crate::circuit::CircuitKind;
use crate::config::ProverConfig;
use crate::credit_note_pool::CreditNotePoolProver;
use crate::error::ProverError;
use crate::groth16::Groth16Verifier;
use crate::issuer_proxy::IssuerProxyProver;

/// Pool half of a ready session.
pub enum PoolProver {
    Disabled,
    Enabled(CreditNotePoolProver),
}

/// Everything `init` builds.
pub struct ReadyProvers {
    pub registry: Arc<PrimitiveRegistry>,
    pub issuer_proxy: IssuerProxyProver,
    pub pool: PoolProver,
}

pub enum ProverState {
    Uninitialized,
    Ready(Box<ReadyProvers>),
}

pub struct Prover {
    config: ProverConfig,
    backend: Arc<dyn ProvingBackend>,
    state: ProverState,
}

impl Prover {
    /// Session that proves with the configured executables.
    pub fn new(config: ProverConfig) -> Self {
        let backend = Arc::new(CommandBackend::new(config.backend.clone()));
        Self::with_backend(config, backend)
    }

    pub fn with_backend(config: ProverConfig, backend: Arc<dyn ProvingBackend>) -> Self {
        Self {
            config,
            backend,
            state: ProverState::Uninitialized,
        }
    }

    pub fn config(&self) -> &ProverConfig {
        &self.config
    }

    pub fn state(&self) -> &ProverState {
        &self.state
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, ProverState::Ready(_))
    }

    pub fn pool_enabled(&self) -> bool {
        self.config.pool_enabled()
    }

    /// Builds the primitive registry and loads verification keys.
    pub async fn init(&mut self) -> Result<(), ProverError> {
        if self.is_initialized() {
            return Ok(());
        }
        let start = Instant::now();
        let registry = Arc::new(PrimitiveRegistry::build(self.pool_enabled()).await?);

        let ownership = &self.config.ownership;
        let verifier =
            Groth16Verifier::load(CircuitKind::Ownership, &ownership.verification_key).await?;
        let issuer_proxy = IssuerProxyProver::new(
            registry.clone(),
            ownership.clone(),
            verifier,
            self.backend.clone(),
        );

        let pool = match (&self.config.credit_note, registry.pool()) {
            (Some(artifacts), Some(primitives)) => {
                let verifier =
                    Groth16Verifier::load(CircuitKind::CreditNote, &artifacts.verification_key)
                        .await?;
                PoolProver::Enabled(CreditNotePoolProver::new(
                    primitives.clone(),
                    artifacts.clone(),
                    verifier,
                    self.backend.clone(),
                ))
            }
            (Some(_), None) => {
                return Err(ProverError::InvalidArgument(
                    "registry was built without pool primitives".into(),
                ))
            }
            (None, _) => PoolProver::Disabled,
        };

        info!(
            ownership_version = %ownership.version,
            credit_note_version = self.config.credit_note.as_ref().map(|a| a.version.as_str()),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "prover ready"
        );
        self.state = ProverState::Ready(Box::new(ReadyProvers {
            registry,
            issuer_proxy,
            pool,
        }));
        Ok(())
    }

    fn ready(&self) -> Result<&ReadyProvers, ProverError> {
        match &self.state {
            ProverState::Ready(ready) => Ok(ready),
            ProverState::Uninitialized => Err(ProverError::Uninitialized),
        }
    }

    pub fn registry(&self) -> Result<&Arc<PrimitiveRegistry>, ProverError> {
        Ok(&self.ready()?.registry)
    }

    pub fn issuer_proxy(&self) -> Result<&IssuerProxyProver, ProverError> {
        Ok(&self.ready()?.issuer_proxy)
    }

    pub fn credit_note_pool(&self) -> Result<&CreditNotePoolProver, ProverError> {
        if !self.pool_enabled() {
            return Err(ProverError::PoolDisabled);
        }
        match &self.ready()?.pool {
            PoolProver::Enabled(pool) => Ok(pool),
            PoolProver::Disabled => Err(ProverError::PoolDisabled),
        }
    }
}
