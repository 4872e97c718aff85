//! Session-wide cryptographic primitives.
//!
//! Building the Pedersen generators and the MiMC round constants is the
//! expensive part of bringing a prover up, so it happens once, off the async
//! executor, and the result is shared read-only afterwards.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::error::CryptoError;
use crate::hashes::PoseidonHash;
use crate::mimc::MimcSponge;
use crate::pedersen::PedersenHash;

/// Longest Pedersen preimage the pool hashes: nullifier (31) ‖ secret (31) ‖
/// credit type (1) ‖ issuer proxy (20).
pub const MAX_PEDERSEN_INPUT_BYTES: usize = 83;

/// Primitives only the credit-note pool needs.
#[derive(Clone, Debug)]
pub struct PoolPrimitives {
    pub pedersen: PedersenHash,
    pub mimc: MimcSponge,
}

impl PoolPrimitives {
    pub fn build() -> Result<Self, CryptoError> {
        Ok(Self {
            pedersen: PedersenHash::new(MAX_PEDERSEN_INPUT_BYTES)?,
            mimc: MimcSponge::new(),
        })
    }
}

#[derive(Clone, Debug)]
pub struct PrimitiveRegistry {
    poseidon: PoseidonHash,
    pool: Option<Arc<PoolPrimitives>>,
}

impl PrimitiveRegistry {
    /// Builds the registry on the blocking pool. Poseidon is always present;
    /// the Pedersen hash and MiMC sponge only when `with_pool` is set.
    pub async fn build(with_pool: bool) -> Result<Self, CryptoError> {
        tokio::task::spawn_blocking(move || Self::build_blocking(with_pool))
            .await
            .map_err(|err| CryptoError::Construction(err.to_string()))?
    }

    pub fn build_blocking(with_pool: bool) -> Result<Self, CryptoError> {
        let start = Instant::now();
        let poseidon = PoseidonHash;
        // Fails here rather than on the first commitment if the parameter
        // tables are unusable.
        poseidon.hash(&[ark_bn254::Fr::from(0u64)])?;
        let pool = if with_pool {
            Some(Arc::new(PoolPrimitives::build()?))
        } else {
            None
        };
        info!(
            with_pool,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "primitive registry ready"
        );
        Ok(Self { poseidon, pool })
    }

    pub fn poseidon(&self) -> &PoseidonHash {
        &self.poseidon
    }

    pub fn pool(&self) -> Option<&Arc<PoolPrimitives>> {
        self.pool.as_ref()
    }
}
