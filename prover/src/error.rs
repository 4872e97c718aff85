use thiserror::Error;

use privacy_crypto::CryptoError;
use state_merkle::MerkleError;

use crate::chain::ChainError;

#[derive(Debug, Error)]
pub enum ProverError {
    #[error("prover is not initialized; call init() first")]
    Uninitialized,

    #[error("credit note pool support was not enabled for this prover")]
    PoolDisabled,

    #[error("signer cannot produce recoverable digest signatures")]
    DigestSigningUnavailable,

    #[error("protocol deployment does not support privacy features")]
    PrivacyUnsupported,

    #[error("commitment {0} is not part of the anonymity set")]
    CommitmentNotFound(String),

    #[error("merkle root {0} is not recognized by the pool contract")]
    UnknownRoot(String),

    #[error("nullifier hash {0} has already been spent")]
    NullifierSpent(String),

    #[error("anonymity set is inconsistent: {0}")]
    InconsistentAnonymitySet(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("abi encoding error: {0}")]
    Abi(String),

    #[error("malformed proof data: {0}")]
    Malformed(String),

    #[error("proving backend error: {0}")]
    Backend(String),

    #[error("circuit artifact mismatch: {0}")]
    ArtifactMismatch(String),

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("cryptography error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("merkle error: {0}")]
    Merkle(#[from] MerkleError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ProverError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<alloy_dyn_abi::Error> for ProverError {
    fn from(err: alloy_dyn_abi::Error) -> Self {
        Self::Abi(err.to_string())
    }
}
