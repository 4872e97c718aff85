//! Blockchain collaborators.
//!
//! The prover never talks to a node directly. Read access (chain id, pool
//! event logs, root and nullifier lookups) goes through [`ChainClient`], and
//! ownership signatures go through [`DigestSigner`]. Both are supplied by the
//! host application, which keeps RPC transports and key custody out of this
//! crate.

use std::sync::Arc;

use alloy_primitives::{keccak256, Address, B256, U256};
use async_trait::async_trait;
use privacy_crypto::field::fr_from_bytes32;
use privacy_crypto::Fr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Deployment;
use crate::error::ProverError;

/// Canonical signature of the pool's deposit event.
pub const PURCHASED_EVENT_SIGNATURE: &str = "Purchased(bytes32,uint32,uint256)";

pub fn purchased_topic() -> B256 {
    keccak256(PURCHASED_EVENT_SIGNATURE.as_bytes())
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("rpc request failed: {0}")]
    Rpc(String),
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("malformed event log: {0}")]
    MalformedLog(String),
}

/// An event log as returned by `eth_getLogs`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    pub address: Address,
    pub block_number: u64,
    pub topics: Vec<B256>,
    #[serde(with = "hex::serde")]
    pub data: Vec<u8>,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64, ChainError>;

    /// Logs emitted by `address` whose first topic is `topic0`, from
    /// `from_block` up to the latest block.
    async fn logs(
        &self,
        address: Address,
        topic0: B256,
        from_block: u64,
    ) -> Result<Vec<RawLog>, ChainError>;

    /// `isKnownRoot(bytes32)` on the pool contract.
    async fn is_known_root(&self, pool: Address, root: B256) -> Result<bool, ChainError>;

    /// `isSpent(bytes32)` on the pool contract.
    async fn is_spent(&self, pool: Address, nullifier_hash: B256) -> Result<bool, ChainError>;
}

/// Secp256k1 signature with its recovery byte (`27` or `28`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverableSignature {
    pub r: B256,
    pub s: B256,
    pub v: u8,
}

#[async_trait]
pub trait DigestSigner: Send + Sync {
    fn address(&self) -> Address;

    /// Whether the signer can sign a raw 32-byte digest without applying a
    /// message prefix. Browser wallets usually cannot.
    fn supports_digest_signing(&self) -> bool {
        true
    }

    async fn sign_digest(&self, digest: B256) -> Result<RecoverableSignature, ChainError>;
}

/// Everything a prover needs to know about the chain it is proving for.
#[derive(Clone)]
pub struct Protocol {
    pub deployment: Deployment,
    pub chain: Arc<dyn ChainClient>,
    pub signer: Option<Arc<dyn DigestSigner>>,
}

impl Protocol {
    pub fn new(deployment: Deployment, chain: Arc<dyn ChainClient>) -> Self {
        Self {
            deployment,
            chain,
            signer: None,
        }
    }

    pub fn with_signer(mut self, signer: Arc<dyn DigestSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn ensure_privacy(&self) -> Result<(), ProverError> {
        if self.deployment.privacy_enabled {
            Ok(())
        } else {
            Err(ProverError::PrivacyUnsupported)
        }
    }

    pub fn digest_signer(&self) -> Result<&Arc<dyn DigestSigner>, ProverError> {
        match &self.signer {
            Some(signer) if signer.supports_digest_signing() => Ok(signer),
            _ => Err(ProverError::DigestSigningUnavailable),
        }
    }

    pub fn credit_note_pool(&self) -> Result<Address, ProverError> {
        self.deployment
            .credit_note_pool
            .ok_or(ProverError::PrivacyUnsupported)
    }
}

/// Decoded `Purchased(bytes32 indexed commitment, uint32 leafIndex, uint256 timestamp)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PurchasedEvent {
    pub commitment: Fr,
    pub leaf_index: u32,
    pub timestamp: U256,
    pub block_number: u64,
}

impl PurchasedEvent {
    /// Returns `Ok(None)` for logs of any other event.
    pub fn decode(log: &RawLog) -> Result<Option<Self>, ChainError> {
        if log.topics.first() != Some(&purchased_topic()) {
            return Ok(None);
        }
        let commitment = log
            .topics
            .get(1)
            .ok_or_else(|| ChainError::MalformedLog("missing commitment topic".into()))?;
        if log.data.len() < 64 {
            return Err(ChainError::MalformedLog(format!(
                "expected 64 data bytes, got {}",
                log.data.len()
            )));
        }
        let (index_word, rest) = log.data.split_at(32);
        if index_word[..28].iter().any(|byte| *byte != 0) {
            return Err(ChainError::MalformedLog("leaf index exceeds uint32".into()));
        }
        let mut index = [0u8; 4];
        index.copy_from_slice(&index_word[28..]);
        let commitment = fr_from_bytes32(&commitment.0)
            .map_err(|err| ChainError::MalformedLog(format!("commitment: {err}")))?;
        Ok(Some(Self {
            commitment,
            leaf_index: u32::from_be_bytes(index),
            timestamp: U256::from_be_slice(&rest[..32]),
            block_number: log.block_number,
        }))
    }

    /// Encodes the event the way the pool contract emits it.
    pub fn to_log(&self, pool: Address) -> RawLog {
        let mut data = Vec::with_capacity(64);
        data.extend_from_slice(&U256::from(self.leaf_index).to_be_bytes::<32>());
        data.extend_from_slice(&self.timestamp.to_be_bytes::<32>());
        RawLog {
            address: pool,
            block_number: self.block_number,
            topics: vec![
                purchased_topic(),
                B256::from(privacy_crypto::field::fr_to_bytes32(&self.commitment)),
            ],
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(index: u32) -> PurchasedEvent {
        PurchasedEvent {
            commitment: Fr::from(1000u64 + index as u64),
            leaf_index: index,
            timestamp: U256::from(1_700_000_000u64),
            block_number: 12,
        }
    }

    #[test]
    fn purchased_logs_decode() {
        let original = event(7);
        let log = original.to_log(Address::repeat_byte(0x11));
        assert_eq!(PurchasedEvent::decode(&log).unwrap(), Some(original));
    }

    #[test]
    fn foreign_topics_are_skipped() {
        let mut log = event(0).to_log(Address::ZERO);
        log.topics[0] = keccak256(b"Transfer(address,address,uint256)");
        assert_eq!(PurchasedEvent::decode(&log).unwrap(), None);
    }

    #[test]
    fn short_data_is_rejected() {
        let mut log = event(0).to_log(Address::ZERO);
        log.data.truncate(40);
        assert!(PurchasedEvent::decode(&log).is_err());
    }

    #[test]
    fn oversized_index_is_rejected() {
        let mut log = event(0).to_log(Address::ZERO);
        log.data[0] = 1;
        assert!(PurchasedEvent::decode(&log).is_err());
    }
}
