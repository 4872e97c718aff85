use alloy_primitives::{keccak256, Address, B256};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use zeroize::Zeroize;

use crate::chain::{ChainError, DigestSigner, RecoverableSignature};

/// In-process secp256k1 key. Signatures are RFC 6979 deterministic with
/// low-s normalization, so signing the same digest twice yields the same
/// ownership commitment.
#[derive(Clone)]
pub struct LocalSigner {
    key: SigningKey,
    address: Address,
}

impl LocalSigner {
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self, ChainError> {
        let key = SigningKey::from_slice(secret)
            .map_err(|err| ChainError::Signing(format!("invalid secret key: {err}")))?;
        let address = address_of(&key);
        Ok(Self { key, address })
    }

    pub fn from_hex(secret: &str) -> Result<Self, ChainError> {
        let mut bytes = hex::decode(secret.trim().trim_start_matches("0x"))
            .map_err(|err| ChainError::Signing(format!("invalid secret key hex: {err}")))?;
        let mut secret = [0u8; 32];
        let result = if bytes.len() == 32 {
            secret.copy_from_slice(&bytes);
            Self::from_bytes(&secret)
        } else {
            Err(ChainError::Signing(format!(
                "secret key must be 32 bytes, got {}",
                bytes.len()
            )))
        };
        bytes.zeroize();
        secret.zeroize();
        result
    }
}

fn address_of(key: &SigningKey) -> Address {
    let point = key.verifying_key().to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DigestSigner for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_digest(&self, digest: B256) -> Result<RecoverableSignature, ChainError> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest.as_slice())
            .map_err(|err| ChainError::Signing(err.to_string()))?;
        let bytes = signature.to_bytes();
        Ok(RecoverableSignature {
            r: B256::from_slice(&bytes[..32]),
            s: B256::from_slice(&bytes[32..]),
            v: 27 + recovery_id.to_byte(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

    // Well-known Hardhat account #0.
    const HARDHAT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn derives_ethereum_address() {
        let signer = LocalSigner::from_hex(HARDHAT_KEY).unwrap();
        assert_eq!(
            signer.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
                .parse::<Address>()
                .unwrap()
        );
    }

    #[tokio::test]
    async fn signatures_are_deterministic_and_recoverable() {
        let signer = LocalSigner::from_hex(HARDHAT_KEY).unwrap();
        let digest = keccak256(b"ownership");
        let first = signer.sign_digest(digest).await.unwrap();
        let second = signer.sign_digest(digest).await.unwrap();
        assert_eq!(first, second);
        assert!(first.v == 27 || first.v == 28);

        let mut raw = [0u8; 64];
        raw[..32].copy_from_slice(first.r.as_slice());
        raw[32..].copy_from_slice(first.s.as_slice());
        let signature = Signature::from_slice(&raw).unwrap();
        let recovery = RecoveryId::from_byte(first.v - 27).unwrap();
        let recovered =
            VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recovery).unwrap();
        assert_eq!(address_of_verifying(&recovered), signer.address());
    }

    fn address_of_verifying(key: &VerifyingKey) -> Address {
        let point = key.to_encoded_point(false);
        Address::from_slice(&keccak256(&point.as_bytes()[1..])[12..])
    }

    #[test]
    fn rejects_short_keys() {
        assert!(LocalSigner::from_hex("0x1234").is_err());
    }
}
