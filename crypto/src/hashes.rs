use ark_bn254::Fr;
use blake_hash::{Blake256, Digest as BlakeDigest};
use light_poseidon::{Poseidon, PoseidonHasher};
use sha3::digest::Digest;
use sha3::Keccak256;

use crate::error::CryptoError;
use crate::field::fr_from_be_bytes_mod_order;

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// BLAKE-256 (the SHA-3 finalist, not BLAKE2).
pub fn blake256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake256::new();
    BlakeDigest::update(&mut hasher, data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// keccak256 of `data`, interpreted big-endian and reduced into the field.
pub fn keccak_to_field(data: &[u8]) -> Fr {
    fr_from_be_bytes_mod_order(&keccak256(data))
}

/// Poseidon over BN254 with the circomlib parameter sets.
///
/// Parameter tables are selected by arity on every call, so the handle is
/// free to copy and share between tasks.
#[derive(Clone, Copy, Debug, Default)]
pub struct PoseidonHash;

impl PoseidonHash {
    /// Widest parameter set circomlib publishes (t = 13).
    pub const MAX_INPUTS: usize = 12;

    pub fn hash(&self, inputs: &[Fr]) -> Result<Fr, CryptoError> {
        if inputs.is_empty() || inputs.len() > Self::MAX_INPUTS {
            return Err(CryptoError::Poseidon(format!(
                "unsupported arity {}",
                inputs.len()
            )));
        }
        let mut poseidon = Poseidon::<Fr>::new_circom(inputs.len())
            .map_err(|err| CryptoError::Poseidon(err.to_string()))?;
        poseidon
            .hash(inputs)
            .map_err(|err| CryptoError::Poseidon(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::fr_to_hex;

    #[test]
    fn poseidon_matches_circomlib_vector() {
        let hash = PoseidonHash
            .hash(&[Fr::from(1u64), Fr::from(2u64)])
            .unwrap();
        assert_eq!(
            fr_to_hex(&hash),
            "0x115cc0f5e7d690413df64c6b9662e9cf2a3617f2743245519e19607a4417189a"
        );
    }

    #[test]
    fn poseidon_rejects_empty_input() {
        assert!(PoseidonHash.hash(&[]).is_err());
    }

    #[test]
    fn keccak_empty_vector() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }
}
