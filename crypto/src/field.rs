//! Field-element encodings.
//!
//! Every value that crosses the circuit boundary is an element of the BN254
//! scalar field. Hash preimages are assembled from fixed-width little-endian
//! byte fields, hashes travel as `0x`-prefixed 32-byte big-endian hex, and
//! circuit inputs are decimal strings (the snarkjs convention).
//!
//! Conversions are lossless: a value that does not fit the requested width,
//! or an integer at or above the field modulus, is rejected rather than
//! truncated or reduced. Reduction is only ever explicit
//! ([`fr_from_be_bytes_mod_order`]).

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;
use rand::RngCore;

use crate::error::CryptoError;

/// Width of a serialized field element.
pub const FIELD_BYTES: usize = 32;

/// The BN254 scalar field modulus.
pub fn modulus() -> BigUint {
    BigUint::from_bytes_le(&Fr::MODULUS.to_bytes_le())
}

/// Encode `value` as exactly `width` little-endian bytes.
pub fn to_le_bytes(value: &BigUint, width: usize) -> Result<Vec<u8>, CryptoError> {
    let mut bytes = value.to_bytes_le();
    // `to_bytes_le` renders zero as a single zero byte.
    if value.bits() == 0 {
        bytes.clear();
    }
    if bytes.len() > width {
        return Err(CryptoError::Overflow { width });
    }
    bytes.resize(width, 0);
    Ok(bytes)
}

pub fn from_le_bytes(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_le(bytes)
}

/// `0x`-prefixed big-endian hex, left-padded to `width` bytes.
pub fn to_hex(value: &BigUint, width: usize) -> Result<String, CryptoError> {
    let mut be = to_le_bytes(value, width)?;
    be.reverse();
    Ok(format!("0x{}", hex::encode(be)))
}

/// Parses hex with or without the `0x` prefix. Odd-length input is accepted.
pub fn from_hex(input: &str) -> Result<BigUint, CryptoError> {
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    if digits.is_empty() {
        return Ok(BigUint::default());
    }
    let padded = if digits.len() % 2 == 1 {
        format!("0{digits}")
    } else {
        digits.to_string()
    };
    let bytes = hex::decode(padded).map_err(|err| CryptoError::InvalidHex(err.to_string()))?;
    Ok(BigUint::from_bytes_be(&bytes))
}

pub fn fr_from_biguint(value: &BigUint) -> Result<Fr, CryptoError> {
    if value >= &modulus() {
        return Err(CryptoError::NonCanonical);
    }
    Ok(Fr::from_le_bytes_mod_order(&value.to_bytes_le()))
}

pub fn fr_to_biguint(value: &Fr) -> BigUint {
    BigUint::from_bytes_le(&value.into_bigint().to_bytes_le())
}

/// Little-endian encoding of a field element in `width` bytes.
pub fn fr_to_le_bytes(value: &Fr, width: usize) -> Result<Vec<u8>, CryptoError> {
    to_le_bytes(&fr_to_biguint(value), width)
}

pub fn fr_from_le_bytes(bytes: &[u8]) -> Result<Fr, CryptoError> {
    fr_from_biguint(&from_le_bytes(bytes))
}

/// 32-byte big-endian `0x` hex, the form used for on-chain `bytes32`/`uint256`.
pub fn fr_to_hex(value: &Fr) -> String {
    format!("0x{}", hex::encode(value.into_bigint().to_bytes_be()))
}

pub fn fr_from_hex(input: &str) -> Result<Fr, CryptoError> {
    fr_from_biguint(&from_hex(input)?)
}

pub fn fr_to_decimal(value: &Fr) -> String {
    fr_to_biguint(value).to_str_radix(10)
}

pub fn fr_from_decimal(input: &str) -> Result<Fr, CryptoError> {
    let value = BigUint::parse_bytes(input.trim().as_bytes(), 10)
        .ok_or_else(|| CryptoError::InvalidDecimal(input.to_string()))?;
    fr_from_biguint(&value)
}

/// Interprets big-endian bytes as an integer and reduces it into the field.
pub fn fr_from_be_bytes_mod_order(bytes: &[u8]) -> Fr {
    Fr::from_be_bytes_mod_order(bytes)
}

pub fn fr_to_bytes32(value: &Fr) -> [u8; FIELD_BYTES] {
    let mut out = [0u8; FIELD_BYTES];
    let be = value.into_bigint().to_bytes_be();
    out[FIELD_BYTES - be.len()..].copy_from_slice(&be);
    out
}

/// Strict 32-byte big-endian decoding; non-canonical values are rejected.
pub fn fr_from_bytes32(bytes: &[u8; FIELD_BYTES]) -> Result<Fr, CryptoError> {
    fr_from_biguint(&BigUint::from_bytes_be(bytes))
}

/// A uniformly random integer of exactly `width` bytes.
///
/// Used for note nullifiers and secrets (31 bytes), which always fall below
/// the field modulus.
pub fn random_int(width: usize) -> BigUint {
    let mut bytes = vec![0u8; width];
    rand::thread_rng().fill_bytes(&mut bytes);
    BigUint::from_bytes_le(&bytes)
}
