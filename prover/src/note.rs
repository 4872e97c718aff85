//! Credit notes: the secret a pool depositor keeps in order to spend later.
//!
//! A note is rendered as `creditnote-<chainId>-<creditType>-0x<preimage>`
//! where the preimage is the 83-byte Pedersen input of the note commitment.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::Address;
use num_bigint::BigUint;
use privacy_crypto::field::{from_le_bytes, random_int, to_le_bytes};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::ProverError;

/// Width of the nullifier and secret in the Pedersen preimage.
pub const NOTE_SCALAR_BYTES: usize = 31;
pub const DERIVATION_INDEX_BYTES: usize = 2;
pub const CREDIT_TYPE_BYTES: usize = 1;
pub const ADDRESS_BYTES: usize = 20;
pub const NOTE_PREIMAGE_BYTES: usize =
    2 * NOTE_SCALAR_BYTES + CREDIT_TYPE_BYTES + ADDRESS_BYTES;

const NOTE_PREFIX: &str = "creditnote";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CreditType(u8);

impl CreditType {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    pub fn new(value: u8) -> Result<Self, ProverError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ProverError::InvalidArgument(format!(
                "credit type {value} is outside {}..={}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for CreditType {
    type Error = ProverError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

fn scalar_bytes(value: &BigUint, what: &str) -> Result<[u8; NOTE_SCALAR_BYTES], ProverError> {
    let mut bytes = to_le_bytes(value, NOTE_SCALAR_BYTES)
        .map_err(|_| ProverError::InvalidArgument(format!("{what} does not fit in 31 bytes")))?;
    let mut out = [0u8; NOTE_SCALAR_BYTES];
    out.copy_from_slice(&bytes);
    bytes.zeroize();
    Ok(out)
}

/// Little-endian 2-byte encoding of a nullifier derivation index.
pub fn derivation_index_bytes(index: u16) -> [u8; DERIVATION_INDEX_BYTES] {
    index.to_le_bytes()
}

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CreditNote {
    nullifier: [u8; NOTE_SCALAR_BYTES],
    secret: [u8; NOTE_SCALAR_BYTES],
    #[zeroize(skip)]
    credit_type: CreditType,
    #[zeroize(skip)]
    issuer_proxy: Address,
}

impl CreditNote {
    pub fn new(
        nullifier: &BigUint,
        secret: &BigUint,
        credit_type: CreditType,
        issuer_proxy: Address,
    ) -> Result<Self, ProverError> {
        Ok(Self {
            nullifier: scalar_bytes(nullifier, "nullifier")?,
            secret: scalar_bytes(secret, "secret")?,
            credit_type,
            issuer_proxy,
        })
    }

    /// Fresh note with random 31-byte nullifier and secret.
    pub fn random(credit_type: CreditType, issuer_proxy: Address) -> Result<Self, ProverError> {
        Self::new(
            &random_int(NOTE_SCALAR_BYTES),
            &random_int(NOTE_SCALAR_BYTES),
            credit_type,
            issuer_proxy,
        )
    }

    pub fn nullifier(&self) -> BigUint {
        from_le_bytes(&self.nullifier)
    }

    pub fn secret(&self) -> BigUint {
        from_le_bytes(&self.secret)
    }

    pub fn credit_type(&self) -> CreditType {
        self.credit_type
    }

    pub fn issuer_proxy(&self) -> Address {
        self.issuer_proxy
    }

    /// nullifier (31 LE) ‖ secret (31 LE) ‖ credit type (1) ‖ issuer proxy (20 LE).
    pub fn preimage(&self) -> [u8; NOTE_PREIMAGE_BYTES] {
        let mut out = [0u8; NOTE_PREIMAGE_BYTES];
        let (nullifier, rest) = out.split_at_mut(NOTE_SCALAR_BYTES);
        let (secret, rest) = rest.split_at_mut(NOTE_SCALAR_BYTES);
        let (credit_type, proxy) = rest.split_at_mut(CREDIT_TYPE_BYTES);
        nullifier.copy_from_slice(&self.nullifier);
        secret.copy_from_slice(&self.secret);
        credit_type[0] = self.credit_type.get();
        // Addresses are big-endian 160-bit integers; the circuit reads them LE.
        for (dst, src) in proxy.iter_mut().zip(self.issuer_proxy.as_slice().iter().rev()) {
            *dst = *src;
        }
        out
    }

    pub fn to_note_string(&self, chain_id: u64) -> String {
        let mut preimage = self.preimage();
        let note = format!(
            "{NOTE_PREFIX}-{chain_id}-{}-0x{}",
            self.credit_type.get(),
            hex::encode(preimage)
        );
        preimage.zeroize();
        note
    }

    /// Parses a note string, returning the chain id it was issued for.
    pub fn parse(note: &str) -> Result<(u64, Self), ProverError> {
        let invalid = |what: &str| ProverError::InvalidArgument(format!("malformed credit note: {what}"));
        let mut parts = note.trim().splitn(4, '-');
        if parts.next() != Some(NOTE_PREFIX) {
            return Err(invalid("missing prefix"));
        }
        let chain_id = parts
            .next()
            .and_then(|part| part.parse::<u64>().ok())
            .ok_or_else(|| invalid("chain id"))?;
        let credit_type = parts
            .next()
            .and_then(|part| part.parse::<u8>().ok())
            .ok_or_else(|| invalid("credit type"))?;
        let credit_type = CreditType::new(credit_type)?;
        let encoded = parts
            .next()
            .and_then(|part| part.strip_prefix("0x"))
            .ok_or_else(|| invalid("preimage"))?;
        let mut bytes = hex::decode(encoded).map_err(|_| invalid("preimage hex"))?;
        if bytes.len() != NOTE_PREIMAGE_BYTES {
            bytes.zeroize();
            return Err(invalid("preimage length"));
        }
        if bytes[2 * NOTE_SCALAR_BYTES] != credit_type.get() {
            bytes.zeroize();
            return Err(invalid("credit type does not match preimage"));
        }
        let mut proxy = [0u8; ADDRESS_BYTES];
        for (dst, src) in proxy
            .iter_mut()
            .zip(bytes[2 * NOTE_SCALAR_BYTES + CREDIT_TYPE_BYTES..].iter().rev())
        {
            *dst = *src;
        }
        let mut note = Self {
            nullifier: [0u8; NOTE_SCALAR_BYTES],
            secret: [0u8; NOTE_SCALAR_BYTES],
            credit_type,
            issuer_proxy: Address::from(proxy),
        };
        note.nullifier.copy_from_slice(&bytes[..NOTE_SCALAR_BYTES]);
        note.secret
            .copy_from_slice(&bytes[NOTE_SCALAR_BYTES..2 * NOTE_SCALAR_BYTES]);
        bytes.zeroize();
        Ok((chain_id, note))
    }
}

impl fmt::Debug for CreditNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreditNote")
            .field("credit_type", &self.credit_type)
            .field("issuer_proxy", &self.issuer_proxy)
            .finish_non_exhaustive()
    }
}

impl PartialEq for CreditNote {
    fn eq(&self, other: &Self) -> bool {
        self.nullifier == other.nullifier
            && self.secret == other.secret
            && self.credit_type == other.credit_type
            && self.issuer_proxy == other.issuer_proxy
    }
}

impl Eq for CreditNote {}

impl FromStr for CreditNote {
    type Err = ProverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).map(|(_, note)| note)
    }
}
