//! Windowed Pedersen hash over Baby Jubjub, matching circomlib `Pedersen`.
//!
//! The message is read as little-endian bits (least significant bit of each
//! byte first), split into 200-bit segments with one generator each, and
//! each segment into 4-bit windows. A window contributes
//! `±(1 + b0 + 2·b1 + 4·b2) · 32^w` where `b3` selects the sign, so every
//! window is non-zero and segments never collide. The hash is the
//! x-coordinate of the accumulated point, an element of the BN254 scalar
//! field.
//!
//! Generator `i` hashes `PedersenGenerator_<i>_<attempt>` (both numbers
//! zero-padded to 32 digits) with BLAKE-256, clears bit 254, and decodes the
//! digest as a compressed point whose top bit selects the larger root. The
//! first attempt that decodes is multiplied by the cofactor.
//!
//! circomlib states the curve as `168700·x² + y² = 1 + 168696·x²·y²`, while
//! arkworks uses the isomorphic `a = 1` form. Points cross between the two
//! with `x_ark = √168700 · x_circom`; `y` is shared.

use ark_bn254::Fr;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ed_on_bn254::{EdwardsAffine, EdwardsProjective, Fr as SubgroupScalar};
use ark_ff::{Field, One, Zero};
use tracing::debug;

use crate::error::CryptoError;
use crate::field::fr_from_le_bytes;
use crate::hashes::blake256;

pub const WINDOW_BITS: usize = 4;
pub const WINDOWS_PER_SEGMENT: usize = 50;
pub const BITS_PER_SEGMENT: usize = WINDOW_BITS * WINDOWS_PER_SEGMENT;

/// Baby Jubjub coefficients in circomlib's twisted Edwards form.
pub const BABYJUB_A: u64 = 168700;
pub const BABYJUB_D: u64 = 168696;

const MAX_GENERATOR_ATTEMPTS: usize = 1024;

#[derive(Clone, Debug)]
pub struct PedersenHash {
    generators: Vec<EdwardsAffine>,
    scale_inv: Fr,
}

impl PedersenHash {
    /// Derives enough generators to hash messages of up to `max_input_bytes`.
    pub fn new(max_input_bytes: usize) -> Result<Self, CryptoError> {
        let scale = Fr::from(BABYJUB_A)
            .sqrt()
            .ok_or_else(|| CryptoError::Construction("curve coefficient is not a square".into()))?;
        let scale_inv = scale
            .inverse()
            .ok_or_else(|| CryptoError::Construction("zero curve scale".into()))?;
        let segments = (max_input_bytes * 8).div_ceil(BITS_PER_SEGMENT).max(1);
        let generators = (0..segments)
            .map(|index| base_point(index, scale))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(segments, "derived pedersen generators");
        Ok(Self {
            generators,
            scale_inv,
        })
    }

    pub fn max_input_bits(&self) -> usize {
        self.generators.len() * BITS_PER_SEGMENT
    }

    /// Hash point as circomlib reports it, `(x, y)`.
    pub fn hash_point(&self, message: &[u8]) -> Result<(Fr, Fr), CryptoError> {
        let point = self.accumulate(message)?;
        Ok(self.to_circom(&point))
    }

    pub fn hash(&self, message: &[u8]) -> Result<Fr, CryptoError> {
        Ok(self.hash_point(message)?.0)
    }

    fn accumulate(&self, message: &[u8]) -> Result<EdwardsAffine, CryptoError> {
        let bits: Vec<bool> = message
            .iter()
            .flat_map(|byte| (0..8).map(move |shift| (byte >> shift) & 1 == 1))
            .collect();
        if bits.len() > self.max_input_bits() {
            return Err(CryptoError::InputTooLong {
                bits: bits.len(),
                max: self.max_input_bits(),
            });
        }

        let window_shift = SubgroupScalar::from(1u64 << (WINDOW_BITS + 1));
        let mut acc = EdwardsProjective::zero();
        for (segment, generator) in bits.chunks(BITS_PER_SEGMENT).zip(&self.generators) {
            let mut scalar = SubgroupScalar::zero();
            let mut exp = SubgroupScalar::one();
            for window in segment.chunks(WINDOW_BITS) {
                let mut magnitude = 1u64;
                for (position, bit) in window.iter().take(WINDOW_BITS - 1).enumerate() {
                    if *bit {
                        magnitude += 1 << position;
                    }
                }
                let mut term = SubgroupScalar::from(magnitude);
                if window.len() == WINDOW_BITS && window[WINDOW_BITS - 1] {
                    term = -term;
                }
                scalar += term * exp;
                exp *= window_shift;
            }
            acc += *generator * scalar;
        }
        Ok(acc.into_affine())
    }

    fn to_circom(&self, point: &EdwardsAffine) -> (Fr, Fr) {
        (point.x * self.scale_inv, point.y)
    }
}

fn base_point(index: usize, scale: Fr) -> Result<EdwardsAffine, CryptoError> {
    for attempt in 0..MAX_GENERATOR_ATTEMPTS {
        let tag = format!("PedersenGenerator_{index:032}_{attempt:032}");
        let mut digest = blake256(tag.as_bytes());
        let greatest = digest[31] & 0x80 != 0;
        digest[31] &= 0x3f;
        let Ok(y) = fr_from_le_bytes(&digest) else {
            continue;
        };
        let Some(x) = x_from_y(y, greatest) else {
            continue;
        };
        let point = EdwardsAffine::new_unchecked(x * scale, y);
        if !point.is_on_curve() {
            continue;
        }
        let point = point.mul_by_cofactor();
        if point.is_zero() || !point.is_in_correct_subgroup_assuming_on_curve() {
            continue;
        }
        return Ok(point);
    }
    Err(CryptoError::GeneratorDerivation(index))
}

/// Solves circomlib's curve equation for `x`, taking the larger root when
/// `greatest` is set.
fn x_from_y(y: Fr, greatest: bool) -> Option<Fr> {
    let y2 = y.square();
    let denominator = Fr::from(BABYJUB_A) - Fr::from(BABYJUB_D) * y2;
    let x2 = (Fr::one() - y2) * denominator.inverse()?;
    let root = x2.sqrt()?;
    let negated = -root;
    Some(if (root > negated) == greatest {
        root
    } else {
        negated
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::fr_from_decimal;

    fn circom_curve_contains(x: Fr, y: Fr) -> bool {
        let (x2, y2) = (x.square(), y.square());
        Fr::from(BABYJUB_A) * x2 + y2 == Fr::one() + Fr::from(BABYJUB_D) * x2 * y2
    }

    #[test]
    fn generators_match_circomlib_bases() {
        let hasher = PedersenHash::new(83).unwrap();
        assert_eq!(hasher.generators.len(), 4);
        let (x0, y0) = hasher.to_circom(&hasher.generators[0]);
        assert_eq!(
            x0,
            fr_from_decimal(
                "10457101036533406547632367118273992217979173478358440826365724437999023779287"
            )
            .unwrap()
        );
        assert_eq!(
            y0,
            fr_from_decimal(
                "19824078218392094440610104313265183977899662750282163392862422243483260492317"
            )
            .unwrap()
        );
        let (x1, _) = hasher.to_circom(&hasher.generators[1]);
        assert_eq!(
            x1,
            fr_from_decimal(
                "2671756056509184035029146175565761955751135805354291559563293617232983272177"
            )
            .unwrap()
        );
    }

    #[test]
    fn generators_are_distinct_subgroup_points() {
        let hasher = PedersenHash::new(83).unwrap();
        for (i, g) in hasher.generators.iter().enumerate() {
            assert!(g.is_on_curve());
            assert!(g.is_in_correct_subgroup_assuming_on_curve());
            let (x, y) = hasher.to_circom(g);
            assert!(circom_curve_contains(x, y));
            for other in &hasher.generators[i + 1..] {
                assert_ne!(g, other);
            }
        }
    }

    #[test]
    fn hash_of_fixed_message() {
        let hasher = PedersenHash::new(8).unwrap();
        assert_eq!(
            hasher.hash(b"Hello").unwrap(),
            fr_from_decimal(
                "13057869703420394250544403835227057665059779354002305870213426705081885688482"
            )
            .unwrap()
        );
        let (x, y) = hasher.hash_point(b"Hello").unwrap();
        assert!(circom_curve_contains(x, y));
    }

    #[test]
    fn empty_message_hashes_to_identity() {
        let hasher = PedersenHash::new(8).unwrap();
        assert_eq!(hasher.hash_point(&[]).unwrap(), (Fr::zero(), Fr::one()));
    }

    #[test]
    fn trailing_zero_byte_changes_hash() {
        let hasher = PedersenHash::new(8).unwrap();
        assert_ne!(hasher.hash(&[1]).unwrap(), hasher.hash(&[1, 0]).unwrap());
    }

    #[test]
    fn oversized_input_is_rejected() {
        let hasher = PedersenHash::new(8).unwrap();
        let message = vec![0u8; hasher.max_input_bits() / 8 + 1];
        assert!(matches!(
            hasher.hash(&message),
            Err(CryptoError::InputTooLong { .. })
        ));
    }
}
