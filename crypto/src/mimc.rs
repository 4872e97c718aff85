//! MiMC sponge over BN254 (circomlib `MiMCSponge`, 220-round Feistel, x^5).
//!
//! Round constants follow circomlib: the keccak256 chain starts at
//! `keccak256(seed)` and hashes the previous raw digest at every step. Each
//! constant is its digest read big-endian and reduced into the field; the
//! chain itself is never reduced. The first and last constants are zero.

use ark_bn254::Fr;
use ark_ff::{Field, Zero};

use crate::field::fr_from_be_bytes_mod_order;
use crate::hashes::keccak256;

pub const MIMC_SEED: &str = "mimcsponge";
pub const MIMC_ROUNDS: usize = 220;

#[derive(Clone, Debug)]
pub struct MimcSponge {
    constants: Vec<Fr>,
}

impl MimcSponge {
    pub fn new() -> Self {
        Self::with_seed(MIMC_SEED, MIMC_ROUNDS)
    }

    pub fn with_seed(seed: &str, rounds: usize) -> Self {
        let rounds = rounds.max(1);
        let mut constants = vec![Fr::zero(); rounds];
        let mut digest = keccak256(seed.as_bytes());
        for constant in constants.iter_mut().skip(1) {
            digest = keccak256(&digest);
            *constant = fr_from_be_bytes_mod_order(&digest);
        }
        constants[rounds - 1] = Fr::zero();
        Self { constants }
    }

    pub fn rounds(&self) -> usize {
        self.constants.len()
    }

    /// One Feistel permutation of `(xl, xr)` under key `k`.
    pub fn permute(&self, mut xl: Fr, mut xr: Fr, k: Fr) -> (Fr, Fr) {
        let last = self.constants.len() - 1;
        for (round, constant) in self.constants.iter().enumerate() {
            let t = if round == 0 { xl + k } else { xl + k + constant };
            let t5 = t.square().square() * t;
            if round < last {
                let previous_right = xr;
                xr = xl;
                xl = previous_right + t5;
            } else {
                xr += t5;
            }
        }
        (xl, xr)
    }

    /// Sponge with rate 1 and capacity 1, squeezing `outputs` elements.
    pub fn multi_hash(&self, inputs: &[Fr], key: Fr, outputs: usize) -> Vec<Fr> {
        let mut r = Fr::zero();
        let mut c = Fr::zero();
        for input in inputs {
            r += input;
            (r, c) = self.permute(r, c, key);
        }
        let mut out = Vec::with_capacity(outputs);
        if outputs == 0 {
            return out;
        }
        out.push(r);
        for _ in 1..outputs {
            (r, c) = self.permute(r, c, key);
            out.push(r);
        }
        out
    }

    /// Merkle node combiner: absorb `left`, then `right`, squeeze one element.
    pub fn hash_left_right(&self, left: Fr, right: Fr) -> Fr {
        let (r, c) = self.permute(left, Fr::zero(), Fr::zero());
        let (r, _) = self.permute(r + right, c, Fr::zero());
        r
    }
}

impl Default for MimcSponge {
    fn default() -> Self {
        Self::new()
    }
}
