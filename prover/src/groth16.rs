//! Groth16 over BN254 in snarkjs formats.
//!
//! Circuits are compiled with circom and proven by snarkjs-compatible
//! tooling, so proofs and verification keys travel as snarkjs JSON: every
//! coordinate is a decimal string and points are projective triples with
//! `z = 1` (or `[0, 1, 0]` for the identity). Conversions to arkworks types
//! are checked; points that are not on the curve or not in the prime-order
//! subgroup never reach the pairing.
//!
//! ## Solidity call data
//!
//! Generated verifier contracts take `(uint[2] pA, uint[2][2] pB, uint[2] pC,
//! uint[n] pubSignals)`. The EVM pairing precompile orders Fp2 coordinates as
//! `(c1, c0)`, the reverse of snarkjs JSON, so [`ProofCallData`] swaps each
//! `pB` pair.

use std::path::Path;

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::U256;
use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ec::AffineRepr;
use ark_ff::PrimeField;
use ark_groth16::{prepare_verifying_key, Groth16, PreparedVerifyingKey, Proof, VerifyingKey};
use num_bigint::BigUint;
use privacy_crypto::field::{fr_from_decimal, to_hex};
use serde::{Deserialize, Serialize};

use crate::circuit::CircuitKind;
use crate::error::ProverError;

type G1Json = [String; 3];
type G2Json = [[String; 2]; 3];

fn default_protocol() -> String {
    "groth16".to_string()
}

fn default_curve() -> String {
    "bn128".to_string()
}

fn fq_from_decimal(input: &str) -> Result<Fq, ProverError> {
    let value = BigUint::parse_bytes(input.trim().as_bytes(), 10)
        .ok_or_else(|| ProverError::Malformed(format!("not a decimal integer: {input:?}")))?;
    if value >= BigUint::from(Fq::MODULUS) {
        return Err(ProverError::Malformed(format!(
            "coordinate {input} exceeds the base field"
        )));
    }
    Ok(Fq::from(value))
}

fn fq_to_decimal(value: &Fq) -> String {
    BigUint::from(value.into_bigint()).to_string()
}

fn g1_to_json(point: &G1Affine) -> G1Json {
    if point.is_zero() {
        return ["0".into(), "1".into(), "0".into()];
    }
    [fq_to_decimal(&point.x), fq_to_decimal(&point.y), "1".into()]
}

fn g2_to_json(point: &G2Affine) -> G2Json {
    if point.is_zero() {
        return [
            ["0".into(), "0".into()],
            ["1".into(), "0".into()],
            ["0".into(), "0".into()],
        ];
    }
    [
        [fq_to_decimal(&point.x.c0), fq_to_decimal(&point.x.c1)],
        [fq_to_decimal(&point.y.c0), fq_to_decimal(&point.y.c1)],
        ["1".into(), "0".into()],
    ]
}

/// `Ok(None)` when the coordinates parse but do not describe a valid point.
fn g1_from_json(json: &G1Json) -> Result<Option<G1Affine>, ProverError> {
    let [x, y, z] = json;
    let (x, y, z) = (fq_from_decimal(x)?, fq_from_decimal(y)?, fq_from_decimal(z)?);
    if z == Fq::from(0u64) {
        return Ok(Some(G1Affine::zero()));
    }
    if z != Fq::from(1u64) {
        return Ok(None);
    }
    let point = G1Affine::new_unchecked(x, y);
    if point.is_on_curve() && point.is_in_correct_subgroup_assuming_on_curve() {
        Ok(Some(point))
    } else {
        Ok(None)
    }
}

fn g2_from_json(json: &G2Json) -> Result<Option<G2Affine>, ProverError> {
    let coordinate = |pair: &[String; 2]| -> Result<Fq2, ProverError> {
        Ok(Fq2::new(fq_from_decimal(&pair[0])?, fq_from_decimal(&pair[1])?))
    };
    let (x, y, z) = (coordinate(&json[0])?, coordinate(&json[1])?, coordinate(&json[2])?);
    if z == Fq2::from(0u64) {
        return Ok(Some(G2Affine::zero()));
    }
    if z != Fq2::from(1u64) {
        return Ok(None);
    }
    let point = G2Affine::new_unchecked(x, y);
    if point.is_on_curve() && point.is_in_correct_subgroup_assuming_on_curve() {
        Ok(Some(point))
    } else {
        Ok(None)
    }
}

/// snarkjs `proof.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnarkProof {
    pub pi_a: G1Json,
    pub pi_b: G2Json,
    pub pi_c: G1Json,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default = "default_curve")]
    pub curve: String,
}

impl SnarkProof {
    pub fn from_ark(proof: &Proof<Bn254>) -> Self {
        Self {
            pi_a: g1_to_json(&proof.a),
            pi_b: g2_to_json(&proof.b),
            pi_c: g1_to_json(&proof.c),
            protocol: default_protocol(),
            curve: default_curve(),
        }
    }

    /// `Ok(None)` if any element is not a valid group point.
    pub fn to_ark(&self) -> Result<Option<Proof<Bn254>>, ProverError> {
        let a = g1_from_json(&self.pi_a)?;
        let b = g2_from_json(&self.pi_b)?;
        let c = g1_from_json(&self.pi_c)?;
        Ok(match (a, b, c) {
            (Some(a), Some(b), Some(c)) => Some(Proof { a, b, c }),
            _ => None,
        })
    }
}

/// snarkjs `verification_key.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationKey {
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default = "default_curve")]
    pub curve: String,
    #[serde(rename = "nPublic")]
    pub n_public: usize,
    pub vk_alpha_1: G1Json,
    pub vk_beta_2: G2Json,
    pub vk_gamma_2: G2Json,
    pub vk_delta_2: G2Json,
    #[serde(rename = "IC")]
    pub ic: Vec<G1Json>,
}

impl VerificationKey {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ProverError> {
        let contents = tokio::fs::read_to_string(path.as_ref()).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn from_ark(vk: &VerifyingKey<Bn254>) -> Self {
        Self {
            protocol: default_protocol(),
            curve: default_curve(),
            n_public: vk.gamma_abc_g1.len().saturating_sub(1),
            vk_alpha_1: g1_to_json(&vk.alpha_g1),
            vk_beta_2: g2_to_json(&vk.beta_g2),
            vk_gamma_2: g2_to_json(&vk.gamma_g2),
            vk_delta_2: g2_to_json(&vk.delta_g2),
            ic: vk.gamma_abc_g1.iter().map(g1_to_json).collect(),
        }
    }

    pub fn to_ark(&self) -> Result<VerifyingKey<Bn254>, ProverError> {
        let invalid =
            |name: &str| ProverError::Malformed(format!("verification key {name} is not a valid point"));
        let g1 = |json: &G1Json, name: &str| -> Result<G1Affine, ProverError> {
            g1_from_json(json)?.ok_or_else(|| invalid(name))
        };
        let g2 = |json: &G2Json, name: &str| -> Result<G2Affine, ProverError> {
            g2_from_json(json)?.ok_or_else(|| invalid(name))
        };
        let gamma_abc_g1 = self
            .ic
            .iter()
            .map(|point| g1(point, "IC"))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(VerifyingKey {
            alpha_g1: g1(&self.vk_alpha_1, "vk_alpha_1")?,
            beta_g2: g2(&self.vk_beta_2, "vk_beta_2")?,
            gamma_g2: g2(&self.vk_gamma_2, "vk_gamma_2")?,
            delta_g2: g2(&self.vk_delta_2, "vk_delta_2")?,
            gamma_abc_g1,
        })
    }
}

/// Verifier bound to one circuit kind.
pub struct Groth16Verifier {
    kind: CircuitKind,
    pvk: PreparedVerifyingKey<Bn254>,
}

impl Groth16Verifier {
    /// Rejects keys whose public-input count does not match `kind`.
    pub fn new(kind: CircuitKind, vk: &VerificationKey) -> Result<Self, ProverError> {
        let expected = kind.public_signal_count();
        if vk.n_public != expected || vk.ic.len() != expected + 1 {
            return Err(ProverError::ArtifactMismatch(format!(
                "{} verification key declares {} public inputs ({} IC points), circuit has {}",
                kind.name(),
                vk.n_public,
                vk.ic.len(),
                expected
            )));
        }
        let pvk = prepare_verifying_key(&vk.to_ark()?);
        Ok(Self { kind, pvk })
    }

    pub async fn load(kind: CircuitKind, path: impl AsRef<Path>) -> Result<Self, ProverError> {
        let vk = VerificationKey::load(path).await?;
        Self::new(kind, &vk)
    }

    pub fn kind(&self) -> CircuitKind {
        self.kind
    }

    /// `Ok(false)` for any proof that does not verify, including proofs with
    /// invalid points. Errors only on unparseable input or a wrong number of
    /// public signals.
    pub fn verify(&self, proof: &SnarkProof, public_signals: &[String]) -> Result<bool, ProverError> {
        let expected = self.kind.public_signal_count();
        if public_signals.len() != expected {
            return Err(ProverError::Malformed(format!(
                "{} proof needs {expected} public signals, got {}",
                self.kind.name(),
                public_signals.len()
            )));
        }
        let inputs = public_signals
            .iter()
            .map(|signal| {
                fr_from_decimal(signal)
                    .map_err(|err| ProverError::Malformed(format!("public signal {signal:?}: {err}")))
            })
            .collect::<Result<Vec<Fr>, _>>()?;
        let Some(proof) = proof.to_ark()? else {
            return Ok(false);
        };
        Groth16::<Bn254>::verify_proof(&self.pvk, &proof, &inputs)
            .map_err(|err| ProverError::Malformed(err.to_string()))
    }
}

fn decimal_to_word(input: &str) -> Result<String, ProverError> {
    let value = BigUint::parse_bytes(input.trim().as_bytes(), 10)
        .ok_or_else(|| ProverError::Malformed(format!("not a decimal integer: {input:?}")))?;
    Ok(to_hex(&value, 32)?)
}

fn word_value(word: &str) -> Result<DynSolValue, ProverError> {
    let value: U256 = word
        .parse()
        .map_err(|err| ProverError::Malformed(format!("call data word {word:?}: {err}")))?;
    Ok(DynSolValue::Uint(value, 256))
}

fn word_array(words: &[String]) -> Result<DynSolValue, ProverError> {
    Ok(DynSolValue::FixedArray(
        words
            .iter()
            .map(|word| word_value(word))
            .collect::<Result<Vec<_>, _>>()?,
    ))
}

fn quoted(words: &[String]) -> String {
    words
        .iter()
        .map(|word| format!("\"{word}\""))
        .collect::<Vec<_>>()
        .join(",")
}

/// Arguments of a generated Solidity verifier, as `0x` 32-byte hex words.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofCallData {
    pub p_a: [String; 2],
    pub p_b: [[String; 2]; 2],
    pub p_c: [String; 2],
    pub pub_signals: Vec<String>,
}

impl ProofCallData {
    pub fn from_proof(proof: &SnarkProof, public_signals: &[String]) -> Result<Self, ProverError> {
        Ok(Self {
            p_a: [decimal_to_word(&proof.pi_a[0])?, decimal_to_word(&proof.pi_a[1])?],
            p_b: [
                [decimal_to_word(&proof.pi_b[0][1])?, decimal_to_word(&proof.pi_b[0][0])?],
                [decimal_to_word(&proof.pi_b[1][1])?, decimal_to_word(&proof.pi_b[1][0])?],
            ],
            p_c: [decimal_to_word(&proof.pi_c[0])?, decimal_to_word(&proof.pi_c[1])?],
            pub_signals: public_signals
                .iter()
                .map(|signal| decimal_to_word(signal))
                .collect::<Result<_, _>>()?,
        })
    }

    /// All-zero call data with the layout of `kind`.
    pub fn placeholder(kind: CircuitKind) -> Self {
        let zero = format!("0x{}", "0".repeat(64));
        Self {
            p_a: [zero.clone(), zero.clone()],
            p_b: [[zero.clone(), zero.clone()], [zero.clone(), zero.clone()]],
            p_c: [zero.clone(), zero.clone()],
            pub_signals: vec![zero; kind.public_signal_count()],
        }
    }

    /// Same text as snarkjs `zkey export soliditycalldata`.
    pub fn call_data_as_str(&self) -> String {
        format!(
            "[{}],[[{}],[{}]],[{}],[{}]",
            quoted(&self.p_a),
            quoted(&self.p_b[0]),
            quoted(&self.p_b[1]),
            quoted(&self.p_c),
            quoted(&self.pub_signals)
        )
    }

    /// The proof as a `(uint256[2],uint256[2][2],uint256[2],uint256[n])` tuple.
    pub fn to_sol_value(&self) -> Result<DynSolValue, ProverError> {
        Ok(DynSolValue::Tuple(vec![
            word_array(&self.p_a)?,
            DynSolValue::FixedArray(vec![word_array(&self.p_b[0])?, word_array(&self.p_b[1])?]),
            word_array(&self.p_c)?,
            word_array(&self.pub_signals)?,
        ]))
    }
}

/// What the provers hand back to callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofBundle {
    pub proof: SnarkProof,
    pub public_signals: Vec<String>,
    pub call_data_as_str: String,
    pub call_data: ProofCallData,
}

impl ProofBundle {
    pub fn new(proof: SnarkProof, public_signals: Vec<String>) -> Result<Self, ProverError> {
        let call_data = ProofCallData::from_proof(&proof, &public_signals)?;
        Ok(Self {
            call_data_as_str: call_data.call_data_as_str(),
            proof,
            public_signals,
            call_data,
        })
    }
}
