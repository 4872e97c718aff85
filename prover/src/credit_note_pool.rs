//! Spend proofs for the credit-note pool.
//!
//! A deposit publishes `Pedersen(nullifier ‖ secret ‖ creditType ‖ proxy)`
//! as a leaf of the pool's Merkle tree. Spending proves, in zero knowledge,
//! that one leaf opens to a note the caller knows, and reveals only
//! `Pedersen(nullifier ‖ derivationIndex)` so the contract can reject a
//! second use of the same derivation.

use std::sync::Arc;
use std::time::Instant;

use alloy_primitives::{Address, B256};
use num_bigint::BigUint;
use privacy_crypto::field::{
    fr_from_be_bytes_mod_order, fr_from_biguint, fr_to_bytes32, fr_to_decimal, fr_to_hex,
    to_le_bytes,
};
use privacy_crypto::{Fr, PoolPrimitives};
use tracing::{info, warn};

use crate::anonymity_set::AnonymitySet;
use crate::backend::ProvingBackend;
use crate::chain::Protocol;
use crate::circuit::{CircuitInputs, CircuitKind};
use crate::config::CircuitArtifacts;
use crate::error::ProverError;
use crate::groth16::{Groth16Verifier, ProofBundle, SnarkProof};
use crate::issuer_proxy::parse_field;
use crate::note::{derivation_index_bytes, CreditNote, CreditType, NOTE_SCALAR_BYTES};

/// Pedersen commitment of a note.
pub fn note_commitment(primitives: &PoolPrimitives, note: &CreditNote) -> Result<Fr, ProverError> {
    Ok(primitives.pedersen.hash(&note.preimage())?)
}

/// Pedersen hash of `nullifier (31 LE) ‖ derivation_index (2 LE)`.
pub fn nullifier_hash(
    primitives: &PoolPrimitives,
    nullifier: &BigUint,
    derivation_index: u16,
) -> Result<Fr, ProverError> {
    let mut preimage = to_le_bytes(nullifier, NOTE_SCALAR_BYTES)
        .map_err(|_| ProverError::InvalidArgument("nullifier does not fit in 31 bytes".into()))?;
    preimage.extend_from_slice(&derivation_index_bytes(derivation_index));
    Ok(primitives.pedersen.hash(&preimage)?)
}

pub fn address_to_field(address: Address) -> Fr {
    fr_from_be_bytes_mod_order(address.as_slice())
}

fn word(value: &Fr) -> B256 {
    B256::from(fr_to_bytes32(value))
}

/// Inputs for a new note. Missing values are drawn at random.
#[derive(Clone, Debug)]
pub struct CommitmentRequest {
    pub nullifier: Option<BigUint>,
    pub secret: Option<BigUint>,
    pub credit_type: CreditType,
    pub issuer_proxy: Address,
}

impl CommitmentRequest {
    pub fn new(credit_type: CreditType, issuer_proxy: Address) -> Self {
        Self {
            nullifier: None,
            secret: None,
            credit_type,
            issuer_proxy,
        }
    }

    pub fn with_nullifier(mut self, nullifier: BigUint) -> Self {
        self.nullifier = Some(nullifier);
        self
    }

    pub fn with_secret(mut self, secret: BigUint) -> Self {
        self.secret = Some(secret);
        self
    }

    fn into_note(self) -> Result<CreditNote, ProverError> {
        let nullifier = self
            .nullifier
            .unwrap_or_else(|| privacy_crypto::field::random_int(NOTE_SCALAR_BYTES));
        let secret = self
            .secret
            .unwrap_or_else(|| privacy_crypto::field::random_int(NOTE_SCALAR_BYTES));
        CreditNote::new(&nullifier, &secret, self.credit_type, self.issuer_proxy)
    }
}

#[derive(Clone, Debug)]
pub struct NoteCommitment {
    pub note: CreditNote,
    pub commitment_hash: Fr,
}

/// One spend of `note` under `derivation_index`.
#[derive(Clone, Copy, Debug)]
pub struct SpendRequest<'a> {
    pub note: &'a CreditNote,
    pub derivation_index: u16,
    /// `0x` hex or decimal.
    pub intent_hash: &'a str,
    /// Check root freshness and nullifier status on chain before proving.
    /// Only test harnesses with fabricated logs should turn this off.
    pub perform_validation: bool,
}

impl<'a> SpendRequest<'a> {
    pub fn new(note: &'a CreditNote, derivation_index: u16, intent_hash: &'a str) -> Self {
        Self {
            note,
            derivation_index,
            intent_hash,
            perform_validation: true,
        }
    }

    pub fn without_validation(mut self) -> Self {
        self.perform_validation = false;
        self
    }
}

pub struct CreditNotePoolProver {
    primitives: Arc<PoolPrimitives>,
    artifacts: CircuitArtifacts,
    verifier: Groth16Verifier,
    backend: Arc<dyn ProvingBackend>,
}

impl CreditNotePoolProver {
    pub(crate) fn new(
        primitives: Arc<PoolPrimitives>,
        artifacts: CircuitArtifacts,
        verifier: Groth16Verifier,
        backend: Arc<dyn ProvingBackend>,
    ) -> Self {
        Self {
            primitives,
            artifacts,
            verifier,
            backend,
        }
    }

    pub fn primitives(&self) -> &Arc<PoolPrimitives> {
        &self.primitives
    }

    pub fn artifacts(&self) -> &CircuitArtifacts {
        &self.artifacts
    }

    pub fn compute_commitment_hash(
        &self,
        protocol: &Protocol,
        request: CommitmentRequest,
    ) -> Result<NoteCommitment, ProverError> {
        protocol.ensure_privacy()?;
        let note = request.into_note()?;
        let commitment_hash = note_commitment(&self.primitives, &note)?;
        Ok(NoteCommitment {
            note,
            commitment_hash,
        })
    }

    pub fn compute_nullifier_hash(
        &self,
        nullifier: &BigUint,
        derivation_index: u16,
    ) -> Result<Fr, ProverError> {
        nullifier_hash(&self.primitives, nullifier, derivation_index)
    }

    /// Rebuilds the pool's tree from its event history.
    pub async fn anonymity_set(&self, protocol: &Protocol) -> Result<AnonymitySet<'_>, ProverError> {
        let pool = protocol.credit_note_pool()?;
        AnonymitySet::fetch(
            protocol.chain.as_ref(),
            pool,
            protocol.deployment.pool_deployment_block,
            &self.primitives.mimc,
        )
        .await
    }

    /// First derivation index at or after `start` whose nullifier hash the
    /// pool has not seen.
    pub async fn next_unspent_derivation_index(
        &self,
        protocol: &Protocol,
        note: &CreditNote,
        start: u16,
    ) -> Result<u16, ProverError> {
        let pool = protocol.credit_note_pool()?;
        let nullifier = note.nullifier();
        for index in start..=u16::MAX {
            let hash = nullifier_hash(&self.primitives, &nullifier, index)?;
            if !protocol.chain.is_spent(pool, word(&hash)).await? {
                return Ok(index);
            }
        }
        Err(ProverError::InvalidArgument(format!(
            "every derivation index from {start} is spent"
        )))
    }

    pub async fn generate_proof(
        &self,
        protocol: &Protocol,
        request: SpendRequest<'_>,
    ) -> Result<ProofBundle, ProverError> {
        protocol.ensure_privacy()?;
        let pool = protocol.credit_note_pool()?;
        let intent = parse_field(request.intent_hash)?;
        let note = request.note;
        let nullifier = note.nullifier();
        let commitment = note_commitment(&self.primitives, note)?;
        let nullifier_hash = nullifier_hash(&self.primitives, &nullifier, request.derivation_index)?;

        let set = self.anonymity_set(protocol).await?;
        let Some(leaf_index) = set.position(&commitment) else {
            warn!(commitment = %fr_to_hex(&commitment), "note commitment not in anonymity set");
            return Err(ProverError::CommitmentNotFound(fr_to_hex(&commitment)));
        };
        let root = set.root();

        if request.perform_validation {
            if !protocol.chain.is_known_root(pool, word(&root)).await? {
                warn!(root = %fr_to_hex(&root), "rebuilt root is not known to the pool");
                return Err(ProverError::UnknownRoot(fr_to_hex(&root)));
            }
            if protocol.chain.is_spent(pool, word(&nullifier_hash)).await? {
                warn!(
                    derivation_index = request.derivation_index,
                    "nullifier hash already spent"
                );
                return Err(ProverError::NullifierSpent(fr_to_hex(&nullifier_hash)));
            }
        }

        let path = set.path(leaf_index)?;
        let inputs = CircuitInputs::new(CircuitKind::CreditNote)
            .public("root", root)
            .public("creditType", Fr::from(note.credit_type().get() as u64))
            .public("issuerProxy", address_to_field(note.issuer_proxy()))
            .public("nullifierHash", nullifier_hash)
            .public("intentHash", intent)
            .private("nullifier", fr_from_biguint(&nullifier)?)
            .private("derivationIndex", Fr::from(request.derivation_index as u64))
            .private("secret", fr_from_biguint(&note.secret())?)
            .private("pathElements", path.siblings.clone())
            .private(
                "pathIndices",
                path.indices
                    .iter()
                    .map(|side| Fr::from(*side as u64))
                    .collect::<Vec<_>>(),
            );

        let start = Instant::now();
        let raw = self.backend.prove(&self.artifacts, &inputs).await?;
        let expected: Vec<String> = inputs.public_signals().iter().map(fr_to_decimal).collect();
        if raw.public_signals != expected {
            return Err(ProverError::ArtifactMismatch(
                "credit-note backend returned different public signals".into(),
            ));
        }
        if !self.verifier.verify(&raw.proof, &raw.public_signals)? {
            return Err(ProverError::Backend(
                "credit-note proof failed local verification".into(),
            ));
        }
        info!(
            circuit = CircuitKind::CreditNote.name(),
            version = %self.artifacts.version,
            leaf_index,
            leaves = set.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "proof generated"
        );
        ProofBundle::new(raw.proof, raw.public_signals)
    }

    pub fn verify_proof(
        &self,
        proof: &SnarkProof,
        public_signals: &[String],
    ) -> Result<bool, ProverError> {
        self.verifier.verify(proof, public_signals)
    }
}
