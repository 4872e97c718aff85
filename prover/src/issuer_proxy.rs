//! Ownership proofs for the issuer proxy.
//!
//! Holding a certificate token is proven without revealing the holder: the
//! holder signs a digest scoped to the chain, proxy and token, commits to the
//! signature with Poseidon, and proves knowledge of that signature bound to
//! a specific call intent.

use std::sync::Arc;
use std::time::Instant;

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{keccak256, Address, B256, U256};
use privacy_crypto::field::{fr_from_be_bytes_mod_order, fr_from_biguint, fr_to_decimal, random_int};
use privacy_crypto::{Fr, PrimitiveRegistry};
use tracing::{debug, info};

use crate::backend::ProvingBackend;
use crate::chain::{Protocol, RecoverableSignature};
use crate::circuit::{CircuitInputs, CircuitKind};
use crate::config::CircuitArtifacts;
use crate::error::ProverError;
use crate::groth16::{Groth16Verifier, ProofBundle, SnarkProof};
use crate::intent::{intent_hash, intent_preimage};

/// Width of the random proof nonce.
const NONCE_BYTES: usize = 31;

/// keccak256(chainId (32) ‖ proxy (20) ‖ tokenId (32)), tightly packed.
pub fn ownership_digest(chain_id: u64, issuer_proxy: Address, token_id: U256) -> B256 {
    let mut packed = Vec::with_capacity(32 + 20 + 32);
    packed.extend_from_slice(&U256::from(chain_id).to_be_bytes::<32>());
    packed.extend_from_slice(issuer_proxy.as_slice());
    packed.extend_from_slice(&token_id.to_be_bytes::<32>());
    keccak256(&packed)
}

/// `[r mod p, s mod p, v]` as the circuit consumes them.
pub fn signature_scalars(signature: &RecoverableSignature) -> [Fr; 3] {
    [
        fr_from_be_bytes_mod_order(signature.r.as_slice()),
        fr_from_be_bytes_mod_order(signature.s.as_slice()),
        Fr::from(signature.v as u64),
    ]
}

/// Accepts `0x` hex or decimal.
pub(crate) fn parse_field(input: &str) -> Result<Fr, ProverError> {
    let trimmed = input.trim();
    let parsed = if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        privacy_crypto::field::fr_from_hex(trimmed)
    } else {
        privacy_crypto::field::fr_from_decimal(trimmed)
    };
    parsed.map_err(|err| ProverError::InvalidArgument(format!("field element {input:?}: {err}")))
}

pub struct IssuerProxyProver {
    registry: Arc<PrimitiveRegistry>,
    artifacts: CircuitArtifacts,
    verifier: Groth16Verifier,
    backend: Arc<dyn ProvingBackend>,
}

impl IssuerProxyProver {
    pub(crate) fn new(
        registry: Arc<PrimitiveRegistry>,
        artifacts: CircuitArtifacts,
        verifier: Groth16Verifier,
        backend: Arc<dyn ProvingBackend>,
    ) -> Self {
        Self {
            registry,
            artifacts,
            verifier,
            backend,
        }
    }

    pub fn artifacts(&self) -> &CircuitArtifacts {
        &self.artifacts
    }

    async fn ownership_signature(
        &self,
        protocol: &Protocol,
        token_id: U256,
    ) -> Result<RecoverableSignature, ProverError> {
        protocol.ensure_privacy()?;
        let signer = protocol.digest_signer()?;
        let chain_id = protocol.chain.chain_id().await?;
        let digest = ownership_digest(chain_id, protocol.deployment.issuer_proxy, token_id);
        Ok(signer.sign_digest(digest).await?)
    }

    fn commitment_of(&self, signature: &RecoverableSignature) -> Result<Fr, ProverError> {
        Ok(self.registry.poseidon().hash(&signature_scalars(signature))?)
    }

    /// Poseidon commitment to the holder's signature over `token_id`.
    pub async fn compute_commitment_hash(
        &self,
        protocol: &Protocol,
        token_id: U256,
    ) -> Result<Fr, ProverError> {
        let signature = self.ownership_signature(protocol, token_id).await?;
        self.commitment_of(&signature)
    }

    /// Binds a proof to `function_name(args...)` on the issuer proxy. `args`
    /// are the call's own arguments, without the leading proof tuples.
    pub fn compute_intent_hash(
        &self,
        protocol: &Protocol,
        function_name: &str,
        args: &[DynSolValue],
        needs_credit_note_proof: bool,
    ) -> Result<Fr, ProverError> {
        let preimage = intent_preimage(
            &protocol.deployment.issuer_proxy_abi,
            function_name,
            args,
            needs_credit_note_proof,
        )?;
        let hash = intent_hash(self.registry.poseidon(), &preimage)?;
        debug!(
            function = function_name,
            needs_credit_note_proof,
            preimage_len = preimage.len(),
            "intent hash computed"
        );
        Ok(hash)
    }

    pub async fn generate_proof(
        &self,
        protocol: &Protocol,
        token_id: U256,
        intent_hash: &str,
    ) -> Result<ProofBundle, ProverError> {
        let intent = parse_field(intent_hash)?;
        let signature = self.ownership_signature(protocol, token_id).await?;
        let [r, s, v] = signature_scalars(&signature);
        let commitment = self.registry.poseidon().hash(&[r, s, v])?;
        let nonce = fr_from_biguint(&random_int(NONCE_BYTES))?;

        let inputs = CircuitInputs::new(CircuitKind::Ownership)
            .private("signatureR", r)
            .private("signatureS", s)
            .private("signatureV", v)
            .public("commitmentHash", commitment)
            .public("intentHash", intent)
            .public("nonce", nonce);

        let start = Instant::now();
        let raw = self.backend.prove(&self.artifacts, &inputs).await?;
        let expected: Vec<String> = inputs.public_signals().iter().map(fr_to_decimal).collect();
        if raw.public_signals != expected {
            return Err(ProverError::ArtifactMismatch(
                "ownership backend returned different public signals".into(),
            ));
        }
        if !self.verifier.verify(&raw.proof, &raw.public_signals)? {
            return Err(ProverError::Backend(
                "ownership proof failed local verification".into(),
            ));
        }
        info!(
            circuit = CircuitKind::Ownership.name(),
            version = %self.artifacts.version,
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
