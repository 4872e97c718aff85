pub mod anonymity_set;
pub mod backend;
pub mod chain;
pub mod circuit;
pub mod config;
pub mod credit_note_pool;
pub mod error;
pub mod groth16;
pub mod intent;
pub mod issuer_proxy;
pub mod note;
pub mod prover;
pub mod signer;

pub use anonymity_set::AnonymitySet;
pub use backend::{CommandBackend, ProvingBackend, RawProof};
pub use chain::{ChainClient, ChainError, DigestSigner, Protocol, RawLog, RecoverableSignature};
pub use circuit::{CircuitInputs, CircuitKind};
pub use config::{BackendConfig, CircuitArtifacts, Deployment, ProverConfig};
pub use credit_note_pool::{CommitmentRequest, CreditNotePoolProver, NoteCommitment, SpendRequest};
pub use error::ProverError;
pub use groth16::{Groth16Verifier, ProofBundle, ProofCallData, SnarkProof, VerificationKey};
pub use issuer_proxy::IssuerProxyProver;
pub use note::{CreditNote, CreditType};
pub use prover::{PoolProver, Prover, ProverState};
pub use signer::LocalSigner;
