#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy_json_abi::JsonAbi;
use alloy_primitives::{Address, B256, U256};
use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, ProvingKey};
use ark_relations::lc;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError, Variable};
use ark_snark::{CircuitSpecificSetupSNARK, SNARK};
use ark_std::rand::{rngs::StdRng, SeedableRng};
use async_trait::async_trait;
use privacy_crypto::field::{fr_to_bytes32, fr_to_decimal};
use tempfile::TempDir;

use privacy_prover::chain::PurchasedEvent;
use privacy_prover::{
    ChainClient, ChainError, CircuitArtifacts, CircuitInputs, CircuitKind, Deployment,
    LocalSigner, Protocol, Prover, ProverConfig, ProverError, ProvingBackend, RawLog, RawProof,
    SnarkProof, VerificationKey,
};

pub const CHAIN_ID: u64 = 31337;
pub const HARDHAT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub fn issuer_proxy() -> Address {
    Address::repeat_byte(0x11)
}

pub fn pool_address() -> Address {
    Address::repeat_byte(0x22)
}

pub fn word(value: &Fr) -> B256 {
    B256::from(fr_to_bytes32(value))
}

pub fn issuer_proxy_abi() -> JsonAbi {
    JsonAbi::parse([
        "function redeem((uint256[2],uint256[2][2],uint256[2],uint256[3]) ownership, uint256 tokenId, address recipient)",
        "function redeemWithCredit((uint256[2],uint256[2][2],uint256[2],uint256[3]) ownership, (uint256[2],uint256[2][2],uint256[2],uint256[5]) creditNote, uint256 tokenId, address recipient)",
    ])
    .expect("issuer proxy abi")
}

pub fn deployment(privacy_enabled: bool) -> Deployment {
    Deployment {
        chain_id: CHAIN_ID,
        issuer_proxy: issuer_proxy(),
        credit_note_pool: Some(pool_address()),
        privacy_enabled,
        pool_deployment_block: 10,
        issuer_proxy_abi: issuer_proxy_abi(),
    }
}

/// In-memory pool contract and log index.
pub struct MockChain {
    logs: Mutex<Vec<RawLog>>,
    known_roots: Mutex<HashSet<B256>>,
    spent: Mutex<HashSet<B256>>,
    pub log_requests: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            logs: Mutex::new(Vec::new()),
            known_roots: Mutex::new(HashSet::new()),
            spent: Mutex::new(HashSet::new()),
            log_requests: AtomicUsize::new(0),
        }
    }

    pub fn deposit(&self, pool: Address, leaf_index: u32, commitment: Fr) {
        let event = PurchasedEvent {
            commitment,
            leaf_index,
            timestamp: U256::from(1_700_000_000u64),
            block_number: 20 + leaf_index as u64,
        };
        self.push_log(event.to_log(pool));
    }

    pub fn push_log(&self, log: RawLog) {
        self.logs.lock().unwrap().push(log);
    }

    pub fn accept_root(&self, root: &Fr) {
        self.known_roots.lock().unwrap().insert(word(root));
    }

    pub fn mark_spent(&self, nullifier_hash: &Fr) {
        self.spent.lock().unwrap().insert(word(nullifier_hash));
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(CHAIN_ID)
    }

    async fn logs(
        &self,
        address: Address,
        topic0: B256,
        from_block: u64,
    ) -> Result<Vec<RawLog>, ChainError> {
        self.log_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| {
                log.address == address
                    && log.topics.first() == Some(&topic0)
                    && log.block_number >= from_block
            })
            .cloned()
            .collect())
    }

    async fn is_known_root(&self, _pool: Address, root: B256) -> Result<bool, ChainError> {
        Ok(self.known_roots.lock().unwrap().contains(&root))
    }

    async fn is_spent(&self, _pool: Address, nullifier_hash: B256) -> Result<bool, ChainError> {
        Ok(self.spent.lock().unwrap().contains(&nullifier_hash))
    }
}

/// Circuit exposing `n` public inputs, each copied into a witness.
#[derive(Clone)]
struct EchoCircuit {
    public: Vec<Fr>,
}

impl ConstraintSynthesizer<Fr> for EchoCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        for value in self.public {
            let input = cs.new_input_variable(|| Ok(value))?;
            let witness = cs.new_witness_variable(|| Ok(value))?;
            cs.enforce_constraint(lc!() + input, lc!() + Variable::One, lc!() + witness)?;
        }
        Ok(())
    }
}

/// Real Groth16 proofs over a stand-in circuit with the same public layout.
pub struct ToyBackend {
    keys: HashMap<CircuitKind, ProvingKey<Bn254>>,
    calls: AtomicUsize,
}

impl ToyBackend {
    pub fn new() -> Self {
        let mut keys = HashMap::new();
        for (seed, kind) in [CircuitKind::Ownership, CircuitKind::CreditNote]
            .into_iter()
            .enumerate()
        {
            let circuit = EchoCircuit {
                public: vec![Fr::from(0u64); kind.public_signal_count()],
            };
            let mut rng = StdRng::seed_from_u64(seed as u64 + 1);
            let (pk, _vk) = Groth16::<Bn254>::circuit_specific_setup(circuit, &mut rng)
                .expect("toy groth16 setup");
            keys.insert(kind, pk);
        }
        Self {
            keys,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn verification_key(&self, kind: CircuitKind) -> VerificationKey {
        VerificationKey::from_ark(&self.keys[&kind].vk)
    }

    /// Writes `<stem>_vk.json` for `kind` into `dir`.
    pub fn write_artifacts(&self, dir: &Path, kind: CircuitKind) -> CircuitArtifacts {
        let stem = match kind {
            CircuitKind::Ownership => "ownership",
            CircuitKind::CreditNote => "credit_note",
        };
        let artifacts = CircuitArtifacts::in_dir(dir, stem, "test");
        std::fs::write(
            &artifacts.verification_key,
            serde_json::to_vec(&self.verification_key(kind)).unwrap(),
        )
        .unwrap();
        artifacts
    }

    pub fn prove_signals(&self, kind: CircuitKind, public: &[Fr]) -> RawProof {
        let seed = self.calls.fetch_add(1, Ordering::SeqCst) as u64;
        let mut rng = StdRng::seed_from_u64(1000 + seed);
        let proof = Groth16::<Bn254>::prove(
            &self.keys[&kind],
            EchoCircuit {
                public: public.to_vec(),
            },
            &mut rng,
        )
        .expect("toy groth16 prove");
        RawProof {
            proof: SnarkProof::from_ark(&proof),
            public_signals: public.iter().map(fr_to_decimal).collect(),
        }
    }
}

#[async_trait]
impl ProvingBackend for ToyBackend {
    async fn prove(
        &self,
        _artifacts: &CircuitArtifacts,
        inputs: &CircuitInputs,
    ) -> Result<RawProof, ProverError> {
        Ok(self.prove_signals(inputs.kind(), &inputs.public_signals()))
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub backend: Arc<ToyBackend>,
    pub chain: Arc<MockChain>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            backend: Arc::new(ToyBackend::new()),
            chain: Arc::new(MockChain::new()),
        }
    }

    pub fn config(&self, with_pool: bool) -> ProverConfig {
        let config = ProverConfig::new(
            self.backend
                .write_artifacts(self.dir.path(), CircuitKind::Ownership),
        );
        if with_pool {
            config.with_credit_note(
                self.backend
                    .write_artifacts(self.dir.path(), CircuitKind::CreditNote),
            )
        } else {
            config
        }
    }

    pub fn prover(&self, with_pool: bool) -> Prover {
        Prover::with_backend(self.config(with_pool), self.backend.clone())
    }

    pub async fn ready_prover(&self, with_pool: bool) -> Prover {
        let mut prover = self.prover(with_pool);
        prover.init().await.unwrap();
        prover
    }

    pub fn protocol(&self) -> Protocol {
        Protocol::new(deployment(true), self.chain.clone())
            .with_signer(Arc::new(LocalSigner::from_hex(HARDHAT_KEY).unwrap()))
    }
}
