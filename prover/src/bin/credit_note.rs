use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy_primitives::Address;
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use privacy_crypto::field::fr_to_hex;
use privacy_crypto::{PoolPrimitives, PoseidonHash, PrimitiveRegistry};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use privacy_prover::{
    credit_note_pool::{note_commitment, nullifier_hash},
    intent::{coerce_args, intent_hash, intent_preimage},
    CircuitKind, CreditNote, CreditType, Deployment, Groth16Verifier, ProofBundle, SnarkProof,
};

#[derive(Parser)]
#[command(name = "credit-note", version, about = "Credit note and proof tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Circuit {
    Ownership,
    CreditNote,
}

impl From<Circuit> for CircuitKind {
    fn from(circuit: Circuit) -> Self {
        match circuit {
            Circuit::Ownership => CircuitKind::Ownership,
            Circuit::CreditNote => CircuitKind::CreditNote,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Draw a fresh note and print it with its commitment.
    New {
        #[arg(long)]
        chain_id: u64,
        #[arg(long)]
        credit_type: u8,
        #[arg(long)]
        issuer_proxy: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Commitment {
        #[arg(long, env = "CREDIT_NOTE", hide_env_values = true)]
        note: String,
    },
    #[command(name = "nullifier-hash")]
    NullifierHash {
        #[arg(long, env = "CREDIT_NOTE", hide_env_values = true)]
        note: String,
        #[arg(long, default_value_t = 0)]
        index: u16,
    },
    /// Intent hash of an issuer-proxy call, given its non-proof arguments.
    #[command(name = "intent-hash")]
    IntentHash {
        #[arg(long)]
        deployment: PathBuf,
        #[arg(long)]
        function: String,
        #[arg(long)]
        with_credit_note: bool,
        args: Vec<String>,
    },
    Verify {
        #[arg(long, value_enum)]
        circuit: Circuit,
        #[arg(long)]
        vk: PathBuf,
        #[arg(long)]
        proof: PathBuf,
        #[arg(long)]
        public: PathBuf,
    },
    /// Print snarkjs proof files as a proof bundle with Solidity call data.
    #[command(name = "call-data")]
    CallData {
        #[arg(long)]
        proof: PathBuf,
        #[arg(long)]
        public: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    match cli.command {
        Commands::New {
            chain_id,
            credit_type,
            issuer_proxy,
            out,
        } => cmd_new(chain_id, credit_type, &issuer_proxy, out.as_deref()).await,
        Commands::Commitment { note } => cmd_commitment(&note).await,
        Commands::NullifierHash { note, index } => cmd_nullifier_hash(&note, index).await,
        Commands::IntentHash {
            deployment,
            function,
            with_credit_note,
            args,
        } => cmd_intent_hash(&deployment, &function, with_credit_note, &args),
        Commands::Verify {
            circuit,
            vk,
            proof,
            public,
        } => cmd_verify(circuit.into(), &vk, &proof, &public).await,
        Commands::CallData { proof, public } => cmd_call_data(&proof, &public),
    }
}

async fn pool_primitives() -> Result<std::sync::Arc<PoolPrimitives>> {
    let registry = PrimitiveRegistry::build(true).await?;
    registry
        .pool()
        .cloned()
        .ok_or_else(|| anyhow!("registry built without pool primitives"))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NoteExport {
    note: String,
    commitment_hash: String,
}

async fn cmd_new(
    chain_id: u64,
    credit_type: u8,
    issuer_proxy: &str,
    out: Option<&Path>,
) -> Result<()> {
    let issuer_proxy: Address = issuer_proxy
        .parse()
        .with_context(|| format!("invalid issuer proxy address {issuer_proxy}"))?;
    let note = CreditNote::random(CreditType::new(credit_type)?, issuer_proxy)?;
    let primitives = pool_primitives().await?;
    let export = NoteExport {
        note: note.to_note_string(chain_id),
        commitment_hash: fr_to_hex(&note_commitment(&primitives, &note)?),
    };
    let json = serde_json::to_string_pretty(&export)?;
    if let Some(path) = out {
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    } else {
        println!("{}", json);
    }
    Ok(())
}

async fn cmd_commitment(note: &str) -> Result<()> {
    let note: CreditNote = note.parse()?;
    let primitives = pool_primitives().await?;
    println!("{}", fr_to_hex(&note_commitment(&primitives, &note)?));
    Ok(())
}

async fn cmd_nullifier_hash(note: &str, index: u16) -> Result<()> {
    let note: CreditNote = note.parse()?;
    let primitives = pool_primitives().await?;
    println!(
        "{}",
        fr_to_hex(&nullifier_hash(&primitives, &note.nullifier(), index)?)
    );
    Ok(())
}

fn cmd_intent_hash(
    deployment: &Path,
    function: &str,
    with_credit_note: bool,
    raw_args: &[String],
) -> Result<()> {
    let deployment: Deployment = read_json(deployment)?;
    let abi = &deployment.issuer_proxy_abi;
    let args = coerce_args(abi, function, raw_args, with_credit_note)?;
    let preimage = intent_preimage(abi, function, &args, with_credit_note)?;
    println!("{}", fr_to_hex(&intent_hash(&PoseidonHash, &preimage)?));
    Ok(())
}

async fn cmd_verify(kind: CircuitKind, vk: &Path, proof: &Path, public: &Path) -> Result<()> {
    let verifier = Groth16Verifier::load(kind, vk)
        .await
        .with_context(|| format!("failed to load {}", vk.display()))?;
    let proof: SnarkProof = read_json(proof)?;
    let public: Vec<String> = read_json(public)?;
    if !verifier.verify(&proof, &public)? {
        bail!("{} proof is invalid", kind.name());
    }
    println!("valid");
    Ok(())
}

fn cmd_call_data(proof: &Path, public: &Path) -> Result<()> {
    let proof: SnarkProof = read_json(proof)?;
    let public: Vec<String> = read_json(public)?;
    let bundle = ProofBundle::new(proof, public)?;
    println!("{}", serde_json::to_string_pretty(&bundle)?);
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(serde_json::from_slice(&data)?)
}
