//! Groth16 key generation for the membership circuit.
//!
//! Usage:
//!   creds-keygen generate --depth 20 --output ./keys
//!   creds-keygen verify --vk ./keys/membership-20.vk.bin
//!   creds-keygen info --keys-dir ./keys

use ark_bn254::Bn254;
use ark_groth16::VerifyingKey;
use ark_serialize::CanonicalDeserialize;
use ark_std::rand::thread_rng;
use clap::{Parser, Subcommand};
use creds_crypto::{verifying_key_file, ProvingArtifacts};
use creds_types::{CredsError, CredsResult, DEFAULT_MERKLE_TREE_DEPTH};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const CIRCUIT_VERSION: &str = "1.0.0";

#[derive(Parser)]
#[command(name = "creds-keygen")]
#[command(about = "Generate Groth16 keys for the Creds membership circuit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate new proving and verifying keys.
    Generate {
        /// Merkle tree depth the keys are bound to.
        #[arg(short, long, default_value_t = DEFAULT_MERKLE_TREE_DEPTH)]
        depth: usize,

        #[arg(short, long, default_value = "./creds-keys")]
        output: PathBuf,
    },

    /// Check a verifying key file, optionally against an expected fingerprint.
    Verify {
        #[arg(short, long)]
        vk: PathBuf,

        /// Expected blake3 fingerprint (hex).
        #[arg(short, long)]
        expected_hash: Option<String>,
    },

    /// Show metadata of generated keys.
    Info {
        #[arg(short, long, default_value = "./creds-keys")]
        keys_dir: PathBuf,
    },
}

fn meta_file(depth: usize) -> String {
    format!("membership-{}.meta.json", depth)
}

fn generate_keys(output_dir: &Path, depth: usize) -> CredsResult<()> {
    println!("Creds membership key generator v{}", CIRCUIT_VERSION);
    println!("Merkle depth: {}", depth);
    println!();

    let mut rng = thread_rng();
    let artifacts = ProvingArtifacts::setup(depth, &mut rng)?;
    let (pk_path, vk_path) = artifacts.save(output_dir)?;
    let fingerprint = artifacts.vk_fingerprint()?;

    let pk_size = fs::metadata(&pk_path)?.len();
    let vk_size = fs::metadata(&vk_path)?.len();
    println!("Proving key: {} ({} bytes)", pk_path.display(), pk_size);
    println!("Verifying key: {} ({} bytes)", vk_path.display(), vk_size);
    println!("VK fingerprint: {}", fingerprint);

    let metadata = serde_json::json!({
        "circuit": "membership",
        "version": CIRCUIT_VERSION,
        "merkle_depth": depth,
        "vk_hash": fingerprint,
        "pk_size": pk_size,
        "vk_size": vk_size,
        "generated_at": chrono::Utc::now().to_rfc3339(),
    });
    let meta_path = output_dir.join(meta_file(depth));
    let content = serde_json::to_string_pretty(&metadata)
        .map_err(|e| CredsError::Serialization(e.to_string()))?;
    fs::write(&meta_path, content)?;
    println!("Metadata: {}", meta_path.display());
    Ok(())
}

fn verify_key(vk_path: &Path, expected_hash: Option<String>) -> CredsResult<()> {
    let vk_bytes = fs::read(vk_path)?;
    let actual = blake3::hash(&vk_bytes).to_hex().to_string();
    println!("VK fingerprint: {}", actual);
    println!("Size: {} bytes", vk_bytes.len());

    VerifyingKey::<Bn254>::deserialize_compressed(vk_bytes.as_slice())
        .map_err(|e| CredsError::Crypto(format!("Failed to deserialize VK: {}", e)))?;
    println!("Deserialization: OK");

    if let Some(expected) = expected_hash {
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            return Err(CredsError::Crypto(format!(
                "VK fingerprint mismatch: expected {}, got {}",
                expected, actual
            )));
        }
        println!("Fingerprint match: OK");
    }
    Ok(())
}

fn show_info(keys_dir: &Path) -> CredsResult<()> {
    println!("Directory: {}", keys_dir.display());

    let mut found = false;
    for entry in fs::read_dir(keys_dir)? {
        let path = entry?.path();
        let is_meta = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("membership-") && n.ends_with(".meta.json"))
            .unwrap_or(false);
        if !is_meta {
            continue;
        }
        found = true;

        let content = fs::read_to_string(&path)?;
        let metadata: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| CredsError::Serialization(e.to_string()))?;
        let depth = metadata["merkle_depth"].as_u64().unwrap_or_default() as usize;
        let vk_present = keys_dir.join(verifying_key_file(depth)).exists();

        println!();
        println!("Depth {}:", depth);
        println!("  Version: {}", metadata["version"]);
        println!("  VK hash: {}", metadata["vk_hash"]);
        println!("  PK size: {} bytes", metadata["pk_size"]);
        println!("  VK size: {} bytes", metadata["vk_size"]);
        println!("  VK file present: {}", vk_present);
        println!("  Generated: {}", metadata["generated_at"]);
    }

    if !found {
        println!("No keys found. Run 'creds-keygen generate' first.");
    }
    Ok(())
}

fn main() -> CredsResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Generate { depth, output } => generate_keys(&output, depth),
        Commands::Verify { vk, expected_hash } => verify_key(&vk, expected_hash),
        Commands::Info { keys_dir } => show_info(&keys_dir),
    }
}
