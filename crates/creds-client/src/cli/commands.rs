use clap::{Parser, Subcommand};
use creds_client::OutputFormat;
use creds_types::{DEFAULT_MERKLE_TREE_DEPTH, DEFAULT_SIGNAL};
use std::path::PathBuf;

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "creds")]
#[command(version = BUILD_VERSION)]
#[command(about = "Creds - Anonymous membership credentials on a Credential ledger")]
#[command(long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(short, long, global = true, value_name = "FILE", help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(short = 'd', long, global = true, value_name = "DIR", env = "CREDS_DATA_DIR", help = "Data directory path")]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase verbosity (-v, -vv, -vvv)")]
    pub verbose: u8,

    #[arg(short, long, global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[arg(long, global = true, value_name = "FILE", help = "Write logs to file")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text", help = "Output format")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Manage identities")]
    Identity {
        #[command(subcommand)]
        action: IdentityAction,
    },

    #[command(about = "Deploy verifier and Credential contracts")]
    Deploy {
        #[command(subcommand)]
        action: DeployAction,
    },

    #[command(about = "Run the membership flow against the deployed Credential contract")]
    #[command(long_about = "Create a credential, add one of two fresh identities, prove and verify a signal for it, \
and report that the other identity and a resubmitted proof are both rejected.")]
    Execute {
        #[arg(long, help = "Credential id (also used as the external nullifier)")]
        cred_id: String,
        #[arg(long, value_name = "ADDRESS", help = "Credential admin (defaults to the wallet address)")]
        admin: Option<String>,
        #[arg(long, default_value = DEFAULT_SIGNAL, help = "Signal to prove (at most 31 bytes)")]
        signal: String,
    },

    #[command(about = "Run the membership flow against an in-process ledger")]
    Demo {
        #[arg(long, default_value = "42", help = "Credential id")]
        cred_id: String,
        #[arg(long, default_value = DEFAULT_SIGNAL, help = "Signal to prove (at most 31 bytes)")]
        signal: String,
        #[arg(long, default_value_t = DEFAULT_MERKLE_TREE_DEPTH, help = "Merkle tree depth")]
        depth: usize,
    },
}

#[derive(Subcommand)]
pub enum IdentityAction {
    #[command(about = "Generate a new identity")]
    Generate {
        #[arg(long, help = "Derive the identity from this secret instead of randomness")]
        secret: Option<String>,
        #[arg(long, help = "Label for the identity")]
        label: Option<String>,
    },
    #[command(about = "List all identities")]
    List,
    #[command(about = "Show identity details")]
    Show {
        #[arg(help = "Identity ID or label")]
        id: String,
    },
}

#[derive(Subcommand)]
pub enum DeployAction {
    #[command(about = "Deploy a Groth16 verifier contract")]
    Verifier {
        #[arg(long, default_value_t = DEFAULT_MERKLE_TREE_DEPTH, help = "Tree depth the verifier was generated for")]
        depth: usize,
    },
    #[command(about = "Deploy the Poseidon and tree libraries and the Credential contract")]
    Credential {
        #[arg(long = "verifier", value_name = "ADDRESS:DEPTH", required = true, help = "Verifier to register (repeatable)")]
        verifiers: Vec<String>,
        #[arg(long, help = "Store the Credential address in the config file")]
        save: bool,
    },
    #[command(about = "Deploy a verifier and the Credential contract unless one is configured")]
    All {
        #[arg(long, default_value_t = DEFAULT_MERKLE_TREE_DEPTH, help = "Merkle tree depth")]
        depth: usize,
        #[arg(long, help = "Store the Credential address in the config file")]
        save: bool,
    },
}
