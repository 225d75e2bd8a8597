use super::utils::{parse_address, parse_cred_id, print_json, require_private_key};
use creds_client::{
    run_scenario, ClientConfig, ContractConfig, ContractLedger, CredentialLedger, LocalLedger,
    OutputFormat, ScenarioParams, ScenarioReport, StepOutcome,
};
use creds_crypto::{ProofGenerator, ProvingArtifacts};
use creds_types::{CredsError, CredsResult};
use ethers::types::Address;
use std::sync::Arc;
use tracing::{info, warn};

/// Admin of the in-process ledger used by `demo`.
fn demo_admin() -> Address {
    Address::repeat_byte(0xad)
}

pub async fn handle_execute(
    config: &ClientConfig,
    cred_id: &str,
    admin: Option<&str>,
    signal: &str,
    format: &OutputFormat,
) -> CredsResult<()> {
    let private_key = require_private_key(config.private_key.as_ref())?;
    let ledger = ContractLedger::connect(ContractConfig::from(config))
        .await?
        .with_wallet(private_key)?;
    info!("Using Credential contract at {:?}", ledger.address());

    let admin = match admin {
        Some(admin) => parse_address(admin)?,
        None => ledger.caller(),
    };
    let mut params = ScenarioParams::new(parse_cred_id(cred_id)?, admin);
    params.merkle_tree_depth = config.ledger.merkle_tree_depth;
    params.signal = signal.to_string();

    let generator = load_generator(config, params.merkle_tree_depth)?;
    let report = run_scenario(Arc::new(ledger), &generator, &params).await?;
    print_report(&report, format)
}

pub async fn handle_demo(
    config: &ClientConfig,
    cred_id: &str,
    signal: &str,
    depth: usize,
    format: &OutputFormat,
) -> CredsResult<()> {
    let mut params = ScenarioParams::new(parse_cred_id(cred_id)?, demo_admin());
    params.merkle_tree_depth = depth;
    params.signal = signal.to_string();

    let generator = match load_generator(config, depth) {
        Ok(generator) => generator,
        Err(e) => {
            warn!("No usable proving keys ({}); running a throwaway setup", e);
            let artifacts = tokio::task::spawn_blocking(move || {
                ProvingArtifacts::setup(depth, &mut rand::thread_rng())
            })
            .await
            .map_err(|e| CredsError::Internal(format!("Setup task failed: {}", e)))??;
            ProofGenerator::new(artifacts)
        }
    };

    let ledger = LocalLedger::builder()
        .verifier(generator.verifier())
        .root_history_duration(config.ledger.root_history_duration())
        .build(demo_admin());
    let report = run_scenario(Arc::new(ledger), &generator, &params).await?;
    print_report(&report, format)
}

fn load_generator(config: &ClientConfig, depth: usize) -> CredsResult<ProofGenerator> {
    let pk_path = config.artifacts.proving_key_path(depth);
    let vk_path = config.artifacts.verifying_key_path(depth);
    info!("Loading proving key from {}", pk_path.display());
    let artifacts = ProvingArtifacts::load_files(depth, &pk_path, &vk_path)?;
    Ok(ProofGenerator::new(artifacts))
}

fn print_report(report: &ScenarioReport, format: &OutputFormat) -> CredsResult<()> {
    match format {
        OutputFormat::Json => print_json(&report.to_json())?,
        OutputFormat::Text => {
            println!("Credential {}", report.cred_id);
            println!("  created in        {:?}", report.create_tx);
            println!("  member            {:#x}", report.member_commitment);
            println!("  merkle root       {:#x}", report.merkle_root);
            println!("  member proof      {}", describe(&report.member_proof));
            println!("  non-member proof  {}", describe(&report.non_member_proof));
            println!("  replayed proof    {}", describe(&report.replayed_proof));
            println!();
            if report.is_expected() {
                println!("All outcomes as expected.");
            } else {
                println!("Unexpected outcome; see above.");
            }
        }
    }
    Ok(())
}

fn describe(outcome: &StepOutcome) -> String {
    match outcome {
        StepOutcome::Accepted(tx) => format!("accepted ({:?})", tx),
        StepOutcome::Rejected(e) => format!("rejected: {}", e),
    }
}
