use super::commands::DeployAction;
use super::utils::{parse_verifier, print_json, require_private_key};
use creds_client::contracts::CredentialDeployment;
use creds_client::field::from_address;
use creds_client::{ClientConfig, ContractConfig, Deployer, OutputFormat};
use creds_types::{is_supported_depth, CredsError, CredsResult};
use ethers::types::Address;
use std::path::Path;
use tracing::info;

pub async fn handle_deploy(
    action: DeployAction,
    config: &mut ClientConfig,
    config_path: &Path,
    format: &OutputFormat,
) -> CredsResult<()> {
    let private_key = require_private_key(config.private_key.as_ref())?.to_string();
    let contracts_dir = config.artifacts.contracts_dir.clone();

    match action {
        DeployAction::Verifier { depth } => {
            check_depth(depth)?;
            let deployer = Deployer::connect(&ContractConfig::from(&*config), &private_key).await?;
            let verifier = deployer.deploy_verifier(&contracts_dir, depth).await?;
            print_verifier(verifier, depth, format)?;
        }
        DeployAction::Credential { verifiers, save } => {
            let verifiers = verifiers
                .iter()
                .map(|v| parse_verifier(v))
                .collect::<CredsResult<Vec<_>>>()?;
            for (_, depth) in &verifiers {
                check_depth(*depth)?;
            }
            let deployer = Deployer::connect(&ContractConfig::from(&*config), &private_key).await?;
            let deployment = deployer.deploy_credential(&contracts_dir, &verifiers).await?;
            if save {
                store_address(config, config_path, deployment.credential)?;
            }
            print_deployment(&deployment, format)?;
        }
        DeployAction::All { depth, save } => {
            check_depth(depth)?;
            if let Some(existing) = config.ledger.credential_contract {
                info!("Credential contract already configured at {}", existing);
                match format {
                    OutputFormat::Json => print_json(&serde_json::json!({
                        "credential": existing.to_checksum(),
                        "deployed": false,
                    }))?,
                    OutputFormat::Text => {
                        println!("Credential contract already configured at {}", existing);
                        println!("Remove ledger.credential_contract from the config to redeploy.");
                    }
                }
                return Ok(());
            }

            let deployer = Deployer::connect(&ContractConfig::from(&*config), &private_key).await?;
            let verifier = deployer.deploy_verifier(&contracts_dir, depth).await?;
            let deployment = deployer
                .deploy_credential(&contracts_dir, &[(verifier, depth)])
                .await?;
            if save {
                store_address(config, config_path, deployment.credential)?;
            }
            print_verifier(verifier, depth, format)?;
            print_deployment(&deployment, format)?;
        }
    }

    Ok(())
}

fn check_depth(depth: usize) -> CredsResult<()> {
    if !is_supported_depth(depth) {
        return Err(CredsError::DepthUnsupported(depth));
    }
    Ok(())
}

fn store_address(config: &mut ClientConfig, path: &Path, address: Address) -> CredsResult<()> {
    config.ledger.credential_contract = Some(from_address(address));
    config.save(path)?;
    info!("Credential address saved to {}", path.display());
    Ok(())
}

fn print_verifier(address: Address, depth: usize, format: &OutputFormat) -> CredsResult<()> {
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "verifier": format!("{:?}", address),
            "depth": depth,
        })),
        OutputFormat::Text => {
            println!("Verifier{:<3} {:?}", depth, address);
            Ok(())
        }
    }
}

fn print_deployment(deployment: &CredentialDeployment, format: &OutputFormat) -> CredsResult<()> {
    match format {
        OutputFormat::Json => {
            let value = serde_json::to_value(deployment)
                .map_err(|e| CredsError::Serialization(e.to_string()))?;
            print_json(&value)
        }
        OutputFormat::Text => {
            println!("PoseidonT3            {:?}", deployment.poseidon);
            println!("IncrementalBinaryTree {:?}", deployment.incremental_binary_tree);
            println!("Credential            {:?}", deployment.credential);
            Ok(())
        }
    }
}
