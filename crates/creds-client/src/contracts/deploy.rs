//! Deployment of the verifier, tree library and Credential contracts from
//! Hardhat build artifacts.

use super::client::{connect_provider, signer_client, SignerClient};
use super::config::ContractConfig;
use super::errors::map_contract_error;
use super::rpc::FeeOracle;
use creds_types::{CredsError, CredsResult};
use ethers::{
    abi::{Abi, Tokenize},
    contract::ContractFactory,
    types::{Address, Bytes, U256},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub const POSEIDON_LIBRARY: &str = "PoseidonT3";
pub const TREE_LIBRARY: &str = "IncrementalBinaryTree";
pub const CREDENTIAL_CONTRACT: &str = "Credential";

pub fn verifier_contract(depth: usize) -> String {
    format!("Verifier{}", depth)
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct LinkReference {
    pub start: usize,
    pub length: usize,
}

/// Hardhat artifact JSON, as written under `artifacts/`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardhatArtifact {
    #[serde(default)]
    pub contract_name: String,
    pub abi: Abi,
    pub bytecode: String,
    /// source file -> library name -> placeholder offsets (bytes)
    #[serde(default)]
    pub link_references: BTreeMap<String, BTreeMap<String, Vec<LinkReference>>>,
}

impl HardhatArtifact {
    pub fn load(path: &Path) -> CredsResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CredsError::Config(format!("Failed to read artifact {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> CredsResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| CredsError::Serialization(format!("Invalid Hardhat artifact: {}", e)))
    }

    pub fn required_libraries(&self) -> Vec<&str> {
        self.link_references
            .values()
            .flat_map(|libs| libs.keys().map(String::as_str))
            .collect()
    }

    /// Splices library addresses over the bytecode placeholders.
    pub fn link(&self, libraries: &HashMap<String, Address>) -> CredsResult<Bytes> {
        let code = self.bytecode.trim();
        let mut code = code.strip_prefix("0x").unwrap_or(code).to_string();

        for libs in self.link_references.values() {
            for (name, references) in libs {
                let address = libraries.get(name).ok_or_else(|| {
                    CredsError::Config(format!(
                        "{} needs library {} which is not deployed",
                        self.contract_name, name
                    ))
                })?;
                let address_hex = hex::encode(address.as_bytes());

                for reference in references {
                    let start = reference.start * 2;
                    let end = start + reference.length * 2;
                    if reference.length != 20 || end > code.len() {
                        return Err(CredsError::Serialization(format!(
                            "Bad link reference for {} at byte {}",
                            name, reference.start
                        )));
                    }
                    code.replace_range(start..end, &address_hex);
                }
            }
        }

        let bytes = hex::decode(&code).map_err(|e| {
            CredsError::Serialization(format!(
                "Bytecode of {} is not fully linked: {}",
                self.contract_name, e
            ))
        })?;
        Ok(Bytes::from(bytes))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CredentialDeployment {
    pub poseidon: Address,
    pub incremental_binary_tree: Address,
    pub credential: Address,
}

pub struct Deployer {
    client: Arc<SignerClient>,
    fees: FeeOracle,
    gas_limit: u64,
    confirmation_timeout: std::time::Duration,
}

impl Deployer {
    pub async fn connect(config: &ContractConfig, private_key: &str) -> CredsResult<Self> {
        let provider = connect_provider(config).await?;
        Ok(Self {
            client: signer_client(provider, private_key, config.chain_id)?,
            fees: FeeOracle::new(&config.fee_rpc_url)?,
            gas_limit: config.gas_limit,
            confirmation_timeout: config.confirmation_timeout,
        })
    }

    pub async fn deploy<T: Tokenize>(
        &self,
        name: &str,
        artifact: &HardhatArtifact,
        libraries: &HashMap<String, Address>,
        args: T,
    ) -> CredsResult<Address> {
        let bytecode = artifact.link(libraries)?;
        let priority_fee = self.fees.max_priority_fee_per_gas().await?;
        debug!("Deploying {} ({} bytes)", name, bytecode.len());

        let factory = ContractFactory::new(artifact.abi.clone(), bytecode, self.client.clone());
        let mut deployer = factory
            .deploy(args)
            .map_err(|e| CredsError::Contract(format!("Failed to encode {} deployment: {}", name, e)))?;
        deployer.tx.set_gas(U256::from(self.gas_limit));
        if let Some(tx) = deployer.tx.as_eip1559_mut() {
            tx.max_priority_fee_per_gas = Some(priority_fee);
        }

        let contract = tokio::time::timeout(self.confirmation_timeout, deployer.send())
            .await
            .map_err(|_| {
                CredsError::Network(format!(
                    "{} deployment not confirmed within {:?}",
                    name, self.confirmation_timeout
                ))
            })?
            .map_err(|e| map_contract_error(name, e))?;

        let address = contract.address();
        info!("{} deployed to {:?}", name, address);
        Ok(address)
    }

    pub async fn deploy_verifier(&self, artifacts_dir: &Path, depth: usize) -> CredsResult<Address> {
        let name = verifier_contract(depth);
        let artifact = HardhatArtifact::load(&artifacts_dir.join(format!("{}.json", name)))?;
        self.deploy(&name, &artifact, &HashMap::new(), ()).await
    }

    /// Deploys the Poseidon library, the tree library linked against it and
    /// the Credential contract linked against the tree library.
    pub async fn deploy_credential(
        &self,
        artifacts_dir: &Path,
        verifiers: &[(Address, usize)],
    ) -> CredsResult<CredentialDeployment> {
        let load = |name: &str| HardhatArtifact::load(&artifacts_dir.join(format!("{}.json", name)));

        let mut libraries = HashMap::new();
        let poseidon = self
            .deploy(POSEIDON_LIBRARY, &load(POSEIDON_LIBRARY)?, &libraries, ())
            .await?;
        libraries.insert(POSEIDON_LIBRARY.to_string(), poseidon);

        let tree = self
            .deploy(TREE_LIBRARY, &load(TREE_LIBRARY)?, &libraries, ())
            .await?;
        libraries.insert(TREE_LIBRARY.to_string(), tree);

        let verifier_args: Vec<(Address, U256)> = verifiers
            .iter()
            .map(|(address, depth)| (*address, U256::from(*depth)))
            .collect();
        let credential = self
            .deploy(
                CREDENTIAL_CONTRACT,
                &load(CREDENTIAL_CONTRACT)?,
                &libraries,
                (verifier_args,),
            )
            .await?;

        Ok(CredentialDeployment {
            poseidon,
            incremental_binary_tree: tree,
            credential,
        })
    }
}
