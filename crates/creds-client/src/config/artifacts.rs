use creds_crypto::{proving_key_file, verifying_key_file};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where Groth16 keys and compiled contract artifacts live.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Output directory of `creds-keygen generate`.
    pub keys_dir: PathBuf,
    pub proving_key: Option<PathBuf>,
    pub verifying_key: Option<PathBuf>,
    /// Hardhat artifact JSON files (`Credential.json`, `Verifier20.json`, ...).
    pub contracts_dir: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            keys_dir: home.join(".creds").join("keys"),
            proving_key: None,
            verifying_key: None,
            contracts_dir: PathBuf::from("./artifacts"),
        }
    }
}

impl ArtifactsConfig {
    pub fn proving_key_path(&self, depth: usize) -> PathBuf {
        self.proving_key
            .clone()
            .unwrap_or_else(|| self.keys_dir.join(proving_key_file(depth)))
    }

    pub fn verifying_key_path(&self, depth: usize) -> PathBuf {
        self.verifying_key
            .clone()
            .unwrap_or_else(|| self.keys_dir.join(verifying_key_file(depth)))
    }

    pub fn contract_artifact(&self, name: &str) -> PathBuf {
        self.contracts_dir.join(format!("{}.json", name))
    }
}
