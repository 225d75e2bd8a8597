use creds_types::{is_supported_depth, CredsError, CredsResult, EthAddress};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::artifacts::ArtifactsConfig;
use super::ledger::LedgerConfig;
use super::logging::LoggingConfig;
use super::network::NetworkConfig;
use super::types::LogLevel;

const MIN_GAS_LIMIT: u64 = 21_000;

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub data_dir: PathBuf,
    pub network: NetworkConfig,
    pub ledger: LedgerConfig,
    pub artifacts: ArtifactsConfig,
    pub logging: LoggingConfig,
    /// Signing key. Only ever read from the environment.
    #[serde(skip)]
    pub private_key: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            data_dir: home.join(".creds"),
            network: NetworkConfig::default(),
            ledger: LedgerConfig::default(),
            artifacts: ArtifactsConfig::default(),
            logging: LoggingConfig::default(),
            private_key: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("data_dir", &self.data_dir)
            .field("network", &self.network)
            .field("ledger", &self.ledger)
            .field("artifacts", &self.artifacts)
            .field("logging", &self.logging)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ClientConfig {
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".creds")
            .join("config.toml")
    }

    pub fn load(path: impl AsRef<Path>) -> CredsResult<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| CredsError::Config(format!("Failed to read config: {}", e)))?;

            toml::from_str(&contents)
                .map_err(|e| CredsError::Config(format!("Failed to parse config: {}", e)))?
        } else {
            info!("Config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> CredsResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| CredsError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CredsError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path.as_ref(), contents)
            .map_err(|e| CredsError::Config(format!("Failed to write config: {}", e)))?;

        info!("Configuration saved to {:?}", path.as_ref());
        Ok(())
    }

    pub fn identities_dir(&self) -> PathBuf {
        self.data_dir.join("identities")
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("CREDS_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Some(url) = lookup("CREDS_RPC_URL") {
            self.network.rpc_url = url;
        }

        if let Some(url) = lookup("CREDS_FEE_RPC_URL") {
            self.network.fee_rpc_url = Some(url);
        }

        if let Some(chain_id) = lookup("CREDS_CHAIN_ID") {
            match chain_id.parse() {
                Ok(id) => self.network.chain_id = id,
                Err(_) => warn!("Ignoring invalid CREDS_CHAIN_ID: {}", chain_id),
            }
        }

        if let Some(addr) = lookup("CREDS_CREDENTIAL_CONTRACT") {
            match EthAddress::from_hex(&addr) {
                Ok(a) => self.ledger.credential_contract = Some(a),
                Err(_) => warn!("Ignoring invalid CREDS_CREDENTIAL_CONTRACT: {}", addr),
            }
        }

        if let Some(key) = lookup("CREDS_PRIVATE_KEY") {
            self.private_key = Some(key);
        }

        if let Some(level) = lookup("CREDS_LOG_LEVEL") {
            self.logging.level = LogLevel::parse(&level);
        }

        if lookup("CREDS_LOG_JSON").is_some() {
            self.logging.json = true;
        }
    }

    pub fn validate(&self) -> CredsResult<()> {
        let urls = std::iter::once(&self.network.rpc_url).chain(self.network.fee_rpc_url.iter());
        for url in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(CredsError::Config(format!(
                    "RPC URL must be http(s): {}",
                    url
                )));
            }
        }

        if self.network.chain_id == 0 {
            return Err(CredsError::Config("Chain ID cannot be 0".into()));
        }

        if self.network.gas_limit < MIN_GAS_LIMIT {
            return Err(CredsError::Config(format!(
                "Gas limit must be at least {}",
                MIN_GAS_LIMIT
            )));
        }

        if self.network.confirmation_timeout_secs == 0 {
            return Err(CredsError::Config(
                "Confirmation timeout must be at least 1 second".into(),
            ));
        }

        if !is_supported_depth(self.ledger.merkle_tree_depth) {
            return Err(CredsError::Config(format!(
                "Unsupported Merkle tree depth: {}",
                self.ledger.merkle_tree_depth
            )));
        }

        if let Some(addr) = &self.ledger.credential_contract {
            if addr.is_zero() {
                return Err(CredsError::Config(
                    "Credential contract address cannot be zero".into(),
                ));
            }
        }

        if self.ledger.root_history_duration_secs == 0 {
            warn!("Root history duration is 0: only the current root will be accepted");
        }

        Ok(())
    }
}
