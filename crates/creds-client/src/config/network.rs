use creds_types::DEFAULT_GAS_LIMIT;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// JSON-RPC endpoints and transaction parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub rpc_url: String,
    /// Endpoint queried for `eth_maxPriorityFeePerGas`; `rpc_url` if unset.
    pub fee_rpc_url: Option<String>,
    pub chain_id: u64,
    pub gas_limit: u64,
    pub confirmation_timeout_secs: u64,
    /// First block scanned when replaying credential events.
    pub from_block: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            fee_rpc_url: None,
            chain_id: 31337,
            gas_limit: DEFAULT_GAS_LIMIT,
            confirmation_timeout_secs: 120,
            from_block: 0,
        }
    }
}

impl NetworkConfig {
    pub fn fee_rpc_url(&self) -> &str {
        self.fee_rpc_url.as_deref().unwrap_or(&self.rpc_url)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}
