use crate::config::ClientConfig;
use creds_types::{EthAddress, DEFAULT_GAS_LIMIT};
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ContractConfig {
    pub rpc_url: String,
    pub fee_rpc_url: String,
    pub chain_id: u64,
    pub credential_address: Option<EthAddress>,
    pub gas_limit: u64,
    pub confirmation_timeout: Duration,
    pub from_block: u64,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            fee_rpc_url: "http://localhost:8545".to_string(),
            chain_id: 31337,
            credential_address: None,
            gas_limit: DEFAULT_GAS_LIMIT,
            confirmation_timeout: Duration::from_secs(120),
            from_block: 0,
        }
    }
}

impl From<&ClientConfig> for ContractConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            rpc_url: config.network.rpc_url.clone(),
            fee_rpc_url: config.network.fee_rpc_url().to_string(),
            chain_id: config.network.chain_id,
            credential_address: config.ledger.credential_contract,
            gas_limit: config.network.gas_limit,
            confirmation_timeout: config.network.confirmation_timeout(),
            from_block: config.network.from_block,
        }
    }
}
