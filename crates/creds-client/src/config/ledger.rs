use creds_types::{EthAddress, DEFAULT_MERKLE_TREE_DEPTH, DEFAULT_ROOT_HISTORY_DURATION_SECS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Deployed Credential contract. Unset until `deploy` has run.
    pub credential_contract: Option<EthAddress>,
    pub merkle_tree_depth: usize,
    pub root_history_duration_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            credential_contract: None,
            merkle_tree_depth: DEFAULT_MERKLE_TREE_DEPTH,
            root_history_duration_secs: DEFAULT_ROOT_HISTORY_DURATION_SECS,
        }
    }
}

impl LedgerConfig {
    pub fn root_history_duration(&self) -> Duration {
        Duration::from_secs(self.root_history_duration_secs)
    }
}
