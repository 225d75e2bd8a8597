use creds_types::{CredsError, CredsResult};
use ethers::types::U256;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimal JSON-RPC client for calls the typed provider does not expose.
#[derive(Clone, Debug)]
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
}

impl RpcClient {
    pub fn new(url: &str) -> CredsResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CredsError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> CredsResult<T> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| CredsError::Network(format!("RPC request failed: {}", e)))?;

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CredsError::Network(format!("Failed to parse RPC response: {}", e)))?;

        if let Some(error) = result.get("error") {
            return Err(CredsError::Network(format!("RPC error: {}", error)));
        }

        serde_json::from_value(result["result"].clone())
            .map_err(|e| CredsError::Network(format!("Failed to parse RPC result: {}", e)))
    }
}

/// Prices transactions from the node's priority fee suggestion.
#[derive(Clone, Debug)]
pub struct FeeOracle {
    rpc: RpcClient,
}

impl FeeOracle {
    pub fn new(url: &str) -> CredsResult<Self> {
        Ok(Self {
            rpc: RpcClient::new(url)?,
        })
    }

    pub async fn max_priority_fee_per_gas(&self) -> CredsResult<U256> {
        let fee: U256 = self
            .rpc
            .call("eth_maxPriorityFeePerGas", serde_json::json!([]))
            .await?;
        debug!("Priority fee from {}: {} wei", self.rpc.url(), fee);
        Ok(fee)
    }
}
