mod bindings;
mod client;
mod config;
mod deploy;
mod errors;
mod rpc;

pub use bindings::{Credential, CredentialEvents};
pub use client::{connect_provider, signer_client, ContractLedger, SignerClient};
pub use config::ContractConfig;
pub use deploy::{
    verifier_contract, CredentialDeployment, Deployer, HardhatArtifact, LinkReference,
    CREDENTIAL_CONTRACT, POSEIDON_LIBRARY, TREE_LIBRARY,
};
pub use errors::{decode_revert, map_contract_error, revert_reason_error};
pub use rpc::{FeeOracle, RpcClient};

#[cfg(test)]
mod tests;
