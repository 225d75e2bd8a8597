//! Membership credential client.
//!
//! Keeps a local mirror of a credential's identity tree, proves membership
//! with Groth16, and talks to the Credential ledger either in process
//! ([`ledger::LocalLedger`]) or through a deployed contract
//! ([`contracts::ContractLedger`]).

#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod config;
pub mod contracts;
pub mod field;
pub mod identity_store;
pub mod ledger;
pub mod scenario;

#[cfg(test)]
mod test_support;

pub use config::{ClientConfig, LogLevel, OutputFormat};
pub use contracts::{ContractConfig, ContractLedger, Deployer};
pub use identity_store::{IdentityRecord, IdentityStore};
pub use ledger::{
    sync_group, CredEvent, CredInfo, CredentialLedger, LedgerReceipt, LocalLedger, MirroredCred,
    ProofSubmission,
};
pub use scenario::{run_scenario, ScenarioParams, ScenarioReport, StepOutcome};
