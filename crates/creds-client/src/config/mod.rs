mod artifacts;
mod client;
mod ledger;
mod logging;
mod network;
mod types;

pub use artifacts::ArtifactsConfig;
pub use client::ClientConfig;
pub use ledger::LedgerConfig;
pub use logging::LoggingConfig;
pub use network::NetworkConfig;
pub use types::{LogLevel, OutputFormat};
