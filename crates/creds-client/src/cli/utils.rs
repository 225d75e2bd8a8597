use super::commands::Cli;
use creds_client::config::LoggingConfig;
use creds_types::{CredsError, CredsResult};
use ethers::types::{Address, U256};
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init_logging(cli: &Cli, logging: &LoggingConfig) -> CredsResult<()> {
    let level = if cli.quiet {
        "warn".to_string()
    } else {
        match cli.verbose {
            0 => logging.level.to_string(),
            1 => "info,creds_client=debug,creds_crypto=debug".to_string(),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match log_sink(cli, logging) {
        LogSink::File { path, json } => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| CredsError::Io(format!("Failed to open log file: {}", e)))?;
            let file_layer = fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false);
            if json {
                subscriber.with(file_layer.json()).init();
            } else {
                subscriber.with(file_layer).init();
            }
        }
        LogSink::StdoutJson => subscriber.with(fmt::layer().json()).init(),
        LogSink::Stdout => {
            let stdout_layer = fmt::layer().with_target(cli.verbose >= 2);
            subscriber.with(stdout_layer).init();
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum LogSink<'a> {
    File { path: &'a Path, json: bool },
    StdoutJson,
    Stdout,
}

/// `--log-file` wins over the configured file; `logging.json` applies to either.
fn log_sink<'a>(cli: &'a Cli, logging: &'a LoggingConfig) -> LogSink<'a> {
    match cli.log_file.as_deref().or(logging.file.as_deref()) {
        Some(path) => LogSink::File {
            path,
            json: logging.json,
        },
        None if logging.json => LogSink::StdoutJson,
        None => LogSink::Stdout,
    }
}

pub fn print_json(value: &serde_json::Value) -> CredsResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CredsError::Serialization(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

pub fn parse_address(s: &str) -> CredsResult<Address> {
    s.trim()
        .parse()
        .map_err(|e| CredsError::InvalidAddress(format!("{}: {}", s, e)))
}

/// Decimal, or hex with a `0x` prefix.
pub fn parse_cred_id(s: &str) -> CredsResult<U256> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16).map_err(|e| e.to_string()),
        None => U256::from_dec_str(s).map_err(|e| e.to_string()),
    };
    parsed.map_err(|e| CredsError::Config(format!("Invalid credential id {}: {}", s, e)))
}

/// `ADDRESS:DEPTH` pairs for the Credential constructor.
pub fn parse_verifier(s: &str) -> CredsResult<(Address, usize)> {
    let (address, depth) = s
        .rsplit_once(':')
        .ok_or_else(|| CredsError::Config(format!("Expected ADDRESS:DEPTH, got {}", s)))?;
    let depth = depth
        .parse()
        .map_err(|_| CredsError::Config(format!("Invalid depth in {}", s)))?;
    Ok((parse_address(address)?, depth))
}

pub fn require_private_key(key: Option<&String>) -> CredsResult<&str> {
    key.map(String::as_str).ok_or_else(|| {
        CredsError::Wallet("Set CREDS_PRIVATE_KEY to sign transactions".into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_log_sink_selection() {
        let mut logging = LoggingConfig::default();
        let plain = Cli::parse_from(["creds", "identity", "list"]);
        assert_eq!(log_sink(&plain, &logging), LogSink::Stdout);

        logging.json = true;
        assert_eq!(log_sink(&plain, &logging), LogSink::StdoutJson);

        let to_file = Cli::parse_from(["creds", "--log-file", "creds.log", "identity", "list"]);
        assert_eq!(
            log_sink(&to_file, &logging),
            LogSink::File {
                path: Path::new("creds.log"),
                json: true
            }
        );

        logging.json = false;
        logging.file = Some(PathBuf::from("configured.log"));
        assert_eq!(
            log_sink(&plain, &logging),
            LogSink::File {
                path: Path::new("configured.log"),
                json: false
            }
        );
        assert_eq!(
            log_sink(&to_file, &logging),
            LogSink::File {
                path: Path::new("creds.log"),
                json: false
            }
        );
    }

    #[test]
    fn test_parse_cred_id() {
        assert_eq!(parse_cred_id("42").unwrap(), U256::from(42u64));
        assert_eq!(parse_cred_id("0x2a").unwrap(), U256::from(42u64));
        assert!(parse_cred_id("forty-two").is_err());
    }

    #[test]
    fn test_parse_verifier() {
        let (address, depth) =
            parse_verifier("0x5FbDB2315678afecb367f032d93F642f64180aa3:20").unwrap();
        assert_eq!(depth, 20);
        assert!(!address.is_zero());
        assert!(parse_verifier("0x5FbDB2315678afecb367f032d93F642f64180aa3").is_err());
        assert!(parse_verifier("nope:20").is_err());
    }
}
