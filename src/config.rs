use std::path::PathBuf;

use bitcoin::Network;
use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::logging;

pub const DEFAULT_FEE_API_URL: &str = "https://mempool.space/api/v1/fees/recommended";

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
pub struct Config {
    #[clap(
        long,
        env = "LOG_FORMAT",
        help = "Log format (plain, json)",
        default_value = "plain"
    )]
    pub log_format: logging::Format,

    #[clap(
        long,
        env = "NETWORK",
        help = "Network used to encode addresses (bitcoin, testnet, signet, regtest)",
        default_value = "bitcoin"
    )]
    pub network: Network,

    #[clap(
        long,
        env = "FEE_API_URL",
        help = "Endpoint returning recommended fee rates in sat/vB",
        default_value = DEFAULT_FEE_API_URL
    )]
    pub fee_api_url: String,

    #[clap(
        long,
        env = "FEE_API_KEY_PATH",
        help = "Path to the file holding the fee API token (e.g., ./local-secrets)",
        default_value = "local-secrets"
    )]
    pub fee_api_key_path: PathBuf,

    #[clap(
        long,
        env = "FEE_API_TIMEOUT_SECS",
        help = "Timeout in seconds for a single fee API request",
        default_value = "10"
    )]
    pub fee_api_timeout_secs: u64,

    #[clap(
        long,
        env = "OFFLINE",
        help = "Skip the fee API and use the built-in fallback rates",
        default_value = "false"
    )]
    pub offline: bool,
}

impl Config {
    pub fn new_offline() -> Self {
        Self {
            log_format: logging::Format::Plain,
            network: Network::Bitcoin,
            fee_api_url: DEFAULT_FEE_API_URL.to_string(),
            fee_api_key_path: "local-secrets".into(),
            fee_api_timeout_secs: 10,
            offline: true,
        }
    }
}
