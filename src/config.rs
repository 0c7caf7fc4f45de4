//! Configuration management.
//!
//! Configuration can be set via environment variables:
//! - `MONGODB_URI` - Required. Connection string for the task store.
//! - `MONGODB_DB` - Optional. Database name when the URI carries none. Defaults to `aptask`.
//! - `HOST` - Optional. Server host. Defaults to `0.0.0.0`.
//! - `PORT` - Optional. Server port. Defaults to `3001`.
//! - `APTOS_NETWORK` - Optional. `devnet`, `testnet`, or `mainnet`. Defaults to `testnet`.
//! - `APTOS_NODE_URL` - Optional. Overrides the fullnode URL for the selected network.
//! - `APTOS_ACCOUNT_ADDRESS` - Optional. Destination account for payments.
//! - `APTOS_FAUCET_URL` - Optional. Faucet endpoint used to fund a fresh account.
//!
//! Secrets (`APTOS_PRIVATE_KEY`, `OPENAI_API_KEY`) are not part of `Config`;
//! they are fetched through [`crate::secrets::SecretSource`] at startup.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Aptos network selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Devnet,
    Testnet,
    Mainnet,
}

impl Network {
    /// Default fullnode REST endpoint (v1 API root) for this network.
    pub fn node_url(&self) -> &'static str {
        match self {
            Network::Devnet => "https://fullnode.devnet.aptoslabs.com/v1",
            Network::Testnet => "https://fullnode.testnet.aptoslabs.com/v1",
            Network::Mainnet => "https://fullnode.mainnet.aptoslabs.com/v1",
        }
    }
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "devnet" => Ok(Network::Devnet),
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            other => Err(format!("unknown network: {other}")),
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Devnet => write!(f, "devnet"),
            Network::Testnet => write!(f, "testnet"),
            Network::Mainnet => write!(f, "mainnet"),
        }
    }
}

/// Blockchain-facing configuration.
#[derive(Debug, Clone)]
pub struct AptosConfig {
    /// Which network the wallet gateway talks to
    pub network: Network,

    /// Fullnode REST endpoint (defaults to the network's public fullnode)
    pub node_url: String,

    /// Destination account address for payments
    pub account_address: Option<String>,

    /// Faucet endpoint used to fund the service account when absent on-chain
    pub faucet_url: Option<String>,
}

impl AptosConfig {
    /// Load the blockchain configuration on its own (the wallet check
    /// binary needs no database).
    pub fn from_env() -> Result<Self, ConfigError> {
        let network = std::env::var("APTOS_NETWORK")
            .unwrap_or_else(|_| "testnet".to_string())
            .parse()
            .map_err(|e: String| ConfigError::InvalidValue("APTOS_NETWORK".to_string(), e))?;

        let node_url = std::env::var("APTOS_NODE_URL")
            .unwrap_or_else(|_| Network::node_url(&network).to_string());

        Ok(Self {
            network,
            node_url,
            account_address: std::env::var("APTOS_ACCOUNT_ADDRESS").ok(),
            faucet_url: std::env::var("APTOS_FAUCET_URL").ok(),
        })
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Task store connection string
    pub mongodb_uri: String,

    /// Database name used when the connection string carries none
    pub mongodb_db: String,

    /// Blockchain configuration
    pub aptos: AptosConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `MONGODB_URI` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mongodb_uri = std::env::var("MONGODB_URI")
            .map_err(|_| ConfigError::MissingEnvVar("MONGODB_URI".to_string()))?;

        let mongodb_db =
            std::env::var("MONGODB_DB").unwrap_or_else(|_| "aptask".to_string());

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{e}")))?;

        let aptos = AptosConfig::from_env()?;

        Ok(Self {
            host,
            port,
            mongodb_uri,
            mongodb_db,
            aptos,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(mongodb_uri: String) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            mongodb_uri,
            mongodb_db: "aptask".to_string(),
            aptos: AptosConfig {
                network: Network::Testnet,
                node_url: Network::Testnet.node_url().to_string(),
                account_address: None,
                faucet_url: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parsing() {
        assert_eq!("testnet".parse::<Network>().unwrap(), Network::Testnet);
        assert_eq!("MAINNET".parse::<Network>().unwrap(), Network::Mainnet);
        assert!("localnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_node_urls_are_versioned() {
        for network in [Network::Devnet, Network::Testnet, Network::Mainnet] {
            assert!(network.node_url().ends_with("/v1"));
        }
    }
}
