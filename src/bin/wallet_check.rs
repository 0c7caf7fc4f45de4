//! Wallet connectivity check.
//!
//! Builds the wallet gateway from the environment, ensures the service
//! account exists on-chain, and prints its balance. Useful for verifying
//! key and network configuration before starting the server.

use aptask::config::AptosConfig;
use aptask::secrets::EnvSecrets;
use aptask::wallet::WalletGateway;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aptask=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AptosConfig::from_env()?;
    let gateway = WalletGateway::new(&config, &EnvSecrets)?;

    info!("Testing wallet connection...");
    info!("Wallet address: {}", gateway.address());

    info!("Initializing account...");
    gateway.initialize_account().await?;

    info!("Fetching balance...");
    let balance = gateway.get_balance(gateway.address()).await?;
    info!("Wallet balance: {} APT", balance);

    info!("Test completed successfully");
    Ok(())
}
