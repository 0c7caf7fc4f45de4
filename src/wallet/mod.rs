//! Wallet gateway.
//!
//! Wraps the Aptos fullnode REST API around one service-wide blockchain
//! identity: an Ed25519 signing key plus the configured account address.
//! Constructed once at startup with the key injected through
//! [`crate::secrets::SecretSource`]; operations surface failures as
//! [`WalletError`] with an HTTP-style status, and never retry.

pub mod client;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ed25519_dalek::{Signer, SigningKey};
use serde_json::json;

use crate::config::AptosConfig;
use crate::secrets::SecretSource;
use client::{
    apt_to_octas, coin_store_octas, octas_to_apt, AptosClient, ClientError, EntryFunctionPayload,
    SignedTransactionRequest, TransactionRequest, TransactionSignature, OCTAS_PER_APT,
};

/// Transaction defaults for payment submission.
const MAX_GAS_AMOUNT: &str = "2000";
const GAS_UNIT_PRICE: &str = "100";
const TXN_EXPIRY: Duration = Duration::from_secs(600);

/// Service error for wallet operations, carrying an HTTP-style status.
#[derive(Debug, thiserror::Error)]
#[error("{message} (status {status})")]
pub struct WalletError {
    pub status: u16,
    pub message: String,
}

impl WalletError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Log the underlying cause and return the generic service error the
/// caller sees.
fn service_error(message: &str, cause: &ClientError) -> WalletError {
    tracing::error!("{}: {}", message, cause);
    WalletError::new(500, message)
}

#[derive(Debug)]
pub struct WalletGateway {
    client: AptosClient,
    signing_key: SigningKey,
    account_address: String,
}

impl WalletGateway {
    /// Build the gateway from configuration and the injected signing key.
    pub fn new(config: &AptosConfig, secrets: &dyn SecretSource) -> Result<Self, WalletError> {
        let key = secrets
            .fetch("APTOS_PRIVATE_KEY")
            .ok_or_else(|| WalletError::new(500, "Private key not configured"))?;
        let signing_key = decode_signing_key(key.expose())?;

        let account_address = config
            .account_address
            .clone()
            .ok_or_else(|| WalletError::new(500, "Aptos account address not configured"))?;

        Ok(Self {
            client: AptosClient::new(config.node_url.clone(), config.faucet_url.clone()),
            signing_key,
            account_address,
        })
    }

    /// The configured service account address.
    pub fn address(&self) -> &str {
        &self.account_address
    }

    /// Ensure the service account exists on-chain, funding it through the
    /// faucet when absent. Only a node 404 counts as "absent"; transport
    /// and other failures propagate instead of triggering a funding
    /// attempt against an unknown state.
    pub async fn initialize_account(&self) -> Result<(), WalletError> {
        tracing::info!("Initializing account {}", self.account_address);

        match self.client.get_account(&self.account_address).await {
            Ok(_) => {
                tracing::info!("Account already exists");
                Ok(())
            }
            Err(ClientError::NotFound(_)) => {
                tracing::info!("Account does not exist, requesting faucet funding");
                self.client
                    .fund_account(&self.account_address, OCTAS_PER_APT)
                    .await
                    .map_err(|e| service_error("Failed to initialize account", &e))?;
                tracing::info!("Account initialized successfully");
                Ok(())
            }
            Err(e) => Err(service_error("Failed to initialize account", &e)),
        }
    }

    /// Balance of `address` in whole APT. An account without the APT coin
    /// store reports 0.
    pub async fn get_balance(&self, address: &str) -> Result<f64, WalletError> {
        let resources = self
            .client
            .get_account_resources(address)
            .await
            .map_err(|e| service_error("Failed to get balance", &e))?;

        Ok(coin_store_octas(&resources).map(octas_to_apt).unwrap_or(0.0))
    }

    /// Check whether the configured account's balance covers `amount`.
    ///
    /// `user_id` is accepted but not consulted: the check runs against the
    /// shared service account, not a per-user one.
    pub async fn verify_payment(&self, amount: f64, user_id: &str) -> Result<bool, WalletError> {
        let _ = user_id;
        let balance = self.get_balance(&self.account_address).await?;
        tracing::info!("Current balance: {} APT", balance);
        Ok(balance >= amount)
    }

    /// Transfer `amount` APT from `from_address` to the configured account
    /// and return the transaction hash once confirmed.
    ///
    /// The transaction is signed with the server key even though
    /// `from_address` is named as sender.
    pub async fn process_payment(
        &self,
        amount: f64,
        from_address: &str,
    ) -> Result<String, WalletError> {
        let failed = |e: &ClientError| service_error("Payment processing failed", e);

        let sender = self
            .client
            .get_account(from_address)
            .await
            .map_err(|e| failed(&e))?;

        let request = TransactionRequest {
            sender: from_address.to_string(),
            sequence_number: sender.sequence_number,
            max_gas_amount: MAX_GAS_AMOUNT.to_string(),
            gas_unit_price: GAS_UNIT_PRICE.to_string(),
            expiration_timestamp_secs: expiry_timestamp(),
            payload: transfer_payload(&self.account_address, apt_to_octas(amount)),
        };

        let signing_message = self
            .client
            .encode_submission(&request)
            .await
            .map_err(|e| failed(&e))?;
        let message_bytes = hex::decode(signing_message.trim_start_matches("0x"))
            .map_err(|e| {
                tracing::error!("Malformed signing message from node: {}", e);
                WalletError::new(500, "Payment processing failed")
            })?;

        let signature = self.signing_key.sign(&message_bytes);
        let signed = SignedTransactionRequest {
            request,
            signature: TransactionSignature {
                signature_type: "ed25519_signature".to_string(),
                public_key: format!(
                    "0x{}",
                    hex::encode(self.signing_key.verifying_key().to_bytes())
                ),
                signature: format!("0x{}", hex::encode(signature.to_bytes())),
            },
        };

        let pending = self
            .client
            .submit_transaction(&signed)
            .await
            .map_err(|e| failed(&e))?;
        let confirmed = self
            .client
            .wait_for_transaction(&pending.hash)
            .await
            .map_err(|e| failed(&e))?;

        Ok(confirmed.hash)
    }
}

/// Decode a hex private key (with or without `0x`) into a signing key.
fn decode_signing_key(hex_key: &str) -> Result<SigningKey, WalletError> {
    let bytes = hex::decode(hex_key.trim_start_matches("0x"))
        .map_err(|_| WalletError::new(500, "Private key is not valid hex"))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| WalletError::new(500, "Private key must be 32 bytes"))?;
    Ok(SigningKey::from_bytes(&bytes))
}

/// APT transfer payload to `recipient` for `octas` subunits.
fn transfer_payload(recipient: &str, octas: u64) -> EntryFunctionPayload {
    EntryFunctionPayload {
        payload_type: "entry_function_payload".to_string(),
        function: "0x1::aptos_account::transfer_coins".to_string(),
        type_arguments: vec!["0x1::aptos_coin::AptosCoin".to_string()],
        arguments: vec![json!(recipient), json!(octas.to_string())],
    }
}

/// Expiration for a new transaction, as unix seconds.
fn expiry_timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (now + TXN_EXPIRY).as_secs().to_string()
}
