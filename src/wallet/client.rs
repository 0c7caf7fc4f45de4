//! Aptos fullnode REST client.
//!
//! Thin reqwest wrapper over the v1 node API plus the faucet. Errors keep
//! the node's status so the gateway can tell "account does not exist" (404)
//! apart from transport trouble.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Resource type holding the APT coin balance.
pub const APT_COIN_STORE: &str = "0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>";

/// Smallest on-chain unit; 100,000,000 octas = 1 APT.
pub const OCTAS_PER_APT: u64 = 100_000_000;

/// Poll cadence and bound for transaction confirmation.
const CONFIRM_POLL_INTERVAL: Duration = Duration::from_secs(1);
const CONFIRM_MAX_POLLS: u32 = 30;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("node returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Parse(String),
}

impl ClientError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}

/// On-chain account header.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    pub sequence_number: String,
    pub authentication_key: String,
}

/// One account resource, type string plus opaque data.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub data: serde_json::Value,
}

/// Entry-function transaction payload.
#[derive(Debug, Clone, Serialize)]
pub struct EntryFunctionPayload {
    #[serde(rename = "type")]
    pub payload_type: String,
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<serde_json::Value>,
}

/// Unsigned transaction in the node's JSON submission format.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRequest {
    pub sender: String,
    pub sequence_number: String,
    pub max_gas_amount: String,
    pub gas_unit_price: String,
    pub expiration_timestamp_secs: String,
    pub payload: EntryFunctionPayload,
}

/// Ed25519 authenticator attached on submission.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionSignature {
    #[serde(rename = "type")]
    pub signature_type: String,
    pub public_key: String,
    pub signature: String,
}

/// Transaction plus authenticator, ready to submit.
#[derive(Debug, Clone, Serialize)]
pub struct SignedTransactionRequest {
    #[serde(flatten)]
    pub request: TransactionRequest,
    pub signature: TransactionSignature,
}

/// Node acknowledgement of a submitted transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct PendingTransaction {
    pub hash: String,
}

/// Transaction as reported by `/transactions/by_hash`.
#[derive(Debug, Clone, Deserialize)]
pub struct OnChainTransaction {
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub hash: String,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub vm_status: Option<String>,
}

impl OnChainTransaction {
    pub fn is_pending(&self) -> bool {
        self.transaction_type == "pending_transaction"
    }
}

#[derive(Debug)]
pub struct AptosClient {
    client: Client,
    node_url: String,
    faucet_url: Option<String>,
}

impl AptosClient {
    pub fn new(node_url: impl Into<String>, faucet_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            node_url: node_url.into(),
            faucet_url,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = format!("{}{}", self.node_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 404 {
            return Err(ClientError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ClientError::Parse(format!("{e}: {body}")))
    }

    async fn post_json<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.node_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| ClientError::Parse(format!("{e}: {text}")))
    }

    /// Look up an account header. `NotFound` means the account does not
    /// exist on-chain.
    pub async fn get_account(&self, address: &str) -> Result<AccountInfo, ClientError> {
        self.get_json(&format!("/accounts/{address}")).await
    }

    /// All resources held by an account.
    pub async fn get_account_resources(
        &self,
        address: &str,
    ) -> Result<Vec<AccountResource>, ClientError> {
        self.get_json(&format!("/accounts/{address}/resources")).await
    }

    /// Ask the faucet to create/fund an account.
    pub async fn fund_account(&self, address: &str, octas: u64) -> Result<(), ClientError> {
        let faucet = self
            .faucet_url
            .as_deref()
            .ok_or_else(|| ClientError::Transport("Faucet URL not configured".to_string()))?;

        let url = format!("{faucet}/mint?amount={octas}&address={address}");
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(())
    }

    /// Ask the node for the signing message of an unsigned transaction.
    /// Returns the hex-encoded BCS bytes to sign.
    pub async fn encode_submission(
        &self,
        request: &TransactionRequest,
    ) -> Result<String, ClientError> {
        self.post_json("/transactions/encode_submission", request).await
    }

    /// Submit a signed transaction.
    pub async fn submit_transaction(
        &self,
        signed: &SignedTransactionRequest,
    ) -> Result<PendingTransaction, ClientError> {
        self.post_json("/transactions", signed).await
    }

    /// Poll until the transaction leaves the pending state.
    ///
    /// A 404 right after submission means the node has not indexed the
    /// transaction yet and counts as pending.
    pub async fn wait_for_transaction(
        &self,
        hash: &str,
    ) -> Result<OnChainTransaction, ClientError> {
        for _ in 0..CONFIRM_MAX_POLLS {
            match self
                .get_json::<OnChainTransaction>(&format!("/transactions/by_hash/{hash}"))
                .await
            {
                Ok(txn) if txn.is_pending() => {}
                Ok(txn) => {
                    if txn.success == Some(false) {
                        return Err(ClientError::Status {
                            status: 400,
                            message: txn
                                .vm_status
                                .unwrap_or_else(|| "transaction rejected".to_string()),
                        });
                    }
                    return Ok(txn);
                }
                Err(ClientError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
            tokio::time::sleep(CONFIRM_POLL_INTERVAL).await;
        }

        Err(ClientError::Transport(format!(
            "transaction {hash} not confirmed after {}s",
            CONFIRM_MAX_POLLS
        )))
    }
}

/// Locate the APT coin store among `resources` and return its balance in
/// octas, if the resource is present.
pub fn coin_store_octas(resources: &[AccountResource]) -> Option<u64> {
    let store = resources.iter().find(|r| r.resource_type == APT_COIN_STORE)?;
    store.data["coin"]["value"].as_str()?.parse().ok()
}

/// Convert octas to whole APT.
pub fn octas_to_apt(octas: u64) -> f64 {
    octas as f64 / OCTAS_PER_APT as f64
}

/// Convert an APT amount to octas, truncating fractional octas.
pub fn apt_to_octas(apt: f64) -> u64 {
    (apt * OCTAS_PER_APT as f64) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource(resource_type: &str, data: serde_json::Value) -> AccountResource {
        AccountResource {
            resource_type: resource_type.to_string(),
            data,
        }
    }

    #[test]
    fn test_coin_store_balance_found() {
        let resources = vec![
            resource("0x1::account::Account", json!({"sequence_number": "3"})),
            resource(APT_COIN_STORE, json!({"coin": {"value": "250000000"}})),
        ];
        assert_eq!(coin_store_octas(&resources), Some(250_000_000));
    }

    #[test]
    fn test_coin_store_absent_means_none() {
        let resources = vec![resource(
            "0x1::account::Account",
            json!({"sequence_number": "3"}),
        )];
        assert_eq!(coin_store_octas(&resources), None);
    }

    #[test]
    fn test_octas_conversion() {
        assert_eq!(octas_to_apt(250_000_000), 2.5);
        assert_eq!(octas_to_apt(0), 0.0);
        assert_eq!(apt_to_octas(1.0), OCTAS_PER_APT);
        assert_eq!(apt_to_octas(0.5), 50_000_000);
    }

    #[test]
    fn test_signed_request_flattens_into_submission_shape() {
        let signed = SignedTransactionRequest {
            request: TransactionRequest {
                sender: "0xa".to_string(),
                sequence_number: "0".to_string(),
                max_gas_amount: "2000".to_string(),
                gas_unit_price: "100".to_string(),
                expiration_timestamp_secs: "1".to_string(),
                payload: EntryFunctionPayload {
                    payload_type: "entry_function_payload".to_string(),
                    function: "0x1::aptos_account::transfer_coins".to_string(),
                    type_arguments: vec!["0x1::aptos_coin::AptosCoin".to_string()],
                    arguments: vec![json!("0xb"), json!("100000000")],
                },
            },
            signature: TransactionSignature {
                signature_type: "ed25519_signature".to_string(),
                public_key: "0xpub".to_string(),
                signature: "0xsig".to_string(),
            },
        };

        let value = serde_json::to_value(&signed).unwrap();
        assert_eq!(value["sender"], "0xa");
        assert_eq!(value["payload"]["type"], "entry_function_payload");
        assert_eq!(value["signature"]["type"], "ed25519_signature");
    }

    #[test]
    fn test_pending_detection() {
        let txn = OnChainTransaction {
            transaction_type: "pending_transaction".to_string(),
            hash: "0x1".to_string(),
            success: None,
            vm_status: None,
        };
        assert!(txn.is_pending());
    }
}
