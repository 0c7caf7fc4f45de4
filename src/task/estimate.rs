//! Cost estimation.
//!
//! Asks the completion model for a 1-10 complexity score for a task
//! description. Standalone operation: task creation takes the cost from the
//! caller and never consults the estimator.

use std::sync::Arc;

use crate::llm::{ChatMessage, LlmClient, LlmError, Role};

const ESTIMATE_SYSTEM_PROMPT: &str =
    "Analyze the task complexity and estimate cost in APT tokens (1-10).";

/// Minimum cost, also the fallback when the model cannot be consulted.
const MIN_COST: f64 = 1.0;
const MAX_COST: f64 = 10.0;

/// Estimates task cost via the completion model.
pub struct CostEstimator {
    llm: Arc<dyn LlmClient>,
    model: String,
}

impl CostEstimator {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Estimate the cost of a task in APT, clamped to [1, 10].
    ///
    /// Transient upstream failures and unparseable replies fall back to the
    /// minimum cost. Client errors (bad request, bad credentials) propagate:
    /// defaulting over those would hide a misconfigured key behind a
    /// plausible estimate.
    pub async fn estimate(&self, description: &str) -> Result<f64, LlmError> {
        let messages = vec![
            ChatMessage::new(Role::System, ESTIMATE_SYSTEM_PROMPT),
            ChatMessage::new(Role::User, description),
        ];

        let reply = match self.llm.chat_completion(&self.model, &messages).await {
            Ok(response) => response.content.unwrap_or_default(),
            Err(e) if e.is_transient() => {
                tracing::warn!("Cost estimation unavailable, using minimum: {}", e);
                return Ok(MIN_COST);
            }
            Err(e) => return Err(e),
        };

        Ok(parse_cost(&reply).unwrap_or(MIN_COST))
    }
}

/// Pull the first numeric token out of the model's reply and clamp it.
fn parse_cost(reply: &str) -> Option<f64> {
    let token = reply
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .find(|t| !t.is_empty())?;
    let value: f64 = token.parse().ok()?;
    Some(value.clamp(MIN_COST, MAX_COST))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatResponse, LlmErrorKind};
    use async_trait::async_trait;

    /// LlmClient that replies with canned content or a canned error.
    struct FixedClient(Result<Option<String>, LlmErrorKind>);

    #[async_trait]
    impl LlmClient for FixedClient {
        async fn chat_completion(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
        ) -> Result<ChatResponse, LlmError> {
            match &self.0 {
                Ok(content) => Ok(ChatResponse {
                    content: content.clone(),
                }),
                Err(LlmErrorKind::NetworkError) => {
                    Err(LlmError::network_error("connection refused".into()))
                }
                Err(_) => Err(LlmError::client_error(401, "bad key".into())),
            }
        }
    }

    fn estimator(reply: Result<Option<String>, LlmErrorKind>) -> CostEstimator {
        CostEstimator::new(Arc::new(FixedClient(reply)), "gpt-4")
    }

    #[tokio::test]
    async fn test_numeric_reply_parsed() {
        let cost = estimator(Ok(Some("7".into()))).estimate("swap").await.unwrap();
        assert_eq!(cost, 7.0);
    }

    #[tokio::test]
    async fn test_reply_with_prose_parsed() {
        let cost = estimator(Ok(Some("I'd estimate 4.5 APT for this".into())))
            .estimate("nft")
            .await
            .unwrap();
        assert_eq!(cost, 4.5);
    }

    #[tokio::test]
    async fn test_clamped_to_range() {
        assert_eq!(
            estimator(Ok(Some("42".into()))).estimate("x").await.unwrap(),
            10.0
        );
        assert_eq!(
            estimator(Ok(Some("0".into()))).estimate("x").await.unwrap(),
            1.0
        );
    }

    #[tokio::test]
    async fn test_unparseable_reply_defaults_to_minimum() {
        let cost = estimator(Ok(Some("hard to say".into())))
            .estimate("x")
            .await
            .unwrap();
        assert_eq!(cost, 1.0);
    }

    #[tokio::test]
    async fn test_empty_reply_defaults_to_minimum() {
        assert_eq!(estimator(Ok(None)).estimate("x").await.unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_transient_failure_defaults_to_minimum() {
        let cost = estimator(Err(LlmErrorKind::NetworkError))
            .estimate("x")
            .await
            .unwrap();
        assert_eq!(cost, 1.0);
    }

    #[tokio::test]
    async fn test_auth_failure_propagates() {
        let err = estimator(Err(LlmErrorKind::ClientError))
            .estimate("x")
            .await
            .unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::ClientError);
    }
}
