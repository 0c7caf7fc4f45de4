//! Secret retrieval.
//!
//! Credentials (the wallet signing key, the LLM API key) are fetched once at
//! startup through [`SecretSource`] and handed to the component that needs
//! them. Components never read the environment themselves, and the server
//! keeps no ambient global holding key material.

/// A secret value. `Debug` and `Display` redact the content so key material
/// cannot leak into logs.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the underlying value. Call sites should consume it immediately
    /// (key decoding, request headers) rather than storing the string.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// Source of named secrets.
pub trait SecretSource: Send + Sync {
    /// Fetch a secret by name. `None` means the secret is not configured.
    fn fetch(&self, name: &str) -> Option<Secret>;
}

/// Reads secrets from process environment variables.
pub struct EnvSecrets;

impl SecretSource for EnvSecrets {
    fn fetch(&self, name: &str) -> Option<Secret> {
        std::env::var(name).ok().filter(|v| !v.is_empty()).map(Secret::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_value() {
        let secret = Secret::new("0xdeadbeef");
        assert_eq!(format!("{:?}", secret), "Secret(<redacted>)");
    }

    #[test]
    fn test_env_source_ignores_empty_values() {
        std::env::set_var("APTASK_TEST_EMPTY_SECRET", "");
        assert!(EnvSecrets.fetch("APTASK_TEST_EMPTY_SECRET").is_none());
        std::env::set_var("APTASK_TEST_SECRET", "value");
        assert_eq!(
            EnvSecrets.fetch("APTASK_TEST_SECRET").unwrap().expose(),
            "value"
        );
    }
}
