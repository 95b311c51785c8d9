//! Provider client configuration.

use std::time::Duration;

use crate::error::{ProviderError, ProviderResult};

const DEFAULT_API_URL: &str = "https://smmbox.com/api/";

/// Configuration for the publishing provider client.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API root URL, always with a trailing slash
    pub api_url: String,
    /// Bearer token for the provider API
    pub api_token: String,
    /// Overall request timeout
    pub timeout: Duration,
    /// Connection establishment timeout
    pub connect_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: String::new(),
            timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl ProviderConfig {
    /// Create a config with an explicit API root and token.
    pub fn new(api_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            api_url: normalize_api_url(&api_url.into()),
            api_token: api_token.into(),
            ..Default::default()
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            api_url: normalize_api_url(
                &std::env::var("PUBLISH_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            ),
            api_token: std::env::var("PUBLISH_API_TOKEN").unwrap_or_default(),
            timeout: Duration::from_secs(
                std::env::var("PUBLISH_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            connect_timeout: Duration::from_secs(
                std::env::var("PUBLISH_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Bearer token with surrounding whitespace and stray quotes removed.
    ///
    /// Tokens pasted into env files tend to pick up both.
    pub fn clean_token(&self) -> ProviderResult<String> {
        let token = self
            .api_token
            .trim()
            .trim_matches('"')
            .trim_matches('\'')
            .trim();
        if token.is_empty() {
            return Err(ProviderError::MissingToken);
        }
        Ok(token.to_string())
    }
}

/// Ensure the API root ends with a slash so endpoint joins behave.
fn normalize_api_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ProviderConfig::default();
        assert_eq!(config.api_url, "https://smmbox.com/api/");
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_api_url_gets_trailing_slash() {
        let config = ProviderConfig::new("http://localhost:9000/api", "tok");
        assert_eq!(config.api_url, "http://localhost:9000/api/");

        let config = ProviderConfig::new("http://localhost:9000/api/", "tok");
        assert_eq!(config.api_url, "http://localhost:9000/api/");
    }

    #[test]
    fn test_clean_token_strips_quotes_and_whitespace() {
        let config = ProviderConfig::new("http://x/", "  \"secret-token\"  ");
        assert_eq!(config.clean_token().unwrap(), "secret-token");

        let config = ProviderConfig::new("http://x/", "'secret-token'");
        assert_eq!(config.clean_token().unwrap(), "secret-token");
    }

    #[test]
    fn test_clean_token_rejects_empty() {
        let config = ProviderConfig::new("http://x/", "  \"\" ");
        assert!(matches!(
            config.clean_token(),
            Err(ProviderError::MissingToken)
        ));
    }
}
