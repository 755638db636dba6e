//! Basket-IN: free-text shopping request to structured constraints
//!
//! The parser sends the query to a [`ConstraintSource`] (the offline
//! [`RuleSource`] or an OpenAI-compatible [`HttpLlmSource`]), bounds the call
//! with a timeout, and coerces whatever comes back into [`Constraints`].
//!
//! # Example
//!
//! ```ignore
//! use basket_in::ConstraintParser;
//! use std::time::Duration;
//!
//! let parser = ConstraintParser::rules(Duration::from_secs(1));
//! let constraints = parser.parse("ужин на двоих за 1500 без молока").await?;
//! assert_eq!(constraints.people, 2);
//! ```

pub mod coerce;
pub mod entities;
pub mod http;
pub mod normalizer;
pub mod source;

use basket_core::config::{ParserBackend, ParserConfig};
use basket_core::{BasketError, Constraints};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub use http::{HttpLlmConfig, HttpLlmSource};
pub use source::{CapabilityError, ConstraintSource, RuleSource};

/// Why a query could not be turned into constraints
#[derive(Debug, Error)]
pub enum ParseFailure {
    #[error("timeout: no answer from the language capability after {0:?}")]
    Timeout(Duration),

    #[error("unreachable: {0}")]
    Unreachable(#[from] CapabilityError),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl From<ParseFailure> for BasketError {
    fn from(failure: ParseFailure) -> Self {
        BasketError::ParseFailure(failure.to_string())
    }
}

/// Constraint Parser: one bounded capability call per request
#[derive(Clone)]
pub struct ConstraintParser {
    source: Arc<dyn ConstraintSource>,
    timeout: Duration,
}

impl ConstraintParser {
    pub fn new(source: Arc<dyn ConstraintSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Parser backed by the offline rule source
    pub fn rules(timeout: Duration) -> Self {
        Self::new(Arc::new(RuleSource), timeout)
    }

    pub fn from_config(config: &ParserConfig) -> Result<Self, BasketError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        match config.backend {
            ParserBackend::Rules => Ok(Self::rules(timeout)),
            ParserBackend::Http => {
                let endpoint = config.endpoint.clone().ok_or_else(|| {
                    BasketError::ConfigError("parser.endpoint is required for the http backend".into())
                })?;
                let api_key = std::env::var(&config.api_key_env).ok();
                if api_key.is_none() {
                    warn!(env = %config.api_key_env, "no API key set for the http parser");
                }
                let source = HttpLlmSource::new(HttpLlmConfig {
                    endpoint,
                    api_key,
                    model: config.model.clone(),
                    temperature: config.temperature,
                });
                Ok(Self::new(Arc::new(source), timeout))
            }
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Parse a non-empty query into constraints.
    pub async fn parse(&self, query: &str) -> Result<Constraints, ParseFailure> {
        let payload = tokio::time::timeout(self.timeout, self.source.extract(query))
            .await
            .map_err(|_| ParseFailure::Timeout(self.timeout))??;

        debug!(source = self.source.name(), payload = %payload, "constraint payload received");
        coerce::coerce(payload).map_err(ParseFailure::InvalidPayload)
    }
}

impl std::fmt::Debug for ConstraintParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstraintParser")
            .field("source", &self.source.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Slow;

    #[async_trait]
    impl ConstraintSource for Slow {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn extract(&self, _query: &str) -> Result<Value, CapabilityError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(json!({}))
        }
    }

    struct Fixed(Value);

    #[async_trait]
    impl ConstraintSource for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn extract(&self, _query: &str) -> Result<Value, CapabilityError> {
            Ok(self.0.clone())
        }
    }

    struct Down;

    #[async_trait]
    impl ConstraintSource for Down {
        fn name(&self) -> &'static str {
            "down"
        }

        async fn extract(&self, _query: &str) -> Result<Value, CapabilityError> {
            Err(CapabilityError::Http("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_rules_parser() {
        let parser = ConstraintParser::rules(Duration::from_secs(1));
        let c = parser.parse("ужин на двоих за 1500 без молока").await.unwrap();
        assert_eq!(c.people, 2);
        assert_eq!(c.budget_rub, Some(1500.0));
        assert!(c.exclude_tags.contains("dairy"));
        assert!(c.meal_type.contains("dinner"));
    }

    #[tokio::test]
    async fn test_timeout_is_parse_failure() {
        let parser = ConstraintParser::new(Arc::new(Slow), Duration::from_millis(20));
        let err = parser.parse("ужин").await.unwrap_err();
        assert!(matches!(err, ParseFailure::Timeout(_)));
        assert!(BasketError::from(err).is_fatal());
    }

    #[tokio::test]
    async fn test_unreachable_capability() {
        let parser = ConstraintParser::new(Arc::new(Down), Duration::from_secs(1));
        let err = parser.parse("ужин").await.unwrap_err();
        assert!(matches!(err, ParseFailure::Unreachable(_)));
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_invalid_payload() {
        let parser = ConstraintParser::new(Arc::new(Fixed(json!([]))), Duration::from_secs(1));
        assert!(matches!(
            parser.parse("ужин").await.unwrap_err(),
            ParseFailure::InvalidPayload(_)
        ));
    }

    #[test]
    fn test_from_config_http_requires_endpoint() {
        let config = ParserConfig {
            backend: ParserBackend::Http,
            endpoint: None,
            ..ParserConfig::default()
        };
        assert!(ConstraintParser::from_config(&config).is_err());

        let parser = ConstraintParser::from_config(&ParserConfig::default()).unwrap();
        assert_eq!(parser.source_name(), "rules");
        assert_eq!(parser.timeout(), Duration::from_millis(10_000));
    }
}
