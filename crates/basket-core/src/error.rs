//! Unified Error Model
use thiserror::Error;

use crate::stage::StageError;

/// Request-level failures. Only `ParseFailure` and `NoScenarioMatch` can stop
/// a running pipeline; `EmptyQuery` is rejected before it starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BasketError {
    #[error("QUERY/EMPTY: field 'query' is required")]
    EmptyQuery,

    #[error("PARSE/{0}")]
    ParseFailure(String),

    #[error("SCENARIO/{0}")]
    NoScenarioMatch(String),

    #[error("CATALOG/{0}")]
    CatalogError(String),

    #[error("CONFIG/{0}")]
    ConfigError(String),

    #[error("INTERNAL/{0}")]
    Internal(String),
}

impl From<StageError> for BasketError {
    fn from(error: StageError) -> Self {
        match error {
            StageError::NoScenarioMatch(meal) => {
                BasketError::NoScenarioMatch(format!("NO_MATCH: no scenario matches meal type {}", meal))
            }
            other => BasketError::Internal(other.to_string()),
        }
    }
}

impl BasketError {
    /// Stable kind reported as `type` in the error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyQuery => "EmptyQuery",
            Self::ParseFailure(_) => "ParseFailure",
            Self::NoScenarioMatch(_) => "NoScenarioMatch",
            Self::CatalogError(_) => "CatalogError",
            Self::ConfigError(_) => "ConfigError",
            Self::Internal(_) => "Internal",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ParseFailure(_) | Self::NoScenarioMatch(_))
    }
}
