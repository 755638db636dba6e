//! Configuration: YAML file with every field defaulted, then environment overrides
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::BasketError;

/// Default location of the optional config file
pub const DEFAULT_CONFIG_PATH: &str = "config/basket.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasketConfig {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub parser: ParserConfig,
    pub selection: SelectionConfig,
    pub budget: BudgetConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    /// Allowed CORS origins; empty means permissive
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8787".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: "testing/fixtures/catalog.yaml".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserBackend {
    /// Offline lexicon extraction
    Rules,
    /// OpenAI-compatible function calling
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub backend: ParserBackend,
    pub timeout_ms: u64,
    pub endpoint: Option<String>,
    pub model: String,
    pub temperature: f32,
    /// Name of the env var holding the API key
    pub api_key_env: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            backend: ParserBackend::Rules,
            timeout_ms: 10_000,
            endpoint: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

/// How the compatibility agent picks a product for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Lowest unit price, ties by product id
    Cheapest,
    /// Highest rating, then lowest unit price, then product id
    TopRated,
}

impl SelectionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cheapest => "cheapest",
            Self::TopRated => "top_rated",
        }
    }
}

/// Which side wins when a tag is both included and excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagPrecedence {
    ExcludeWins,
    IncludeWins,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub strategy: SelectionStrategy,
    pub tag_precedence: TagPrecedence,
    /// Meal type assumed when the request names none
    pub default_meal_type: String,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            strategy: SelectionStrategy::Cheapest,
            tag_precedence: TagPrecedence::ExcludeWins,
            default_meal_type: "dinner".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Minimum relative unit-price drop a substitute must offer (0.0..1.0)
    pub min_discount: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self { min_discount: 0.0 }
    }
}

impl BasketConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, BasketError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| BasketError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, BasketError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BasketError::ConfigError(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Load from `BASKET_CONFIG` (or the default path when it exists), then apply env overrides.
    pub fn from_env() -> Result<Self, BasketError> {
        let mut config = match std::env::var("BASKET_CONFIG") {
            Ok(path) => Self::load(path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(DEFAULT_CONFIG_PATH)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), BasketError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("BASKET_ADDR") {
            self.server.addr = addr;
        }
        if let Some(path) = lookup("BASKET_CATALOG") {
            self.catalog.path = path;
        }
        if let Some(raw) = lookup("BASKET_PARSER_TIMEOUT_MS") {
            self.parser.timeout_ms = raw.trim().parse().map_err(|_| {
                BasketError::ConfigError(format!("BASKET_PARSER_TIMEOUT_MS is not a number: {}", raw))
            })?;
        }
        if let Some(endpoint) = lookup("BASKET_LLM_ENDPOINT") {
            self.parser.endpoint = Some(endpoint);
            self.parser.backend = ParserBackend::Http;
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), BasketError> {
        if self.parser.timeout_ms == 0 {
            return Err(BasketError::ConfigError("parser.timeout_ms must be positive".into()));
        }
        if !(0.0..1.0).contains(&self.budget.min_discount) {
            return Err(BasketError::ConfigError(format!(
                "budget.min_discount must be in [0, 1), got {}",
                self.budget.min_discount
            )));
        }
        if self.parser.backend == ParserBackend::Http && self.parser.endpoint.is_none() {
            return Err(BasketError::ConfigError(
                "parser.endpoint is required for the http backend".into(),
            ));
        }
        Ok(())
    }
}
