//! Constraint sources: capabilities that map free text to a raw constraint payload.
//!
//! A source returns the same JSON object a function-calling language model
//! would produce for `parse_basket_query`; coercion into `Constraints`
//! happens in one place regardless of the source.

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::entities::{extract_entities, Entity};
use crate::normalizer;

/// Errors of the underlying language capability
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("http error: {0}")]
    Http(String),
    #[error("response error: {0}")]
    Response(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[async_trait]
pub trait ConstraintSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn extract(&self, query: &str) -> Result<Value, CapabilityError>;
}

/// Deterministic offline source built on the entity lexicon.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleSource;

impl RuleSource {
    pub fn payload(query: &str) -> Value {
        let normalized = normalizer::normalize(query);

        let mut budget = Value::Null;
        let mut people = Value::Null;
        let mut meal_types = Vec::new();
        let mut exclude = Vec::new();
        let mut include = Vec::new();
        let mut quick = false;

        for entity in extract_entities(&normalized) {
            match entity {
                Entity::Budget(amount) => budget = json!(amount),
                Entity::People(count) => people = json!(count),
                Entity::MealType(meal) => meal_types.push(meal),
                Entity::ExcludeTag(tag) => exclude.push(tag),
                Entity::IncludeTag(tag) => include.push(tag),
                Entity::Quick => quick = true,
            }
        }

        json!({
            "budget_rub": budget,
            "people": people,
            "meal_types": meal_types,
            "exclude_tags": exclude,
            "include_tags": include,
            "prefer_quick": quick,
        })
    }
}

#[async_trait]
impl ConstraintSource for RuleSource {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn extract(&self, query: &str) -> Result<Value, CapabilityError> {
        Ok(Self::payload(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_payload_shape() {
        let payload = RuleSource::payload("Ужин на двоих за 1500 без молока");
        assert_eq!(payload["budget_rub"], 1500.0);
        assert_eq!(payload["people"], 2);
        assert_eq!(payload["meal_types"], json!(["dinner"]));
        assert_eq!(payload["exclude_tags"], json!(["dairy"]));
        assert_eq!(payload["prefer_quick"], false);
    }

    #[test]
    fn test_rule_payload_leaves_unknowns_null() {
        let payload = RuleSource::payload("что-нибудь вкусное");
        assert!(payload["budget_rub"].is_null());
        assert!(payload["people"].is_null());
    }
}
