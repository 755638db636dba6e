//! Payload coercion: raw capability JSON to `Constraints`.
//!
//! Missing fields take schema defaults. Only payloads with the wrong shape
//! (not an object, wrongly typed fields) are rejected.

use basket_core::Constraints;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;

/// Budgets above this are treated as unset
pub const MAX_BUDGET_RUB: f64 = 10_000_000.0;

/// Largest party size accepted
pub const MAX_PEOPLE: u32 = 100;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_tags(self) -> BTreeSet<String> {
        let raw = match self {
            Self::One(tag) => vec![tag],
            Self::Many(tags) => tags,
        };
        raw.into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConstraints {
    budget_rub: Option<Value>,
    people: Option<Value>,
    meal_type: Option<OneOrMany>,
    meal_types: Option<OneOrMany>,
    exclude_tags: Option<OneOrMany>,
    include_tags: Option<OneOrMany>,
    prefer_quick: Option<bool>,
}

/// Coerce a raw payload into `Constraints`, or describe why it cannot be.
pub fn coerce(payload: Value) -> Result<Constraints, String> {
    if !payload.is_object() {
        return Err(format!("expected a JSON object, got {}", kind_of(&payload)));
    }
    let raw: RawConstraints = serde_json::from_value(payload).map_err(|e| e.to_string())?;

    Ok(Constraints {
        budget_rub: raw.budget_rub.as_ref().and_then(budget),
        people: raw.people.as_ref().map_or(1, people),
        meal_type: [raw.meal_type, raw.meal_types]
            .into_iter()
            .flatten()
            .flat_map(OneOrMany::into_tags)
            .collect(),
        exclude_tags: raw.exclude_tags.map(OneOrMany::into_tags).unwrap_or_default(),
        include_tags: raw.include_tags.map(OneOrMany::into_tags).unwrap_or_default(),
        prefer_quick: raw.prefer_quick.unwrap_or(false),
    })
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

fn budget(value: &Value) -> Option<f64> {
    number(value).filter(|b| b.is_finite() && *b > 0.0 && *b <= MAX_BUDGET_RUB)
}

fn people(value: &Value) -> u32 {
    match number(value) {
        Some(n) if n.is_finite() && n >= 1.0 => n.round().min(MAX_PEOPLE as f64) as u32,
        _ => 1,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_payload() {
        let c = coerce(json!({
            "budget_rub": 1500,
            "people": 2,
            "meal_types": ["Dinner "],
            "exclude_tags": ["dairy", "DAIRY"],
            "include_tags": [],
            "prefer_quick": true
        }))
        .unwrap();
        assert_eq!(c.budget_rub, Some(1500.0));
        assert_eq!(c.people, 2);
        assert!(c.meal_type.contains("dinner"));
        assert_eq!(c.exclude_tags.len(), 1);
        assert!(c.prefer_quick);
    }

    #[test]
    fn test_both_meal_type_keys_are_merged() {
        let c = coerce(json!({ "meal_type": ["dinner"], "meal_types": ["Dinner", "lunch"] })).unwrap();
        assert_eq!(c.meal_type.len(), 2);
        assert!(c.meal_type.contains("dinner"));
        assert!(c.meal_type.contains("lunch"));
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let c = coerce(json!({})).unwrap();
        assert_eq!(c, Constraints::default());
    }

    #[test]
    fn test_out_of_range_values_normalized() {
        let c = coerce(json!({ "budget_rub": -5, "people": 0 })).unwrap();
        assert_eq!(c.budget_rub, None);
        assert_eq!(c.people, 1);

        let c = coerce(json!({ "budget_rub": 1e12, "people": 2.6 })).unwrap();
        assert_eq!(c.budget_rub, None);
        assert_eq!(c.people, 3);

        let c = coerce(json!({ "budget_rub": null, "people": 5000 })).unwrap();
        assert_eq!(c.budget_rub, None);
        assert_eq!(c.people, MAX_PEOPLE);
    }

    #[test]
    fn test_single_string_tags() {
        let c = coerce(json!({ "meal_type": "breakfast", "exclude_tags": "sugar" })).unwrap();
        assert!(c.meal_type.contains("breakfast"));
        assert!(c.exclude_tags.contains("sugar"));
    }

    #[test]
    fn test_structurally_invalid_payloads() {
        assert!(coerce(json!([1, 2])).unwrap_err().contains("an array"));
        assert!(coerce(json!("dinner")).is_err());
        assert!(coerce(json!({ "exclude_tags": 42 })).is_err());
        assert!(coerce(json!({ "prefer_quick": "yes" })).is_err());
    }
}
