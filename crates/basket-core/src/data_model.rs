//! Data Model: Constraints, catalog entities, Basket and the response envelope
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::config::{SelectionStrategy, TagPrecedence};
use crate::labels;

pub type ProductId = u64;

/// Round a ruble amount to kopecks.
pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round_quantity(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

// ============================================================================
// CONSTRAINTS
// ============================================================================

/// Structured shopping constraints produced once per request by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Budget ceiling in rubles; `None` means unconstrained
    pub budget_rub: Option<f64>,
    /// Party size, at least 1
    pub people: u32,
    pub meal_type: BTreeSet<String>,
    pub exclude_tags: BTreeSet<String>,
    pub include_tags: BTreeSet<String>,
    pub prefer_quick: bool,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            budget_rub: None,
            people: 1,
            meal_type: BTreeSet::new(),
            exclude_tags: BTreeSet::new(),
            include_tags: BTreeSet::new(),
            prefer_quick: false,
        }
    }
}

impl Constraints {
    /// Resolve the include/exclude overlap into the filter agents select with.
    pub fn tag_filter(&self, precedence: TagPrecedence) -> TagFilter {
        let mut include = self.include_tags.clone();
        let mut exclude = self.exclude_tags.clone();
        match precedence {
            TagPrecedence::ExcludeWins => include.retain(|t| !self.exclude_tags.contains(t)),
            TagPrecedence::IncludeWins => exclude.retain(|t| !self.include_tags.contains(t)),
        }
        TagFilter { include, exclude }
    }

    /// Tags named in both `include_tags` and `exclude_tags`.
    pub fn conflicting_tags(&self) -> Vec<String> {
        self.include_tags.intersection(&self.exclude_tags).cloned().collect()
    }
}

/// Include/exclude tag sets with the overlap already resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    pub include: BTreeSet<String>,
    pub exclude: BTreeSet<String>,
}

impl TagFilter {
    pub fn admits(&self, tags: &BTreeSet<String>) -> bool {
        self.include.is_subset(tags) && self.exclude.is_disjoint(tags)
    }
}

// ============================================================================
// CATALOG ENTITIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price_per_unit: f64,
    pub unit: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Scenario slot this product can fill
    pub ingredient_role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

/// Template of the roles a basket for a meal type must contain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub meal_types: BTreeSet<String>,
    pub required_roles: Vec<String>,
    /// Quantity per person for each role, in the product's unit (default 1.0)
    #[serde(default)]
    pub portions: BTreeMap<String, f64>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_people: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_people: Option<u32>,
}

impl Scenario {
    pub fn quantity_per_person(&self, role: &str) -> f64 {
        self.portions.get(role).copied().unwrap_or(1.0)
    }

    pub fn serves(&self, people: u32) -> bool {
        self.min_people.map_or(true, |min| people >= min)
            && self.max_people.map_or(true, |max| people <= max)
    }
}

// ============================================================================
// BASKET
// ============================================================================

/// Closed set of pipeline agents. The identifiers are part of the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentId {
    LlmParser,
    Compatibility,
    Budget,
    Profile,
}

impl AgentId {
    pub const ALL: [AgentId; 4] = [
        AgentId::LlmParser,
        AgentId::Compatibility,
        AgentId::Budget,
        AgentId::Profile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LlmParser => "llm_parser",
            Self::Compatibility => "compatibility",
            Self::Budget => "budget",
            Self::Profile => "profile",
        }
    }

    pub fn label(&self) -> &'static str {
        labels::label_for(*self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketItem {
    pub id: ProductId,
    pub name: String,
    pub reason: String,
    /// Stage that last touched or justified this item
    pub agent: AgentId,
    /// Unit price as shown to the user
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    pub ingredient_role: String,
    pub quantity: f64,
    pub unit: String,
    pub price_per_unit: f64,
    pub total_price: f64,
}

impl BasketItem {
    pub fn from_product(
        product: &Product,
        quantity: f64,
        agent: AgentId,
        reason: impl Into<String>,
    ) -> Self {
        let quantity = round_quantity(quantity);
        Self {
            id: product.id,
            name: product.name.clone(),
            reason: reason.into(),
            agent,
            price: product.price_per_unit,
            rating: product.rating,
            ingredient_role: product.ingredient_role.clone(),
            quantity,
            unit: product.unit.clone(),
            price_per_unit: product.price_per_unit,
            total_price: round_money(quantity * product.price_per_unit),
        }
    }

    /// Swap the product behind this item, keeping its role and quantity.
    pub fn replace_product(&mut self, product: &Product, agent: AgentId, reason: impl Into<String>) {
        *self = Self::from_product(product, self.quantity, agent, reason);
    }
}

/// Ordered basket, at most one item per role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Basket {
    pub items: Vec<BasketItem>,
}

impl Basket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item; returns `false` (and leaves the basket unchanged) when its role is already filled.
    pub fn push(&mut self, item: BasketItem) -> bool {
        if self.has_role(&item.ingredient_role) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.items.iter().any(|i| i.ingredient_role == role)
    }

    pub fn total_price(&self) -> f64 {
        round_money(self.items.iter().map(|i| i.total_price).sum())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BasketItem> {
        self.items.iter()
    }
}

/// Append-only log entry of one budget substitution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replacement {
    #[serde(rename = "from")]
    pub from_product_id: ProductId,
    #[serde(rename = "to")]
    pub to_product_id: ProductId,
    pub from_name: String,
    pub to_name: String,
    pub saved: f64,
    pub old_price: f64,
    pub new_price: f64,
    pub quantity: f64,
}

/// Non-fatal anomaly surfaced in stage results and the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    UnfilledRole { role: String },
    BudgetNotMet { total_price: f64, budget_rub: f64, overspend: f64 },
}

// ============================================================================
// STAGE RECORDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Completed,
    Failed,
}

/// Scenario as reported by the compatibility stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioUsed {
    pub name: String,
    pub meal_types: Vec<String>,
    pub required_roles: Vec<String>,
    pub people: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParserResult {
    pub parsed: Constraints,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompatibilityResult {
    pub basket: Basket,
    pub scenario: ScenarioUsed,
    pub compatibility_score: f64,
    pub total_price: f64,
    pub success: bool,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetResult {
    pub basket: Basket,
    pub replacements: Vec<Replacement>,
    pub saved: f64,
    pub within_budget: bool,
    pub optimized: bool,
    pub total_price: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileResult {
    pub basket: Basket,
    pub personalized: bool,
    pub message: String,
}

/// Stage payload, one variant per agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StageResult {
    LlmParser(ParserResult),
    Compatibility(CompatibilityResult),
    Budget(BudgetResult),
    Profile(ProfileResult),
}

impl StageResult {
    pub fn agent(&self) -> AgentId {
        match self {
            Self::LlmParser(_) => AgentId::LlmParser,
            Self::Compatibility(_) => AgentId::Compatibility,
            Self::Budget(_) => AgentId::Budget,
            Self::Profile(_) => AgentId::Profile,
        }
    }
}

/// Timed, status-tagged log entry for one pipeline step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRecord {
    pub agent: AgentId,
    pub name: String,
    pub status: StageStatus,
    /// Elapsed seconds
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<StageResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn seconds(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0).round() / 1000.0
}

impl StageRecord {
    pub fn completed(result: StageResult, elapsed: Duration) -> Self {
        let agent = result.agent();
        Self {
            agent,
            name: agent.label().to_string(),
            status: StageStatus::Completed,
            duration: seconds(elapsed),
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(agent: AgentId, elapsed: Duration, error: impl Into<String>) -> Self {
        Self {
            agent,
            name: agent.label().to_string(),
            status: StageStatus::Failed,
            duration: seconds(elapsed),
            result: None,
            error: Some(error.into()),
        }
    }
}

// ============================================================================
// RESPONSE ENVELOPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_price: f64,
    pub original_price: f64,
    pub savings: f64,
    pub within_budget: bool,
    pub budget_rub: Option<f64>,
    pub items_count: usize,
    pub unfilled_roles: Vec<String>,
    pub execution_time_sec: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub scenario_used: String,
    pub people: u32,
    pub meal_types: Vec<String>,
    pub strategy: SelectionStrategy,
}

/// Final envelope returned to the caller; field names are a wire contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    pub status: PipelineStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    pub basket: Basket,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    pub parsed: Option<Constraints>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    pub stages: Vec<StageRecord>,
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        self.status == PipelineStatus::Success
    }

    pub fn stage(&self, agent: AgentId) -> Option<&StageRecord> {
        self.stages.iter().find(|s| s.agent == agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn product(id: ProductId, price: f64, role: &str) -> Product {
        Product {
            id,
            name: format!("p{}", id),
            price_per_unit: price,
            unit: "kg".to_string(),
            tags: tags(&["vegan"]),
            ingredient_role: role.to_string(),
            rating: Some(4.5),
        }
    }

    #[test]
    fn test_tag_filter_exclude_wins() {
        let constraints = Constraints {
            include_tags: tags(&["vegan", "dairy"]),
            exclude_tags: tags(&["dairy"]),
            ..Default::default()
        };
        let filter = constraints.tag_filter(TagPrecedence::ExcludeWins);
        assert_eq!(filter.include, tags(&["vegan"]));
        assert_eq!(filter.exclude, tags(&["dairy"]));
        assert!(!filter.admits(&tags(&["vegan", "dairy"])));
        assert!(filter.admits(&tags(&["vegan"])));
        assert_eq!(constraints.conflicting_tags(), vec!["dairy".to_string()]);
    }

    #[test]
    fn test_tag_filter_include_wins() {
        let constraints = Constraints {
            include_tags: tags(&["dairy"]),
            exclude_tags: tags(&["dairy", "meat"]),
            ..Default::default()
        };
        let filter = constraints.tag_filter(TagPrecedence::IncludeWins);
        assert!(filter.admits(&tags(&["dairy"])));
        assert!(!filter.admits(&tags(&["dairy", "meat"])));
    }

    #[test]
    fn test_basket_item_totals() {
        let item = BasketItem::from_product(&product(1, 85.5, "milk"), 2.0, AgentId::Compatibility, "x");
        assert_eq!(item.total_price, 171.0);
        assert_eq!(item.price, 85.5);

        let mut basket = Basket::new();
        assert!(basket.push(item.clone()));
        assert!(!basket.push(item));
        assert!(basket.push(BasketItem::from_product(&product(2, 45.0, "bread"), 1.0, AgentId::Compatibility, "y")));
        assert_eq!(basket.total_price(), 216.0);
    }

    #[test]
    fn test_replace_keeps_role_and_quantity() {
        let mut item = BasketItem::from_product(&product(1, 300.0, "protein"), 0.5, AgentId::Compatibility, "x");
        item.replace_product(&product(2, 100.0, "protein"), AgentId::Budget, "cheaper");
        assert_eq!(item.id, 2);
        assert_eq!(item.quantity, 0.5);
        assert_eq!(item.total_price, 50.0);
        assert_eq!(item.agent, AgentId::Budget);
    }

    #[test]
    fn test_stage_record_wire_shape() {
        let record = StageRecord::completed(
            StageResult::LlmParser(ParserResult { parsed: Constraints::default() }),
            Duration::from_millis(1234),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["agent"], "llm_parser");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["duration"], 1.234);
        assert_eq!(json["result"]["parsed"]["people"], 1);
        assert!(json.get("error").is_none());

        let failed = StageRecord::failed(AgentId::Compatibility, Duration::ZERO, "boom");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
        assert!(json.get("result").is_none());
    }

    #[test]
    fn test_replacement_wire_names() {
        let replacement = Replacement {
            from_product_id: 3,
            to_product_id: 4,
            from_name: "a".into(),
            to_name: "b".into(),
            saved: 10.0,
            old_price: 20.0,
            new_price: 10.0,
            quantity: 1.0,
        };
        let json = serde_json::to_value(&replacement).unwrap();
        assert_eq!(json["from"], 3);
        assert_eq!(json["to"], 4);
    }
}
