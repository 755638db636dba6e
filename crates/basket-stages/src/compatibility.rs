//! Compatibility Agent: scenario choice and per-role product selection.
use basket_core::data_model::{round_money, CompatibilityResult, ScenarioUsed};
use basket_core::{
    AgentId, Basket, BasketItem, Catalog, Constraints, Diagnostic, ExecutionContext, Product,
    Scenario, SelectionStrategy, Stage, StageError, StageResult, TagFilter, TagPrecedence,
};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Outcome of a selection: the basket plus what it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub basket: Basket,
    pub scenario: Scenario,
    pub people: u32,
    /// Tag filter the products were admitted with
    pub filter: TagFilter,
    pub coherence_score: f64,
    pub diagnostics: Vec<Diagnostic>,
}

impl Selection {
    pub fn unfilled_roles(&self) -> Vec<String> {
        self.diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::UnfilledRole { role } => Some(role.clone()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct CompatibilityAgent {
    strategy: SelectionStrategy,
    precedence: TagPrecedence,
    default_meal_type: String,
}

impl Default for CompatibilityAgent {
    fn default() -> Self {
        Self::new(SelectionStrategy::Cheapest, TagPrecedence::ExcludeWins, "dinner")
    }
}

impl CompatibilityAgent {
    pub fn new(
        strategy: SelectionStrategy,
        precedence: TagPrecedence,
        default_meal_type: impl Into<String>,
    ) -> Self {
        Self {
            strategy,
            precedence,
            default_meal_type: default_meal_type.into(),
        }
    }

    pub fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }

    /// Meal types to match; falls back to the default when none were requested.
    pub fn requested_meal_types(&self, constraints: &Constraints) -> BTreeSet<String> {
        if constraints.meal_type.is_empty() {
            BTreeSet::from([self.default_meal_type.clone()])
        } else {
            constraints.meal_type.clone()
        }
    }

    pub fn select(&self, constraints: &Constraints, catalog: &Catalog) -> Result<Selection, StageError> {
        let meal_types = self.requested_meal_types(constraints);
        let filter = constraints.tag_filter(self.precedence);

        let conflicts = constraints.conflicting_tags();
        if !conflicts.is_empty() {
            warn!(tags = ?conflicts, precedence = ?self.precedence, "tags both included and excluded");
        }

        let scenario = self
            .choose_scenario(constraints, &meal_types, &filter, catalog)
            .ok_or_else(|| {
                StageError::NoScenarioMatch(meal_types.iter().cloned().collect::<Vec<_>>().join(", "))
            })?;

        let mut basket = Basket::new();
        let mut diagnostics = Vec::new();
        for role in &scenario.required_roles {
            match self.pick(catalog, role, &filter) {
                Some(product) => {
                    let quantity = constraints.people as f64 * scenario.quantity_per_person(role);
                    let reason = format!(
                        "{} match for role '{}' in {}",
                        self.strategy.as_str(),
                        role,
                        scenario.name
                    );
                    basket.push(BasketItem::from_product(product, quantity, AgentId::Compatibility, reason));
                }
                None => {
                    debug!(role = %role, scenario = %scenario.name, "no admissible product for role");
                    diagnostics.push(Diagnostic::UnfilledRole { role: role.clone() });
                }
            }
        }

        Ok(Selection {
            coherence_score: coherence_score(&basket, catalog),
            basket,
            scenario: scenario.clone(),
            people: constraints.people,
            filter,
            diagnostics,
        })
    }

    fn choose_scenario<'a>(
        &self,
        constraints: &Constraints,
        meal_types: &BTreeSet<String>,
        filter: &TagFilter,
        catalog: &'a Catalog,
    ) -> Option<&'a Scenario> {
        catalog
            .scenarios()
            .iter()
            .filter(|s| !s.meal_types.is_disjoint(meal_types))
            .filter(|s| s.required_roles.iter().any(|r| catalog.has_stock(r)))
            .map(|s| {
                let unmet = s
                    .required_roles
                    .iter()
                    .filter(|r| self.pick(catalog, r, filter).is_none())
                    .count();
                (scenario_rank(s, constraints, meal_types), unmet, s)
            })
            .min_by(|(rank_a, unmet_a, a), (rank_b, unmet_b, b)| {
                rank_b
                    .cmp(rank_a)
                    .then(unmet_a.cmp(unmet_b))
                    .then_with(|| a.name.cmp(&b.name))
            })
            .map(|(_, _, s)| s)
    }

    /// Best admissible product for a role under the configured strategy.
    pub fn pick<'a>(&self, catalog: &'a Catalog, role: &str, filter: &TagFilter) -> Option<&'a Product> {
        let mut admissible = catalog
            .products_for_role(role)
            .filter(|p| filter.admits(&p.tags));
        match self.strategy {
            // products_for_role is already ordered by (price, id)
            SelectionStrategy::Cheapest => admissible.next(),
            SelectionStrategy::TopRated => admissible.min_by(|a, b| top_rated_order(a, b)),
        }
    }
}

fn scenario_rank(scenario: &Scenario, constraints: &Constraints, meal_types: &BTreeSet<String>) -> usize {
    let mut rank = scenario.meal_types.intersection(meal_types).count();
    if scenario.serves(constraints.people) {
        rank += 1;
    }
    if constraints.prefer_quick && scenario.tags.contains("quick") {
        rank += 1;
    }
    rank
}

fn top_rated_order(a: &Product, b: &Product) -> Ordering {
    let rating = |p: &Product| p.rating.unwrap_or(f64::NEG_INFINITY);
    rating(b)
        .total_cmp(&rating(a))
        .then(a.price_per_unit.total_cmp(&b.price_per_unit))
        .then(a.id.cmp(&b.id))
}

/// Mean pairwise Jaccard similarity of item tag sets, scaled to 0..=10.
pub fn coherence_score(basket: &Basket, catalog: &Catalog) -> f64 {
    let tag_sets: Vec<&BTreeSet<String>> = basket
        .iter()
        .filter_map(|item| catalog.product(item.id))
        .map(|p| &p.tags)
        .collect();
    if tag_sets.len() < 2 {
        return 0.0;
    }

    let mut total = 0.0;
    let mut pairs = 0usize;
    for (i, a) in tag_sets.iter().enumerate() {
        for b in &tag_sets[i + 1..] {
            let union = a.union(b).count();
            if union > 0 {
                total += a.intersection(b).count() as f64 / union as f64;
            }
            pairs += 1;
        }
    }
    round_money(total / pairs as f64 * 10.0)
}

impl Stage for CompatibilityAgent {
    type Input = Constraints;
    type Output = Selection;

    fn agent(&self) -> AgentId {
        AgentId::Compatibility
    }

    fn run(&self, input: Constraints, ctx: &ExecutionContext) -> Result<Selection, StageError> {
        self.select(&input, &ctx.catalog.catalog)
    }

    fn report(&self, output: &Selection) -> StageResult {
        StageResult::Compatibility(CompatibilityResult {
            basket: output.basket.clone(),
            scenario: ScenarioUsed {
                name: output.scenario.name.clone(),
                meal_types: output.scenario.meal_types.iter().cloned().collect(),
                required_roles: output.scenario.required_roles.clone(),
                people: output.people,
            },
            compatibility_score: output.coherence_score,
            total_price: output.basket.total_price(),
            success: output.diagnostics.is_empty(),
            diagnostics: output.diagnostics.clone(),
        })
    }
}
