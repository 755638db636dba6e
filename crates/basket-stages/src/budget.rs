//! Budget Agent: greedy substitution until the basket fits the budget.
//!
//! The heuristic is deliberately simple and not globally optimal. While the
//! basket total exceeds the budget, it takes the item with the highest
//! `total_price` that still has a cheaper admissible substitute (ties by lower
//! product id) and swaps it for the cheapest such substitute (ties by id).
//! Every swap strictly lowers the total, so the loop always terminates.

use basket_core::data_model::{round_money, BudgetResult};
use basket_core::{
    AgentId, Basket, Catalog, Diagnostic, ExecutionContext, Product, Replacement, Stage,
    StageError, StageResult, TagFilter,
};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Input of one fitting run
#[derive(Debug, Clone)]
pub struct BudgetRequest {
    pub basket: Basket,
    pub budget_rub: Option<f64>,
    /// Same tag filter the basket was selected with
    pub filter: TagFilter,
}

/// Outcome of one fitting run
#[derive(Debug, Clone, PartialEq)]
pub struct Fit {
    pub basket: Basket,
    pub replacements: Vec<Replacement>,
    pub saved: f64,
    pub within_budget: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Fit {
    fn unchanged(basket: Basket, within_budget: bool) -> Self {
        Self {
            basket,
            replacements: Vec::new(),
            saved: 0.0,
            within_budget,
            errors: Vec::new(),
            warnings: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Stand-in result when fitting failed: the basket as selected, checked
    /// against the budget, with `error` reported.
    pub fn fallback(basket: Basket, budget_rub: Option<f64>, error: String) -> Self {
        let check = budget_rub.map(|budget| check_budget(&basket, budget));
        let mut fit = Self::unchanged(basket, check.map_or(true, |c| c.fits));
        fit.errors.push(error);
        fit.diagnostics = check.as_ref().map(over_budget).unwrap_or_default();
        fit
    }
}

/// Result of comparing a basket against a budget
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetCheck {
    pub total: f64,
    pub budget: f64,
    pub fits: bool,
    pub overspend: f64,
}

pub fn check_budget(basket: &Basket, budget: f64) -> BudgetCheck {
    let total = basket.total_price();
    BudgetCheck {
        total,
        budget,
        fits: total <= budget,
        overspend: round_money((total - budget).max(0.0)),
    }
}

/// Basket sanity check before optimizing: `(errors, warnings)`.
///
/// Free items (price 0) are valid, same as in the catalog.
pub fn validate(basket: &Basket) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for item in basket.iter() {
        if !item.price_per_unit.is_finite() || item.price_per_unit < 0.0 {
            errors.push(format!("item '{}' has invalid price {}", item.name, item.price_per_unit));
        }
        if !item.total_price.is_finite() {
            errors.push(format!("item '{}' has invalid total {}", item.name, item.total_price));
        }
        if item.quantity <= 0.0 {
            warnings.push(format!("item '{}' has quantity {} (must be > 0)", item.name, item.quantity));
        }
    }
    (errors, warnings)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetAgent {
    min_discount: f64,
}

impl BudgetAgent {
    /// `min_discount` is the relative unit-price drop a substitute must offer.
    pub fn new(min_discount: f64) -> Self {
        Self { min_discount }
    }

    pub fn fit(&self, request: BudgetRequest, catalog: &Catalog) -> Fit {
        let BudgetRequest { basket, budget_rub, filter } = request;
        let (errors, warnings) = validate(&basket);

        let Some(budget) = budget_rub else {
            return Fit { errors, warnings, ..Fit::unchanged(basket, true) };
        };

        if !errors.is_empty() {
            warn!(errors = errors.len(), "basket failed validation, skipping optimization");
            let check = check_budget(&basket, budget);
            let mut fit = Fit { errors, warnings, ..Fit::unchanged(basket, check.fits) };
            fit.diagnostics = over_budget(&check);
            return fit;
        }

        let original = basket.total_price();
        let mut basket = basket;
        let mut replacements = Vec::new();

        while basket.total_price() > budget {
            let Some((idx, substitute)) = self.next_swap(&basket, &filter, catalog) else {
                debug!(total = basket.total_price(), budget, "no substitutable items left");
                break;
            };

            let item = &mut basket.items[idx];
            let old_price = item.total_price;
            let from_product_id = item.id;
            let from_name = item.name.clone();
            item.replace_product(substitute, AgentId::Budget, format!("cheaper substitute for {}", from_name));

            let replacement = Replacement {
                from_product_id,
                to_product_id: substitute.id,
                from_name,
                to_name: substitute.name.clone(),
                saved: round_money(old_price - item.total_price),
                old_price,
                new_price: item.total_price,
                quantity: item.quantity,
            };
            info!(
                from = replacement.from_product_id,
                to = replacement.to_product_id,
                saved = replacement.saved,
                "budget substitution"
            );
            replacements.push(replacement);
        }

        let check = check_budget(&basket, budget);
        Fit {
            saved: round_money(original - check.total),
            within_budget: check.fits,
            diagnostics: over_budget(&check),
            replacements,
            basket,
            errors,
            warnings,
        }
    }

    /// Item to swap next and its cheapest admissible substitute.
    fn next_swap<'a>(
        &self,
        basket: &Basket,
        filter: &TagFilter,
        catalog: &'a Catalog,
    ) -> Option<(usize, &'a Product)> {
        basket
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| {
                let ceiling = item.price_per_unit * (1.0 - self.min_discount);
                catalog
                    .products_for_role(&item.ingredient_role)
                    .filter(|p| p.id != item.id && filter.admits(&p.tags))
                    .find(|p| p.price_per_unit < item.price_per_unit && p.price_per_unit <= ceiling)
                    .map(|p| (idx, p))
            })
            .min_by(|(a, _), (b, _)| {
                let (a, b) = (&basket.items[*a], &basket.items[*b]);
                b.total_price.total_cmp(&a.total_price).then(a.id.cmp(&b.id))
            })
    }
}

fn over_budget(check: &BudgetCheck) -> Vec<Diagnostic> {
    if check.fits {
        return Vec::new();
    }
    vec![Diagnostic::BudgetNotMet {
        total_price: check.total,
        budget_rub: check.budget,
        overspend: check.overspend,
    }]
}

impl Stage for BudgetAgent {
    type Input = BudgetRequest;
    type Output = Fit;

    fn agent(&self) -> AgentId {
        AgentId::Budget
    }

    fn run(&self, input: BudgetRequest, ctx: &ExecutionContext) -> Result<Fit, StageError> {
        Ok(self.fit(input, &ctx.catalog.catalog))
    }

    fn report(&self, output: &Fit) -> StageResult {
        StageResult::Budget(BudgetResult {
            basket: output.basket.clone(),
            replacements: output.replacements.clone(),
            saved: output.saved,
            within_budget: output.within_budget,
            optimized: !output.replacements.is_empty(),
            total_price: output.basket.total_price(),
            errors: output.errors.clone(),
            warnings: output.warnings.clone(),
            diagnostics: output.diagnostics.clone(),
        })
    }
}
