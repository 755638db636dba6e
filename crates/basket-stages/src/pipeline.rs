//! Pipeline Orchestrator: PARSING → SELECTING → BUDGETING → PERSONALIZING → DONE
//!
//! Any fatal failure moves the run to ERROR, which keeps the stage history
//! recorded so far. Non-fatal anomalies travel in the stage results instead;
//! a non-fatal budget or profile failure keeps the basket from the stage before.

use basket_core::config::BasketConfig;
use basket_core::data_model::{Metadata, ParserResult, PipelineStatus, Summary};
use basket_core::{
    AgentId, Basket, BasketError, CatalogStore, Constraints, ExecutionContext, PipelineResult,
    StageLog, StageResult,
};
use basket_in::{normalizer, ConstraintParser};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::budget::{BudgetAgent, BudgetRequest, Fit};
use crate::compatibility::{CompatibilityAgent, Selection};
use crate::profile::ProfileAgent;

/// A validated, non-blank request text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    pub fn new(text: impl Into<String>) -> Result<Self, BasketError> {
        let text = text.into();
        if normalizer::is_blank(&text) {
            return Err(BasketError::EmptyQuery);
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Run state; each variant owns what the next step needs.
#[derive(Debug)]
enum PipelineState {
    Parsing,
    Selecting(Constraints),
    Budgeting {
        constraints: Constraints,
        selection: Selection,
    },
    Personalizing {
        constraints: Constraints,
        selection: Selection,
        fit: Fit,
    },
    Done {
        constraints: Constraints,
        selection: Selection,
        fit: Fit,
        basket: Basket,
    },
    Error {
        error: BasketError,
        parsed: Option<Constraints>,
    },
}

pub struct BasketPipeline {
    parser: ConstraintParser,
    catalog: Arc<CatalogStore>,
    compatibility: CompatibilityAgent,
    budget: BudgetAgent,
    profile: ProfileAgent,
}

impl BasketPipeline {
    pub fn new(parser: ConstraintParser, catalog: Arc<CatalogStore>) -> Self {
        Self {
            parser,
            catalog,
            compatibility: CompatibilityAgent::default(),
            budget: BudgetAgent::default(),
            profile: ProfileAgent,
        }
    }

    pub fn from_config(config: &BasketConfig, catalog: Arc<CatalogStore>) -> Result<Self, BasketError> {
        let parser = ConstraintParser::from_config(&config.parser)?;
        Ok(Self::new(parser, catalog)
            .with_compatibility(CompatibilityAgent::new(
                config.selection.strategy,
                config.selection.tag_precedence,
                config.selection.default_meal_type.clone(),
            ))
            .with_budget(BudgetAgent::new(config.budget.min_discount)))
    }

    pub fn with_compatibility(mut self, agent: CompatibilityAgent) -> Self {
        self.compatibility = agent;
        self
    }

    pub fn with_budget(mut self, agent: BudgetAgent) -> Self {
        self.budget = agent;
        self
    }

    pub fn catalog(&self) -> &Arc<CatalogStore> {
        &self.catalog
    }

    pub fn parser(&self) -> &ConstraintParser {
        &self.parser
    }

    /// Validate the raw text, then run. `EmptyQuery` never reaches the pipeline.
    pub async fn handle(&self, text: &str) -> Result<PipelineResult, BasketError> {
        let query = Query::new(text)?;
        Ok(self.run(&query).await)
    }

    pub async fn run(&self, query: &Query) -> PipelineResult {
        let started = Instant::now();
        let ctx = ExecutionContext::new(self.catalog.snapshot());
        let mut log = StageLog::new();
        info!(trace_id = %ctx.trace_id, catalog = %ctx.catalog.version, "pipeline started");

        let mut state = PipelineState::Parsing;
        loop {
            state = match state {
                PipelineState::Parsing => match self.parse(query, &ctx, &mut log).await {
                    Ok(constraints) => PipelineState::Selecting(constraints),
                    Err(error) => PipelineState::Error { error, parsed: None },
                },
                PipelineState::Selecting(constraints) => {
                    match log.run(&self.compatibility, constraints.clone(), &ctx) {
                        Ok(selection) => PipelineState::Budgeting { constraints, selection },
                        Err(e) => PipelineState::Error {
                            error: e.into(),
                            parsed: Some(constraints),
                        },
                    }
                }
                PipelineState::Budgeting { constraints, selection } => {
                    let request = BudgetRequest {
                        basket: selection.basket.clone(),
                        budget_rub: constraints.budget_rub,
                        filter: selection.filter.clone(),
                    };
                    match log.run(&self.budget, request, &ctx).map_err(BasketError::from) {
                        Ok(fit) => PipelineState::Personalizing { constraints, selection, fit },
                        Err(error) if error.is_fatal() => PipelineState::Error {
                            error,
                            parsed: Some(constraints),
                        },
                        Err(error) => {
                            warn!(trace_id = %ctx.trace_id, error = %error, "budget stage failed, keeping selected basket");
                            let fit = Fit::fallback(selection.basket.clone(), constraints.budget_rub, error.to_string());
                            PipelineState::Personalizing { constraints, selection, fit }
                        }
                    }
                }
                PipelineState::Personalizing { constraints, selection, fit } => {
                    match log.run(&self.profile, fit.basket.clone(), &ctx).map_err(BasketError::from) {
                        Ok(basket) => PipelineState::Done { constraints, selection, fit, basket },
                        Err(error) if error.is_fatal() => PipelineState::Error {
                            error,
                            parsed: Some(constraints),
                        },
                        Err(error) => {
                            warn!(trace_id = %ctx.trace_id, error = %error, "profile stage failed, keeping fitted basket");
                            let basket = fit.basket.clone();
                            PipelineState::Done { constraints, selection, fit, basket }
                        }
                    }
                }
                PipelineState::Done { constraints, selection, fit, basket } => {
                    let summary = Summary {
                        total_price: basket.total_price(),
                        original_price: selection.basket.total_price(),
                        savings: fit.saved,
                        within_budget: fit.within_budget,
                        budget_rub: constraints.budget_rub,
                        items_count: basket.len(),
                        unfilled_roles: selection.unfilled_roles(),
                        execution_time_sec: elapsed_secs(started),
                    };
                    let metadata = Metadata {
                        scenario_used: selection.scenario.name.clone(),
                        people: constraints.people,
                        meal_types: self.compatibility.requested_meal_types(&constraints).into_iter().collect(),
                        strategy: self.compatibility.strategy(),
                    };
                    info!(
                        trace_id = %ctx.trace_id,
                        scenario = %metadata.scenario_used,
                        total = summary.total_price,
                        within_budget = summary.within_budget,
                        "pipeline finished"
                    );
                    break PipelineResult {
                        status: PipelineStatus::Success,
                        message: None,
                        error_type: None,
                        basket,
                        summary: Some(summary),
                        parsed: Some(constraints),
                        metadata: Some(metadata),
                        stages: log.into_records(),
                    };
                }
                PipelineState::Error { error, parsed } => {
                    warn!(trace_id = %ctx.trace_id, kind = error.kind(), error = %error, "pipeline failed");
                    break PipelineResult {
                        status: PipelineStatus::Error,
                        message: Some(error.to_string()),
                        error_type: Some(error.kind().to_string()),
                        basket: Basket::new(),
                        summary: None,
                        parsed,
                        metadata: None,
                        stages: log.into_records(),
                    };
                }
            };
        }
    }

    /// The parser is async, so it is timed here rather than through `StageLog::run`.
    async fn parse(
        &self,
        query: &Query,
        ctx: &ExecutionContext,
        log: &mut StageLog,
    ) -> Result<Constraints, BasketError> {
        let start = Instant::now();
        match self.parser.parse(query.as_str()).await {
            Ok(parsed) => {
                log.completed(
                    StageResult::LlmParser(ParserResult { parsed: parsed.clone() }),
                    start.elapsed(),
                    ctx,
                );
                Ok(parsed)
            }
            Err(failure) => {
                log.failed(AgentId::LlmParser, start.elapsed(), &failure, ctx);
                Err(failure.into())
            }
        }
    }
}

fn elapsed_secs(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 1000.0).round() / 1000.0
}
