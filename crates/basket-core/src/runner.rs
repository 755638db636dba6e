//! Stage Log: runs stages in order, timing each one and recording its outcome
use std::time::{Duration, Instant};

use crate::context::ExecutionContext;
use crate::data_model::{AgentId, StageRecord, StageResult};
use crate::stage::Stage;

/// Ordered stage history of one run. Records are never mutated once pushed.
#[derive(Debug, Clone, Default)]
pub struct StageLog {
    records: Vec<StageRecord>,
}

impl StageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one stage, recording it as completed or failed.
    pub fn run<S: Stage>(
        &mut self,
        stage: &S,
        input: S::Input,
        ctx: &ExecutionContext,
    ) -> Result<S::Output, crate::stage::StageError> {
        let agent = stage.agent();
        let start = Instant::now();
        tracing::debug!(agent = agent.as_str(), trace_id = %ctx.trace_id, "stage started");

        match stage.run(input, ctx) {
            Ok(output) => {
                self.completed(stage.report(&output), start.elapsed(), ctx);
                Ok(output)
            }
            Err(e) => {
                self.failed(agent, start.elapsed(), &e, ctx);
                Err(e)
            }
        }
    }

    pub fn completed(&mut self, result: StageResult, elapsed: Duration, ctx: &ExecutionContext) {
        let record = StageRecord::completed(result, elapsed);
        tracing::info!(
            agent = record.agent.as_str(),
            duration_ms = elapsed.as_millis() as u64,
            trace_id = %ctx.trace_id,
            "stage completed"
        );
        self.records.push(record);
    }

    pub fn failed(
        &mut self,
        agent: AgentId,
        elapsed: Duration,
        error: &dyn std::fmt::Display,
        ctx: &ExecutionContext,
    ) {
        tracing::warn!(
            agent = agent.as_str(),
            duration_ms = elapsed.as_millis() as u64,
            trace_id = %ctx.trace_id,
            error = %error,
            "stage failed"
        );
        self.records.push(StageRecord::failed(agent, elapsed, error.to_string()));
    }

    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<StageRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CatalogSnapshot};
    use crate::data_model::{Basket, ProfileResult, StageStatus};
    use crate::stage::StageError;
    use std::sync::Arc;

    struct Echo;

    impl Stage for Echo {
        type Input = Basket;
        type Output = Basket;

        fn agent(&self) -> AgentId {
            AgentId::Profile
        }

        fn run(&self, input: Basket, _ctx: &ExecutionContext) -> Result<Basket, StageError> {
            Ok(input)
        }

        fn report(&self, output: &Basket) -> StageResult {
            StageResult::Profile(ProfileResult {
                basket: output.clone(),
                personalized: false,
                message: "echo".to_string(),
            })
        }
    }

    struct Broken;

    impl Stage for Broken {
        type Input = ();
        type Output = ();

        fn agent(&self) -> AgentId {
            AgentId::Compatibility
        }

        fn run(&self, _input: (), _ctx: &ExecutionContext) -> Result<(), StageError> {
            Err(StageError::NoScenarioMatch("dinner".to_string()))
        }

        fn report(&self, _output: &()) -> StageResult {
            unreachable!("broken stage never succeeds")
        }
    }

    fn ctx() -> ExecutionContext {
        let catalog = Catalog::new(Vec::new(), Vec::new()).unwrap();
        ExecutionContext::new(Arc::new(CatalogSnapshot::new(catalog).unwrap()))
    }

    #[test]
    fn test_records_in_execution_order() {
        let ctx = ctx();
        let mut log = StageLog::new();

        let out = log.run(&Echo, Basket::new(), &ctx).unwrap();
        assert!(out.is_empty());
        assert!(log.run(&Broken, (), &ctx).is_err());

        let records = log.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].agent, AgentId::Profile);
        assert_eq!(records[0].status, StageStatus::Completed);
        assert_eq!(records[1].agent, AgentId::Compatibility);
        assert_eq!(records[1].status, StageStatus::Failed);
        assert!(records[1].error.as_deref().unwrap().contains("dinner"));
    }
}
