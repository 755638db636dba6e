//! Stage Trait: single contract for every pipeline agent
use crate::context::ExecutionContext;
use crate::data_model::{AgentId, StageResult};

/// Contract of one pipeline stage.
pub trait Stage: Send + Sync {
    type Input;
    type Output;

    /// Wire identifier of the agent behind this stage
    fn agent(&self) -> AgentId;

    /// Whether the stage is deterministic for a fixed catalog (default: true)
    fn deterministic(&self) -> bool {
        true
    }

    /// Execute the stage
    fn run(&self, input: Self::Input, ctx: &ExecutionContext) -> Result<Self::Output, StageError>;

    /// Payload recorded in the stage log once `run` succeeds
    fn report(&self, output: &Self::Output) -> StageResult;
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageError {
    ValidationFailed(String),
    ExecutionFailed(String),
    Timeout(std::time::Duration),
    NoScenarioMatch(String),
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "STAGE/VALIDATION: {}", msg),
            Self::ExecutionFailed(msg) => write!(f, "STAGE/EXEC: {}", msg),
            Self::Timeout(after) => write!(f, "STAGE/TIMEOUT: no answer after {:?}", after),
            Self::NoScenarioMatch(meal) => {
                write!(f, "SCENARIO/NO_MATCH: no scenario matches meal type {}", meal)
            }
        }
    }
}

impl std::error::Error for StageError {}
