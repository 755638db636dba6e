//! Profile Agent: personalization hook, currently an identity transform.
use basket_core::data_model::ProfileResult;
use basket_core::{AgentId, Basket, ExecutionContext, Stage, StageError, StageResult};

pub const NOT_IMPLEMENTED: &str = "not yet implemented";

#[derive(Debug, Default, Clone, Copy)]
pub struct ProfileAgent;

impl ProfileAgent {
    pub fn personalize(&self, basket: Basket) -> Basket {
        basket
    }
}

impl Stage for ProfileAgent {
    type Input = Basket;
    type Output = Basket;

    fn agent(&self) -> AgentId {
        AgentId::Profile
    }

    fn run(&self, input: Basket, _ctx: &ExecutionContext) -> Result<Basket, StageError> {
        Ok(self.personalize(input))
    }

    fn report(&self, output: &Basket) -> StageResult {
        StageResult::Profile(ProfileResult {
            basket: output.clone(),
            personalized: false,
            message: NOT_IMPLEMENTED.to_string(),
        })
    }
}
