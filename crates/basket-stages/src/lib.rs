//! Basket Stages: the agents of the basket pipeline and its orchestrator
//!
//! # Pipeline Flow
//!
//! ```text
//! query → LLM Parser → Compatibility → Budget → Profile → PipelineResult
//!             ↓              ↓            ↓         ↓
//!        Constraints     Selection       Fit      Basket
//! ```
//!
//! Each agent implements `basket_core::Stage`; the parser is async and is
//! timed by the orchestrator directly.

pub mod budget;
pub mod compatibility;
pub mod pipeline;
pub mod profile;

pub use budget::{check_budget, BudgetAgent, BudgetCheck, BudgetRequest, Fit};
pub use compatibility::{coherence_score, CompatibilityAgent, Selection};
pub use pipeline::{BasketPipeline, Query};
pub use profile::ProfileAgent;
