//! Basket Core: Stage contract, stage log, data model and catalog snapshots
//!
//! Shared kernel for the basket pipeline. Every agent implements [`Stage`],
//! every run is recorded in a [`StageLog`], and every run reads exactly one
//! immutable [`CatalogSnapshot`].

pub mod catalog;
pub mod config;
pub mod context;
pub mod data_model;
pub mod error;
pub mod labels;
pub mod runner;
pub mod stage;

pub use catalog::{Catalog, CatalogSnapshot, CatalogStore};
pub use config::{BasketConfig, SelectionStrategy, TagPrecedence};
pub use context::ExecutionContext;
pub use data_model::{
    AgentId, Basket, BasketItem, Constraints, Diagnostic, PipelineResult, Product, ProductId,
    Replacement, Scenario, StageRecord, StageResult, StageStatus, TagFilter,
};
pub use error::BasketError;
pub use runner::StageLog;
pub use stage::{Stage, StageError};

/// Engine version reported by the API
pub const BASKET_VERSION: &str = "1.0.0";
