//! Execution Context: state shared by the stages of one run
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::catalog::CatalogSnapshot;

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub trace_id: String,
    /// Catalog snapshot pinned for the whole run
    pub catalog: Arc<CatalogSnapshot>,
    pub started_at: DateTime<Utc>,
}

impl ExecutionContext {
    pub fn new(catalog: Arc<CatalogSnapshot>) -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            catalog,
            started_at: Utc::now(),
        }
    }
}
