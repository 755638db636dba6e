//! Catalog: read-only product and scenario index, published as immutable snapshots
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use crate::data_model::{Product, ProductId, Scenario};
use crate::error::BasketError;

/// On-disk catalog layout (YAML or JSON).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

/// Validated, indexed catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    products: Vec<Product>,
    scenarios: Vec<Scenario>,
    by_id: HashMap<ProductId, usize>,
    /// Role -> product indexes, sorted by (price, id)
    by_role: BTreeMap<String, Vec<usize>>,
}

impl Catalog {
    pub fn new(products: Vec<Product>, scenarios: Vec<Scenario>) -> Result<Self, BasketError> {
        let mut by_id = HashMap::with_capacity(products.len());
        let mut by_role: BTreeMap<String, Vec<usize>> = BTreeMap::new();

        for (idx, product) in products.iter().enumerate() {
            if !product.price_per_unit.is_finite() || product.price_per_unit < 0.0 {
                return Err(BasketError::CatalogError(format!(
                    "product {} has invalid price {}",
                    product.id, product.price_per_unit
                )));
            }
            if by_id.insert(product.id, idx).is_some() {
                return Err(BasketError::CatalogError(format!(
                    "duplicate product id {}",
                    product.id
                )));
            }
            by_role
                .entry(product.ingredient_role.clone())
                .or_default()
                .push(idx);
        }

        for indexes in by_role.values_mut() {
            indexes.sort_by(|a, b| {
                products[*a]
                    .price_per_unit
                    .total_cmp(&products[*b].price_per_unit)
                    .then(products[*a].id.cmp(&products[*b].id))
            });
        }

        for scenario in &scenarios {
            if scenario.required_roles.is_empty() {
                return Err(BasketError::CatalogError(format!(
                    "scenario '{}' has no required roles",
                    scenario.name
                )));
            }
            let mut seen = HashSet::new();
            for role in &scenario.required_roles {
                if !seen.insert(role.as_str()) {
                    return Err(BasketError::CatalogError(format!(
                        "scenario '{}' lists role '{}' twice",
                        scenario.name, role
                    )));
                }
            }
        }

        Ok(Self {
            products,
            scenarios,
            by_id,
            by_role,
        })
    }

    /// Parse a catalog from YAML (JSON is accepted too).
    pub fn from_yaml(content: &str) -> Result<Self, BasketError> {
        let file: CatalogFile = serde_yaml::from_str(content)
            .map_err(|e| BasketError::CatalogError(format!("failed to parse catalog: {}", e)))?;
        Self::new(file.products, file.scenarios)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, BasketError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BasketError::CatalogError(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.by_id.get(&id).map(|idx| &self.products[*idx])
    }

    /// Products able to fill `role`, cheapest first (ties by id).
    pub fn products_for_role<'a>(&'a self, role: &str) -> impl Iterator<Item = &'a Product> + 'a {
        self.by_role
            .get(role)
            .into_iter()
            .flatten()
            .map(move |idx| &self.products[*idx])
    }

    pub fn has_stock(&self, role: &str) -> bool {
        self.by_role.get(role).map_or(false, |v| !v.is_empty())
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.by_role.keys().map(String::as_str)
    }

    pub fn average_price(&self) -> f64 {
        if self.products.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.products.iter().map(|p| p.price_per_unit).sum();
        crate::data_model::round_money(sum / self.products.len() as f64)
    }
}

/// Immutable catalog version served to pipeline runs.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub catalog: Catalog,
    /// blake3 fingerprint of the catalog content
    pub version: String,
    pub loaded_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    pub fn new(catalog: Catalog) -> Result<Self, BasketError> {
        let mut hasher = blake3::Hasher::new();
        for product in catalog.products() {
            let bytes = serde_json::to_vec(product)
                .map_err(|e| BasketError::CatalogError(e.to_string()))?;
            hasher.update(&bytes);
        }
        for scenario in catalog.scenarios() {
            let bytes = serde_json::to_vec(scenario)
                .map_err(|e| BasketError::CatalogError(e.to_string()))?;
            hasher.update(&bytes);
        }

        Ok(Self {
            catalog,
            version: format!("blake3:{}", hasher.finalize()),
            loaded_at: Utc::now(),
        })
    }
}

/// Holder of the current snapshot. Publishing swaps the whole `Arc`, so a run
/// that already took a snapshot never sees a partially updated catalog.
#[derive(Debug)]
pub struct CatalogStore {
    current: RwLock<Arc<CatalogSnapshot>>,
}

impl CatalogStore {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the current snapshot, returning the previous one.
    pub fn publish(&self, snapshot: CatalogSnapshot) -> Arc<CatalogSnapshot> {
        let next = Arc::new(snapshot);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(version = %next.version, products = next.catalog.products().len(), "catalog snapshot published");
        std::mem::replace(&mut *guard, next)
    }
}
