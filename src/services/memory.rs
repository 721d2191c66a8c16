//! In-memory plan store for development mode and tests

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use super::{PlanStore, ServiceResult};
use crate::plan::{ActionPlan, Routine};
use crate::types::{Result, TrellisError};

const DEFAULT_CATALOG: &str = include_str!("../../config/routines.json");

/// Parse a routine catalog from a JSON array
pub fn catalog_from_json_str(json: &str) -> Result<Vec<Routine>> {
    serde_json::from_str(json)
        .map_err(|e| TrellisError::Config(format!("Invalid routine catalog: {}", e)))
}

/// Load a routine catalog file, or the catalog shipped with the binary
pub fn load_catalog(path: Option<&Path>) -> Result<Vec<Routine>> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|e| {
                TrellisError::Config(format!(
                    "Failed to read routine catalog {}: {}",
                    path.display(),
                    e
                ))
            })?;
            catalog_from_json_str(&json)
        }
        None => catalog_from_json_str(DEFAULT_CATALOG),
    }
}

/// Plan store backed by process memory
#[derive(Default)]
pub struct InMemoryPlanStore {
    plans: DashMap<String, ActionPlan>,
    scores: DashMap<String, BTreeMap<String, f64>>,
    catalog: Vec<Routine>,
}

impl InMemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with a routine catalog
    pub fn with_catalog(catalog: Vec<Routine>) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    pub fn insert_plan(&self, plan: ActionPlan) {
        self.plans.insert(plan.plan_id.clone(), plan);
    }

    pub fn insert_scores(&self, account_id: &str, scores: BTreeMap<String, f64>) {
        self.scores.insert(account_id.to_string(), scores);
    }

    pub fn plan_count(&self) -> usize {
        self.plans.len()
    }

    pub fn scores_for(&self, account_id: &str) -> Option<BTreeMap<String, f64>> {
        self.scores.get(account_id).map(|s| s.clone())
    }
}

#[async_trait::async_trait]
impl PlanStore for InMemoryPlanStore {
    async fn fetch_plan(&self, plan_id: &str) -> ServiceResult<Option<ActionPlan>> {
        Ok(self.plans.get(plan_id).map(|p| p.clone()))
    }

    async fn fetch_scores(&self, account_id: &str) -> ServiceResult<BTreeMap<String, f64>> {
        Ok(self.scores_for(account_id).unwrap_or_default())
    }

    async fn persist_plan(&self, plan: &ActionPlan) -> ServiceResult<()> {
        debug!(plan_id = %plan.plan_id, "Storing plan in memory");
        self.insert_plan(plan.clone());
        Ok(())
    }

    async fn persist_scores(
        &self,
        account_id: &str,
        scores: &BTreeMap<String, f64>,
    ) -> ServiceResult<()> {
        self.insert_scores(account_id, scores.clone());
        Ok(())
    }

    async fn fetch_routine_catalog(&self) -> ServiceResult<Vec<Routine>> {
        Ok(self.catalog.clone())
    }
}
