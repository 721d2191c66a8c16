//! MongoDB persistence
//!
//! [`MongoPlanStore`] is the production [`PlanStore`]. Failures inside the
//! store are [`TrellisError::Database`]; at the trait boundary they become
//! [`ServiceError`]s naming the operation.

pub mod mongo;
pub mod schemas;

pub use mongo::{IntoIndexes, MongoClient, MongoCollection, MutMetadata};

use bson::{doc, DateTime};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::plan::{ActionPlan, Routine};
use crate::services::{PlanStore, ServiceError, ServiceResult};
use crate::types::TrellisError;
use schemas::{
    PlanDoc, RoutineDoc, ScoreDoc, PLAN_COLLECTION, ROUTINE_COLLECTION, SCORE_COLLECTION,
};

/// Plan store backed by MongoDB collections
pub struct MongoPlanStore {
    plans: MongoCollection<PlanDoc>,
    scores: MongoCollection<ScoreDoc>,
    routines: MongoCollection<RoutineDoc>,
}

impl MongoPlanStore {
    pub async fn new(client: &MongoClient) -> Result<Self, TrellisError> {
        Ok(Self {
            plans: client.collection(PLAN_COLLECTION).await?,
            scores: client.collection(SCORE_COLLECTION).await?,
            routines: client.collection(ROUTINE_COLLECTION).await?,
        })
    }
}

fn service_error(operation: &'static str) -> impl FnOnce(TrellisError) -> ServiceError {
    move |e| ServiceError::new(operation, e.to_string())
}

#[async_trait::async_trait]
impl PlanStore for MongoPlanStore {
    async fn fetch_plan(&self, plan_id: &str) -> ServiceResult<Option<ActionPlan>> {
        let doc = self
            .plans
            .find_one(doc! { "plan_id": plan_id })
            .await
            .map_err(service_error("fetchPlan"))?;
        Ok(doc.map(|d| d.plan))
    }

    async fn fetch_scores(&self, account_id: &str) -> ServiceResult<BTreeMap<String, f64>> {
        let doc = self
            .scores
            .find_one(doc! { "account_id": account_id })
            .await
            .map_err(service_error("fetchScores"))?;
        Ok(doc.map(|d| d.scores).unwrap_or_default())
    }

    async fn persist_plan(&self, plan: &ActionPlan) -> ServiceResult<()> {
        let id = self
            .plans
            .insert_one(PlanDoc::new(plan.clone()))
            .await
            .map_err(service_error("persistPlan"))?;
        debug!(plan_id = %plan.plan_id, object_id = %id, "Plan persisted");
        Ok(())
    }

    async fn persist_scores(
        &self,
        account_id: &str,
        scores: &BTreeMap<String, f64>,
    ) -> ServiceResult<()> {
        const OP: &str = "persistScores";

        let scores = bson::to_bson(scores).map_err(|e| ServiceError::new(OP, e.to_string()))?;
        let now = DateTime::now();
        let update = doc! {
            "$set": {
                "scores": scores,
                "metadata.is_deleted": false,
                "metadata.updated_at": now,
            },
            "$setOnInsert": {
                "metadata.created_at": now,
            },
        };

        self.scores
            .upsert_one(doc! { "account_id": account_id }, update)
            .await
            .map_err(service_error(OP))?;
        Ok(())
    }

    async fn fetch_routine_catalog(&self) -> ServiceResult<Vec<Routine>> {
        let docs = self
            .routines
            .find_many(doc! {})
            .await
            .map_err(service_error("fetchRoutineCatalog"))?;

        let catalog = docs
            .into_iter()
            .filter_map(|doc| {
                let id = doc.routine_unique_id.clone();
                match Routine::try_from(doc) {
                    Ok(routine) => Some(routine),
                    Err(e) => {
                        warn!(routine_id = %id, error = %e, "Dropping catalog routine");
                        None
                    }
                }
            })
            .collect();

        Ok(catalog)
    }
}
