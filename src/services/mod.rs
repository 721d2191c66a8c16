//! External collaborators
//!
//! The orchestrator talks to the outside world only through these traits, so
//! the store, the scheduler and the survey provider can be swapped (and mocked
//! in tests).
//!
//! - [`PlanStore`]: plans, scores and the routine catalog
//! - [`Scheduler`]: builds an initial plan from matched routines
//! - [`SurveyProvider`]: survey answers and follow-up notifications

pub mod memory;
pub mod scheduler;
pub mod survey;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::plan::{ActionPlan, Routine};
use crate::rules::AnswerRecord;

pub use memory::{load_catalog, InMemoryPlanStore};
pub use scheduler::{BasicScheduler, HttpScheduler};
pub use survey::{HttpSurveyClient, OfflineSurveyProvider, SurveyClientConfig};

/// Failure of one collaborator operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation}: {message}")]
pub struct ServiceError {
    /// Operation name as exposed in error responses (e.g. `fetchPlan`)
    pub operation: &'static str,
    pub message: String,
}

impl ServiceError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Document store for plans, scores and the routine catalog
#[async_trait::async_trait]
pub trait PlanStore: Send + Sync {
    async fn fetch_plan(&self, plan_id: &str) -> ServiceResult<Option<ActionPlan>>;

    /// Latest scores keyed by pillar name; keys are not validated here
    async fn fetch_scores(&self, account_id: &str) -> ServiceResult<BTreeMap<String, f64>>;

    async fn persist_plan(&self, plan: &ActionPlan) -> ServiceResult<()>;

    async fn persist_scores(
        &self,
        account_id: &str,
        scores: &BTreeMap<String, f64>,
    ) -> ServiceResult<()>;

    async fn fetch_routine_catalog(&self) -> ServiceResult<Vec<Routine>>;
}

/// Input for building an account's first plan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanContext {
    pub account_id: String,
    pub gender: String,
    pub period_in_days: u32,
    /// Routines selected by rule matching, in match order
    pub routines: Vec<Routine>,
}

/// Plan scheduler
#[async_trait::async_trait]
pub trait Scheduler: Send + Sync {
    async fn create_initial_plan(&self, context: &PlanContext) -> ServiceResult<ActionPlan>;
}

/// Identifies a completed survey
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyContext {
    pub account_id: String,
    pub survey_response_id: String,
}

/// External survey provider
#[async_trait::async_trait]
pub trait SurveyProvider: Send + Sync {
    async fn fetch_survey_answers(&self, context: &SurveyContext) -> ServiceResult<AnswerRecord>;

    /// Ask the provider to send the account its follow-up survey for a plan
    async fn trigger_follow_up(&self, account_id: &str, plan_id: &str) -> ServiceResult<()>;
}
