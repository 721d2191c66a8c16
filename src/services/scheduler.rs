//! Initial plan scheduling
//!
//! Production deployments delegate to the scheduler service over HTTP.
//! Without one configured, [`BasicScheduler`] lays every matched routine out
//! on all seven days.

use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::{PlanContext, Scheduler, ServiceError, ServiceResult};
use crate::plan::{ActionPlan, PlanRoutine};

const OP: &str = "createInitialPlan";

/// Scheduler service client
pub struct HttpScheduler {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpScheduler {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("trellis/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into(),
            http_client,
        }
    }
}

#[async_trait::async_trait]
impl Scheduler for HttpScheduler {
    async fn create_initial_plan(&self, context: &PlanContext) -> ServiceResult<ActionPlan> {
        let url = format!("{}/plans", self.base_url.trim_end_matches('/'));
        debug!(url = %url, account_id = %context.account_id, routines = context.routines.len(), "Requesting initial plan");

        let response = self
            .http_client
            .post(&url)
            .json(context)
            .send()
            .await
            .map_err(|e| ServiceError::new(OP, e.to_string()))?;

        if !response.status().is_success() {
            return Err(ServiceError::new(
                OP,
                format!("scheduler returned HTTP {}", response.status()),
            ));
        }

        response
            .json::<ActionPlan>()
            .await
            .map_err(|e| ServiceError::new(OP, format!("invalid plan from scheduler: {}", e)))
    }
}

/// Local scheduler used when no scheduler service is configured
#[derive(Debug, Default, Clone)]
pub struct BasicScheduler;

pub const EVERY_DAY: [u8; 7] = [1, 2, 3, 4, 5, 6, 7];

impl BasicScheduler {
    pub fn build_plan(context: &PlanContext) -> ActionPlan {
        let routines: Vec<PlanRoutine> = context
            .routines
            .iter()
            .map(|r| PlanRoutine::from_routine(r, EVERY_DAY.to_vec()))
            .collect();

        let mut plan = ActionPlan {
            plan_id: Uuid::new_v4().to_string(),
            previous_plan_id: None,
            account_id: context.account_id.clone(),
            period_in_days: context.period_in_days,
            gender: context.gender.to_uppercase(),
            total_daily_time_in_mins: 0,
            routines,
            created_at: Utc::now(),
        };
        plan.total_daily_time_in_mins = plan.daily_minutes();
        plan
    }
}

#[async_trait::async_trait]
impl Scheduler for BasicScheduler {
    async fn create_initial_plan(&self, context: &PlanContext) -> ServiceResult<ActionPlan> {
        let plan = Self::build_plan(context);
        info!(plan_id = %plan.plan_id, routines = plan.routines.len(), "Built initial plan locally");
        Ok(plan)
    }
}
