//! Recommendation orchestrator
//!
//! Drives one inbound event to completion:
//!
//! ```text
//! Received --parse_event--> Validated --+--> Creating ------+
//!                                       +--> Recalculating -+--> Responded
//!                                       +--> Renewing ------+
//! ```
//!
//! The orchestrator holds no mutable state. Everything it touches outside the
//! pure `rules`, `scoring` and `plan` modules goes through the collaborator
//! traits in [`crate::services`].

pub mod events;

pub use events::{parse_event, CreatePayload, EventKind, InboundEvent, RecalcPayload, RenewPayload};

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::plan::{self, ActionPlan, Routine};
use crate::rules::{match_routines, RuleSet};
use crate::scoring::{build_report, PriorScores, ScoreReport};
use crate::services::{PlanContext, PlanStore, Scheduler, SurveyContext, SurveyProvider};
use crate::types::{Result, TrellisError};
use events::required;

/// Defaults applied when a create payload leaves fields out
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub default_period_in_days: u32,
    pub default_gender: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_period_in_days: 28,
            default_gender: "UNSPECIFIED".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResponse {
    pub plan: ActionPlan,
    pub matched_routine_ids: Vec<String>,
    pub score_report: ScoreReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalcResponse {
    pub matched_routine_ids: Vec<String>,
    pub score_report: ScoreReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewResponse {
    pub plan: ActionPlan,
}

/// Body of a successful event response
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EventResponse {
    Created(CreateResponse),
    Recalculated(RecalcResponse),
    Renewed(RenewResponse),
}

pub struct RecommendationOrchestrator {
    store: Arc<dyn PlanStore>,
    scheduler: Arc<dyn Scheduler>,
    survey: Arc<dyn SurveyProvider>,
    rules: Arc<RuleSet>,
    config: OrchestratorConfig,
}

impl RecommendationOrchestrator {
    pub fn new(
        store: Arc<dyn PlanStore>,
        scheduler: Arc<dyn Scheduler>,
        survey: Arc<dyn SurveyProvider>,
        rules: Arc<RuleSet>,
    ) -> Self {
        Self {
            store,
            scheduler,
            survey,
            rules,
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Validate a raw request body and process it
    pub async fn handle(&self, body: &[u8]) -> Result<EventResponse> {
        let event = parse_event(body)?;
        self.dispatch(&event).await
    }

    pub async fn dispatch(&self, event: &InboundEvent) -> Result<EventResponse> {
        debug!(event = %event.kind, "Event validated");
        match event.kind {
            EventKind::Create => self.create(event.payload()?).await.map(EventResponse::Created),
            EventKind::Recalculate => self
                .recalculate(event.payload()?)
                .await
                .map(EventResponse::Recalculated),
            EventKind::Renew => self.renew(event.payload()?).await.map(EventResponse::Renewed),
        }
    }

    /// Build and issue an account's first plan
    pub async fn create(&self, payload: CreatePayload) -> Result<CreateResponse> {
        let account_id = required(&payload.account_id, "accountId")?.to_string();

        let answers = match (payload.answers, payload.survey_response_id.as_deref()) {
            (Some(answers), _) => answers,
            (None, Some(response_id)) if !response_id.trim().is_empty() => {
                self.survey
                    .fetch_survey_answers(&SurveyContext {
                        account_id: account_id.clone(),
                        survey_response_id: response_id.to_string(),
                    })
                    .await?
            }
            _ => {
                return Err(TrellisError::validation(
                    "Missing answers or surveyResponseId",
                ))
            }
        };

        let catalog = self.store.fetch_routine_catalog().await?;
        let outcome = match_routines(&self.rules.rules, &answers, &catalog);

        let context = PlanContext {
            account_id: account_id.clone(),
            gender: payload
                .gender
                .unwrap_or_else(|| self.config.default_gender.clone()),
            period_in_days: payload
                .period_in_days
                .unwrap_or(self.config.default_period_in_days),
            routines: selected_routines(&catalog, &outcome.routine_ids),
        };
        let plan = self.scheduler.create_initial_plan(&context).await?;

        let report = build_report(&account_id, &PriorScores::zero(), &[]);

        self.store.persist_plan(&plan).await?;
        self.store
            .persist_scores(&account_id, &report.score_map())
            .await?;
        self.survey.trigger_follow_up(&account_id, &plan.plan_id).await?;

        info!(
            account_id = %account_id,
            plan_id = %plan.plan_id,
            routines = plan.routines.len(),
            matched_rules = outcome.matched_rules.len(),
            "Action plan created"
        );

        Ok(CreateResponse {
            plan,
            matched_routine_ids: outcome.routine_ids,
            score_report: report,
        })
    }

    /// Rescore an account from the completion stats of its current plan
    pub async fn recalculate(&self, payload: RecalcPayload) -> Result<RecalcResponse> {
        let plan = self
            .owned_plan(&payload.action_plan_unique_id, &payload.account_id)
            .await?;

        let raw_scores = self.store.fetch_scores(&plan.account_id).await?;
        let priors = PriorScores::from_raw(&raw_scores);

        let outcome = match_routines(&self.rules.rules, &payload.answers, &plan.routines);
        let report = build_report(&plan.account_id, &priors, &payload.pillar_completion_stats);

        self.store
            .persist_scores(&plan.account_id, &report.score_map())
            .await?;

        info!(
            account_id = %plan.account_id,
            plan_id = %plan.plan_id,
            total_score = report.total_score,
            "Scores recalculated"
        );

        Ok(RecalcResponse {
            matched_routine_ids: outcome.routine_ids,
            score_report: report,
        })
    }

    /// Issue the successor of an existing plan
    pub async fn renew(&self, payload: RenewPayload) -> Result<RenewResponse> {
        let previous = self
            .owned_plan(&payload.action_plan_unique_id, &payload.account_id)
            .await?;

        let plan = plan::renew(&previous, &payload.change_log);
        self.store.persist_plan(&plan).await?;

        Ok(RenewResponse { plan })
    }

    /// Load a plan and check it belongs to the requesting account
    async fn owned_plan(
        &self,
        plan_id: &Option<String>,
        account_id: &Option<String>,
    ) -> Result<ActionPlan> {
        let plan_id = required(plan_id, "actionPlanUniqueId")?;
        let account_id = required(account_id, "accountId")?;

        let plan = self
            .store
            .fetch_plan(plan_id)
            .await?
            .ok_or_else(|| TrellisError::not_found(format!("Action plan not found: {}", plan_id)))?;

        if plan.account_id != account_id {
            return Err(TrellisError::validation(format!(
                "Action plan {} does not belong to account {}",
                plan_id, account_id
            )));
        }

        Ok(plan)
    }
}

/// Catalog routines for the matched ids, in match order
fn selected_routines(catalog: &[Routine], routine_ids: &[String]) -> Vec<Routine> {
    let by_id: HashMap<&str, &Routine> = catalog
        .iter()
        .map(|r| (r.routine_unique_id.as_str(), r))
        .collect();

    routine_ids
        .iter()
        .filter_map(|id| by_id.get(id.as_str()).map(|r| (*r).clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{AnswerRecord, AnswerValue, Condition, Operator, Rule, RuleAction};
    use crate::scoring::{CompletionStatistic, Pillar, PillarCompletionStats, RoutineCompletion};
    use crate::services::{BasicScheduler, InMemoryPlanStore, ServiceError, ServiceResult};
    use serde_json::{json, Map, Value};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Survey provider that serves canned answers and records follow-ups
    #[derive(Default)]
    struct MockSurvey {
        answers: AnswerRecord,
        follow_ups: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl SurveyProvider for MockSurvey {
        async fn fetch_survey_answers(&self, _context: &SurveyContext) -> ServiceResult<AnswerRecord> {
            if self.fail {
                return Err(ServiceError::new("fetchSurveyAnswers", "provider unavailable"));
            }
            Ok(self.answers.clone())
        }

        async fn trigger_follow_up(&self, account_id: &str, plan_id: &str) -> ServiceResult<()> {
            self.follow_ups
                .lock()
                .unwrap()
                .push((account_id.to_string(), plan_id.to_string()));
            Ok(())
        }
    }

    /// Store whose reads succeed but whose writes always fail
    struct ReadOnlyStore(InMemoryPlanStore);

    #[async_trait::async_trait]
    impl PlanStore for ReadOnlyStore {
        async fn fetch_plan(&self, plan_id: &str) -> ServiceResult<Option<ActionPlan>> {
            self.0.fetch_plan(plan_id).await
        }

        async fn fetch_scores(&self, account_id: &str) -> ServiceResult<BTreeMap<String, f64>> {
            self.0.fetch_scores(account_id).await
        }

        async fn persist_plan(&self, _plan: &ActionPlan) -> ServiceResult<()> {
            Err(ServiceError::new("persistPlan", "read-only replica"))
        }

        async fn persist_scores(
            &self,
            _account_id: &str,
            _scores: &BTreeMap<String, f64>,
        ) -> ServiceResult<()> {
            Err(ServiceError::new("persistScores", "read-only replica"))
        }

        async fn fetch_routine_catalog(&self) -> ServiceResult<Vec<Routine>> {
            self.0.fetch_routine_catalog().await
        }
    }

    fn routine(id: &str, pillar: Pillar, intensity: &str) -> Routine {
        let mut attributes = Map::new();
        attributes.insert("intensity".into(), Value::String(intensity.into()));
        Routine {
            routine_unique_id: id.into(),
            name: id.replace('_', " "),
            pillar,
            duration_in_mins: 10,
            attributes,
        }
    }

    fn catalog() -> Vec<Routine> {
        vec![
            routine("gentle_walk", Pillar::Movement, "low"),
            routine("interval_run", Pillar::Movement, "high"),
            routine("wind_down", Pillar::Sleep, "low"),
        ]
    }

    fn rules() -> RuleSet {
        RuleSet::new(vec![Rule {
            name: "inactive_gets_low_intensity".into(),
            condition: Condition::new(
                "weekly_exercise_days",
                Operator::Lt,
                AnswerValue::Number(3.0),
            ),
            action: RuleAction {
                field: "intensity".into(),
                value: AnswerValue::Text("low".into()),
            },
        }])
    }

    fn inactive_answers() -> AnswerRecord {
        AnswerRecord::from([("weekly_exercise_days".to_string(), AnswerValue::Number(1.0))])
    }

    fn orchestrator(
        store: Arc<dyn PlanStore>,
        survey: Arc<MockSurvey>,
    ) -> RecommendationOrchestrator {
        RecommendationOrchestrator::new(store, Arc::new(BasicScheduler), survey, Arc::new(rules()))
    }

    fn event(kind: &str, payload: Value) -> Vec<u8> {
        serde_json::to_vec(&json!({ "eventEnum": kind, "eventPayload": payload })).unwrap()
    }

    async fn seeded_plan(store: &InMemoryPlanStore) -> ActionPlan {
        let context = PlanContext {
            account_id: "acct-1".into(),
            gender: "female".into(),
            period_in_days: 28,
            routines: catalog(),
        };
        let plan = BasicScheduler::build_plan(&context);
        store.persist_plan(&plan).await.unwrap();
        plan
    }

    #[tokio::test]
    async fn test_create_with_inline_answers() {
        let store = Arc::new(InMemoryPlanStore::with_catalog(catalog()));
        let survey = Arc::new(MockSurvey::default());
        let orch = orchestrator(store.clone(), survey.clone());

        let body = event(
            "ACTION_PLAN_CREATE",
            json!({ "accountId": "acct-1", "answers": { "weekly_exercise_days": 1 }, "gender": "male" }),
        );
        let EventResponse::Created(created) = orch.handle(&body).await.unwrap() else {
            panic!("expected a created response");
        };

        assert_eq!(created.matched_routine_ids, vec!["gentle_walk", "wind_down"]);
        assert_eq!(created.plan.routines.len(), 2);
        assert_eq!(created.plan.gender, "MALE");
        assert_eq!(created.plan.period_in_days, 28);
        assert_eq!(created.score_report.pillar_scores.len(), 7);
        assert_eq!(created.score_report.total_score, 0);

        assert_eq!(store.plan_count(), 1);
        assert_eq!(store.scores_for("acct-1").map(|s| s.len()), Some(7));
        assert_eq!(
            survey.follow_ups.lock().unwrap().as_slice(),
            &[("acct-1".to_string(), created.plan.plan_id.clone())]
        );
    }

    #[tokio::test]
    async fn test_create_fetches_answers_from_provider() {
        let store = Arc::new(InMemoryPlanStore::with_catalog(catalog()));
        let survey = Arc::new(MockSurvey {
            answers: inactive_answers(),
            ..MockSurvey::default()
        });
        let orch = orchestrator(store, survey);

        let created = orch
            .create(CreatePayload {
                account_id: Some("acct-1".into()),
                survey_response_id: Some("resp-9".into()),
                ..CreatePayload::default()
            })
            .await
            .unwrap();
        assert_eq!(created.matched_routine_ids.len(), 2);
    }

    #[tokio::test]
    async fn test_create_requires_answer_source() {
        let orch = orchestrator(Arc::new(InMemoryPlanStore::new()), Arc::new(MockSurvey::default()));
        let err = orch
            .create(CreatePayload {
                account_id: Some("acct-1".into()),
                ..CreatePayload::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TrellisError::Validation(_)));
    }

    #[tokio::test]
    async fn test_survey_failure_is_external() {
        let survey = Arc::new(MockSurvey {
            fail: true,
            ..MockSurvey::default()
        });
        let orch = orchestrator(Arc::new(InMemoryPlanStore::new()), survey);

        let err = orch
            .create(CreatePayload {
                account_id: Some("acct-1".into()),
                survey_response_id: Some("resp-9".into()),
                ..CreatePayload::default()
            })
            .await
            .unwrap_err();
        match err {
            TrellisError::ExternalService { operation, .. } => {
                assert_eq!(operation, "fetchSurveyAnswers")
            }
            other => panic!("expected external service error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recalculate_missing_plan_id() {
        let orch = orchestrator(Arc::new(InMemoryPlanStore::new()), Arc::new(MockSurvey::default()));
        let body = event("ACTION_PLAN_RECALCULATE", json!({ "accountId": "acct-1" }));

        match orch.handle(&body).await.unwrap_err() {
            TrellisError::Validation(msg) => assert_eq!(msg, "Missing actionPlanUniqueId"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recalculate_unknown_plan() {
        let orch = orchestrator(Arc::new(InMemoryPlanStore::new()), Arc::new(MockSurvey::default()));
        let body = event(
            "ACTION_PLAN_RECALCULATE",
            json!({ "actionPlanUniqueId": "nope", "accountId": "acct-1" }),
        );
        assert!(matches!(
            orch.handle(&body).await.unwrap_err(),
            TrellisError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_recalculate_rejects_foreign_account() {
        let store = Arc::new(InMemoryPlanStore::new());
        let plan = seeded_plan(&store).await;
        let orch = orchestrator(store, Arc::new(MockSurvey::default()));

        let err = orch
            .recalculate(RecalcPayload {
                action_plan_unique_id: Some(plan.plan_id),
                account_id: Some("someone-else".into()),
                ..RecalcPayload::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TrellisError::Validation(_)));
    }

    #[tokio::test]
    async fn test_recalculate_moves_scored_pillar_only() {
        let store = Arc::new(InMemoryPlanStore::new());
        let plan = seeded_plan(&store).await;
        store.insert_scores(
            "acct-1",
            BTreeMap::from([
                ("MOVEMENT".to_string(), 50.0),
                ("SLEEP".to_string(), 70.0),
                ("NOT_A_PILLAR".to_string(), 99.0),
            ]),
        );
        let orch = orchestrator(store.clone(), Arc::new(MockSurvey::default()));

        let stats = vec![PillarCompletionStats {
            pillar: "MOVEMENT".into(),
            routines: vec![RoutineCompletion {
                routine_unique_id: "gentle_walk".into(),
                scheduled_count: 5,
                completion_statistics: vec![CompletionStatistic {
                    completed_count: 4,
                    period_unit: "WEEK".into(),
                    period_sequence_number: 1,
                }],
            }],
        }];

        let result = orch
            .recalculate(RecalcPayload {
                action_plan_unique_id: Some(plan.plan_id.clone()),
                account_id: Some("acct-1".into()),
                pillar_completion_stats: stats,
                answers: inactive_answers(),
            })
            .await
            .unwrap();

        let movement = result.score_report.pillar(Pillar::Movement).unwrap();
        assert!(movement.score > 50.0);
        let sleep = result.score_report.pillar(Pillar::Sleep).unwrap();
        assert_eq!(sleep.score, 70.0);
        assert_eq!(result.matched_routine_ids, vec!["gentle_walk", "wind_down"]);

        let persisted = store.scores_for("acct-1").unwrap();
        assert_eq!(persisted.len(), 7);
        assert!(!persisted.contains_key("NOT_A_PILLAR"));
    }

    #[tokio::test]
    async fn test_recalculate_without_answers_matches_nothing() {
        let store = Arc::new(InMemoryPlanStore::new());
        let plan = seeded_plan(&store).await;
        let orch = orchestrator(store, Arc::new(MockSurvey::default()));

        let result = orch
            .recalculate(RecalcPayload {
                action_plan_unique_id: Some(plan.plan_id),
                account_id: Some("acct-1".into()),
                ..RecalcPayload::default()
            })
            .await
            .unwrap();
        assert!(result.matched_routine_ids.is_empty());
    }

    #[tokio::test]
    async fn test_renew_persists_successor() {
        let store = Arc::new(InMemoryPlanStore::new());
        let plan = seeded_plan(&store).await;
        let orch = orchestrator(store.clone(), Arc::new(MockSurvey::default()));

        let body = event(
            "ACTION_PLAN_RENEW",
            Value::String(
                json!({
                    "actionPlanUniqueId": plan.plan_id,
                    "accountId": "acct-1",
                    "changeLog": [{
                        "eventEnum": "ROUTINE_UPDATED",
                        "changeTarget": "ROUTINE",
                        "targetId": "wind_down",
                        "changes": [{ "changedProperty": "SCHEDULE_DAYS", "newValue": "[1,3,5]" }]
                    }]
                })
                .to_string(),
            ),
        );

        let EventResponse::Renewed(renewed) = orch.handle(&body).await.unwrap() else {
            panic!("expected a renewed response");
        };

        assert_ne!(renewed.plan.plan_id, plan.plan_id);
        assert_eq!(renewed.plan.previous_plan_id.as_deref(), Some(plan.plan_id.as_str()));
        assert_eq!(
            renewed.plan.routine("wind_down").unwrap().schedule_days,
            vec![1, 3, 5]
        );
        assert_eq!(store.plan_count(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_names_operation() {
        let inner = InMemoryPlanStore::new();
        let plan = seeded_plan(&inner).await;
        let orch = orchestrator(Arc::new(ReadOnlyStore(inner)), Arc::new(MockSurvey::default()));

        let err = orch
            .renew(RenewPayload {
                action_plan_unique_id: Some(plan.plan_id),
                account_id: Some("acct-1".into()),
                change_log: vec![],
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "persistPlan failed: read-only replica");
    }
}
