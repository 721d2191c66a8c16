//! Action plan document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::plan::ActionPlan;

pub const PLAN_COLLECTION: &str = "action_plans";

/// Issued action plan
///
/// Plans are immutable, so a document is written once and never updated.
/// `plan_id` and `account_id` are lifted out of the body for indexing.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PlanDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub plan_id: String,

    pub account_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_plan_id: Option<String>,

    pub plan: ActionPlan,
}

impl PlanDoc {
    pub fn new(plan: ActionPlan) -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            plan_id: plan.plan_id.clone(),
            account_id: plan.account_id.clone(),
            previous_plan_id: plan.previous_plan_id.clone(),
            plan,
        }
    }
}

impl IntoIndexes for PlanDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "plan_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("plan_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "account_id": 1, "metadata.created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("account_plans".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for PlanDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
