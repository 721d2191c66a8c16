//! Pillar score document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

pub const SCORE_COLLECTION: &str = "pillar_scores";

/// Latest pillar scores for one account, keyed by pillar name
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ScoreDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub account_id: String,

    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
}

impl IntoIndexes for ScoreDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "account_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("account_id_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for ScoreDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
