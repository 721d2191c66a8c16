//! Routine catalog document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::plan::Routine;
use crate::scoring::{Pillar, UnknownPillar};

pub const ROUTINE_COLLECTION: &str = "routines";

/// Catalog routine as maintained by the content team
///
/// The pillar stays a string so a typo in one document cannot break the
/// whole catalog read.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RoutineDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub routine_unique_id: String,

    pub name: String,

    pub pillar: String,

    #[serde(default)]
    pub duration_in_mins: u32,

    /// Attributes referenced by rule actions
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl TryFrom<RoutineDoc> for Routine {
    type Error = UnknownPillar;

    fn try_from(doc: RoutineDoc) -> Result<Self, Self::Error> {
        Ok(Routine {
            pillar: doc.pillar.parse::<Pillar>()?,
            routine_unique_id: doc.routine_unique_id,
            name: doc.name,
            duration_in_mins: doc.duration_in_mins,
            attributes: doc.attributes,
        })
    }
}

impl IntoIndexes for RoutineDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "routine_unique_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("routine_unique_id_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for RoutineDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
