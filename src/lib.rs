//! Trellis - personalized action-plan service
//!
//! Recommends routines from survey answers, scores seven health pillars from
//! routine-completion evidence, and renews action plans from client change logs.
//!
//! ## Layers
//!
//! - **Rules**: condition evaluation and routine matching over a catalog
//! - **Scoring**: the pillar update law, rating bands and score reports
//! - **Plan**: the action plan model and the renewal transition
//! - **Orchestrator**: drives one webhook event through the layers above
//! - **Services / DB**: collaborator traits, HTTP clients and MongoDB storage

pub mod config;
pub mod db;
pub mod logging;
pub mod orchestrator;
pub mod plan;
pub mod routes;
pub mod rules;
pub mod scoring;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use orchestrator::RecommendationOrchestrator;
pub use server::{run, AppState};
pub use types::{Result, TrellisError};
