//! Trellis - personalized action-plan service

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trellis::{
    config::Args,
    db::{MongoClient, MongoPlanStore},
    logging::AuditLogger,
    orchestrator::{OrchestratorConfig, RecommendationOrchestrator},
    rules::RuleSet,
    server::{self, AppState},
    services::{
        load_catalog, BasicScheduler, HttpScheduler, HttpSurveyClient, InMemoryPlanStore,
        OfflineSurveyProvider, PlanStore, Scheduler, SurveyProvider,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("trellis={},info", args.log_level).into());
    if args.json_logs() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Trellis - action plan service");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Scheduler: {}", args.scheduler_url.as_deref().unwrap_or("local"));
    info!(
        "Survey provider: {}",
        args.survey.survey_api_url.as_deref().unwrap_or("none")
    );
    info!("======================================");

    let rules = match &args.rules_path {
        Some(path) => RuleSet::from_path(path),
        None => RuleSet::embedded(),
    }
    .context("loading rule set")?;
    info!("Loaded {} matching rules", rules.len());

    let (store, store_backend): (Arc<dyn PlanStore>, &'static str) = match &args.mongodb_uri {
        Some(uri) => {
            let client = MongoClient::new(uri, &args.mongodb_db)
                .await
                .context("connecting to MongoDB")?;
            let store = MongoPlanStore::new(&client)
                .await
                .context("preparing MongoDB collections")?;
            (Arc::new(store), "mongodb")
        }
        None => {
            let catalog = load_catalog(args.routine_catalog_path.as_deref())
                .context("loading routine catalog")?;
            warn!(
                "No MONGODB_URI - plans kept in memory ({} catalog routines)",
                catalog.len()
            );
            (Arc::new(InMemoryPlanStore::with_catalog(catalog)), "memory")
        }
    };

    let scheduler: Arc<dyn Scheduler> = match &args.scheduler_url {
        Some(url) => Arc::new(HttpScheduler::new(url.clone(), args.request_timeout())),
        None => Arc::new(BasicScheduler),
    };

    let survey: Arc<dyn SurveyProvider> = match args.survey_client_config() {
        Some(config) => Arc::new(HttpSurveyClient::new(config)),
        None => {
            warn!("No SURVEY_API_URL - create events must carry inline answers");
            Arc::new(OfflineSurveyProvider)
        }
    };

    let orchestrator = RecommendationOrchestrator::new(store, scheduler, survey, Arc::new(rules))
        .with_config(OrchestratorConfig {
            default_period_in_days: args.default_period_days,
            ..OrchestratorConfig::default()
        });

    let audit = AuditLogger::new(args.node_id.to_string());
    if let Some(path) = &args.audit_log_path {
        audit
            .init_file(path.clone())
            .await
            .with_context(|| format!("opening audit log {}", path.display()))?;
    }

    let state = Arc::new(AppState::new(
        args,
        Arc::new(orchestrator),
        audit,
        store_backend,
    ));

    server::run(state).await?;
    Ok(())
}
