//! Configuration for Trellis
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use crate::services::SurveyClientConfig;

/// Trellis - personalized action-plan service
#[derive(Parser, Debug, Clone)]
#[command(name = "trellis")]
#[command(about = "Recommends and maintains personalized health action plans")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (in-memory store, survey provider optional)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI; without it plans are kept in memory
    #[arg(long, env = "MONGODB_URI")]
    pub mongodb_uri: Option<String>,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "trellis")]
    pub mongodb_db: String,

    /// Survey provider configuration
    #[command(flatten)]
    pub survey: SurveyArgs,

    /// Scheduler service base URL; routines are scheduled locally when unset
    #[arg(long, env = "SCHEDULER_URL")]
    pub scheduler_url: Option<String>,

    /// Rule set JSON file (defaults to the rules built into the binary)
    #[arg(long, env = "RULES_PATH")]
    pub rules_path: Option<PathBuf>,

    /// Routine catalog JSON file, used by the in-memory store
    #[arg(long, env = "ROUTINE_CATALOG_PATH")]
    pub routine_catalog_path: Option<PathBuf>,

    /// Plan period applied when a create event does not carry one
    #[arg(long, env = "DEFAULT_PERIOD_DAYS", default_value = "28")]
    pub default_period_days: u32,

    /// JSONL audit log file (disabled when unset)
    #[arg(long, env = "AUDIT_LOG_PATH")]
    pub audit_log_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format (text or json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Outbound request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,
}

/// Survey provider connection configuration
#[derive(Parser, Debug, Clone)]
pub struct SurveyArgs {
    /// Survey provider API base URL (required in production)
    #[arg(long, env = "SURVEY_API_URL")]
    pub survey_api_url: Option<String>,

    /// Bearer token for the survey provider (optional)
    #[arg(long, env = "SURVEY_API_TOKEN")]
    pub survey_api_token: Option<String>,
}

impl Args {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Survey client configuration, if a provider URL is set
    pub fn survey_client_config(&self) -> Option<SurveyClientConfig> {
        let base_url = self.survey.survey_api_url.as_ref()?;
        Some(SurveyClientConfig {
            base_url: base_url.clone(),
            api_token: self.survey.survey_api_token.clone(),
            request_timeout: self.request_timeout(),
        })
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            if self.survey.survey_api_url.is_none() {
                return Err("SURVEY_API_URL is required in production mode".to_string());
            }
            if self.mongodb_uri.is_none() {
                return Err("MONGODB_URI is required in production mode".to_string());
            }
        }

        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }

        if self.default_period_days == 0 {
            return Err("DEFAULT_PERIOD_DAYS must be greater than zero".to_string());
        }

        if !matches!(self.log_format.to_ascii_lowercase().as_str(), "text" | "json") {
            return Err(format!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                self.log_format
            ));
        }

        Ok(())
    }
}
