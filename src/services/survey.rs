//! Survey provider HTTP client
//!
//! Fetches completed survey answers and triggers follow-up survey
//! notifications once a plan has been issued.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::{ServiceError, ServiceResult, SurveyContext, SurveyProvider};
use crate::rules::AnswerRecord;

/// Configuration for the survey client
#[derive(Debug, Clone)]
pub struct SurveyClientConfig {
    /// Base URL of the provider API (no trailing slash needed)
    pub base_url: String,
    /// Bearer token, if the provider requires one
    pub api_token: Option<String>,
    /// Timeout for HTTP requests (default: 30 seconds)
    pub request_timeout: Duration,
}

impl SurveyClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SurveyResponseBody {
    #[serde(default)]
    answers: AnswerRecord,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FollowUpRequest<'a> {
    account_id: &'a str,
    action_plan_unique_id: &'a str,
}

/// Survey provider client over HTTP
pub struct HttpSurveyClient {
    config: SurveyClientConfig,
    http_client: reqwest::Client,
}

impl HttpSurveyClient {
    pub fn new(config: SurveyClientConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("trellis/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            config,
            http_client,
        }
    }

    /// Append path segments to the base URL, percent-encoding each one
    ///
    /// Segments never introduce extra path levels, a query or a fragment.
    fn url(&self, segments: &[&str]) -> Result<reqwest::Url, String> {
        let mut url = reqwest::Url::parse(&self.config.base_url)
            .map_err(|e| format!("invalid survey base URL: {}", e))?;
        url.path_segments_mut()
            .map_err(|_| "survey base URL cannot carry a path".to_string())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait::async_trait]
impl SurveyProvider for HttpSurveyClient {
    async fn fetch_survey_answers(&self, context: &SurveyContext) -> ServiceResult<AnswerRecord> {
        const OP: &str = "fetchSurveyAnswers";

        let response_id = context.survey_response_id.as_str();
        if response_id.trim().is_empty() || response_id == "." || response_id == ".." {
            return Err(ServiceError::new(
                OP,
                format!("invalid surveyResponseId '{}'", response_id),
            ));
        }

        let url = self
            .url(&["responses", response_id])
            .map_err(|e| ServiceError::new(OP, e))?;
        debug!(url = %url, account_id = %context.account_id, "Fetching survey answers");

        let response = self
            .authorized(self.http_client.get(url))
            .send()
            .await
            .map_err(|e| ServiceError::new(OP, e.to_string()))?;

        if !response.status().is_success() {
            return Err(ServiceError::new(
                OP,
                format!("survey provider returned HTTP {}", response.status()),
            ));
        }

        let body: SurveyResponseBody = response
            .json()
            .await
            .map_err(|e| ServiceError::new(OP, format!("invalid survey response: {}", e)))?;

        Ok(body.answers)
    }

    async fn trigger_follow_up(&self, account_id: &str, plan_id: &str) -> ServiceResult<()> {
        const OP: &str = "triggerFollowUp";

        let url = self
            .url(&["notifications", "follow-up"])
            .map_err(|e| ServiceError::new(OP, e))?;

        let response = self
            .authorized(self.http_client.post(url))
            .json(&FollowUpRequest {
                account_id,
                action_plan_unique_id: plan_id,
            })
            .send()
            .await
            .map_err(|e| ServiceError::new(OP, e.to_string()))?;

        if !response.status().is_success() {
            return Err(ServiceError::new(
                OP,
                format!("survey provider returned HTTP {}", response.status()),
            ));
        }

        info!(account_id = %account_id, plan_id = %plan_id, "Follow-up survey triggered");
        Ok(())
    }
}

/// Stand-in used in development when no provider is configured
///
/// Fetching answers fails, so create events must carry inline answers.
/// Follow-up notifications are logged and dropped.
#[derive(Debug, Default, Clone)]
pub struct OfflineSurveyProvider;

#[async_trait::async_trait]
impl SurveyProvider for OfflineSurveyProvider {
    async fn fetch_survey_answers(&self, _context: &SurveyContext) -> ServiceResult<AnswerRecord> {
        Err(ServiceError::new(
            "fetchSurveyAnswers",
            "no survey provider configured",
        ))
    }

    async fn trigger_follow_up(&self, account_id: &str, plan_id: &str) -> ServiceResult<()> {
        info!(account_id = %account_id, plan_id = %plan_id, "Follow-up skipped, no survey provider");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join() {
        let client = HttpSurveyClient::new(SurveyClientConfig::new("https://survey.example.com/api/"));
        assert_eq!(
            client.url(&["responses", "abc"]).unwrap().as_str(),
            "https://survey.example.com/api/responses/abc"
        );

        let client = HttpSurveyClient::new(SurveyClientConfig::new("https://survey.example.com/api"));
        assert_eq!(
            client.url(&["notifications", "follow-up"]).unwrap().as_str(),
            "https://survey.example.com/api/notifications/follow-up"
        );
    }

    #[test]
    fn test_response_id_stays_in_one_segment() {
        let client = HttpSurveyClient::new(SurveyClientConfig::new("https://survey.example.com/api"));
        let url = client
            .url(&["responses", "../../admin/export?all=1#"])
            .unwrap();

        assert_eq!(url.host_str(), Some("survey.example.com"));
        assert_eq!(url.path(), "/api/responses/..%2F..%2Fadmin%2Fexport%3Fall=1%23");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path_segments().map(|s| s.count()), Some(3));
    }

    #[test]
    fn test_invalid_base_url() {
        let client = HttpSurveyClient::new(SurveyClientConfig::new("not a url"));
        assert!(client.url(&["responses", "abc"]).is_err());
    }

    #[tokio::test]
    async fn test_dot_segment_response_id_rejected() {
        let client = HttpSurveyClient::new(SurveyClientConfig::new("http://127.0.0.1:9"));
        for id in ["..", ".", " "] {
            let err = client
                .fetch_survey_answers(&SurveyContext {
                    account_id: "a1".into(),
                    survey_response_id: id.into(),
                })
                .await
                .unwrap_err();
            assert_eq!(err.operation, "fetchSurveyAnswers");
            assert!(err.message.contains("invalid surveyResponseId"));
        }
    }

    #[test]
    fn test_response_body_parses_mixed_answers() {
        let body: SurveyResponseBody = serde_json::from_str(
            r#"{"answers": {"age": 71, "lives_alone": true, "goals": ["sleep_better"], "mood": "ok"}}"#,
        )
        .unwrap();
        assert_eq!(body.answers.len(), 4);
    }

    #[tokio::test]
    async fn test_unreachable_provider_names_operation() {
        let mut config = SurveyClientConfig::new("http://127.0.0.1:9");
        config.request_timeout = Duration::from_millis(200);
        let client = HttpSurveyClient::new(config);

        let err = client
            .fetch_survey_answers(&SurveyContext {
                account_id: "a1".into(),
                survey_response_id: "r1".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.operation, "fetchSurveyAnswers");
    }

    #[tokio::test]
    async fn test_offline_provider() {
        let provider = OfflineSurveyProvider;
        assert!(provider
            .fetch_survey_answers(&SurveyContext {
                account_id: "a1".into(),
                survey_response_id: "r1".into(),
            })
            .await
            .is_err());
        tokio_test::assert_ok!(provider.trigger_follow_up("a1", "p1").await);
    }
}
