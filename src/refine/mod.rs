//! Optional LLM pass over the heuristic result.
//!
//! Everything here degrades: a failed or nonsensical model call hands back the
//! baseline assessment untouched, and the owner overview simply comes back empty.

pub mod prompt;

use crate::models::AssessmentResult;
use prompt::{apply_refinement, clean_overview, overview_prompt, refine_prompt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

pub use prompt::ListingContext;

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(800);
const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

impl LlmSettings {
    /// Refinement defaults for the given key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: "claude-haiku-4-5".to_string(),
            timeout_secs: 10,
            max_tokens: 512,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("response carried no text content")]
    EmptyResponse,

    #[error("could not build prompt: {0}")]
    Prompt(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Client for an Anthropic-style messages endpoint
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    settings: LlmSettings,
    backoff: Duration,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            settings,
            backoff: RETRY_BACKOFF,
        })
    }

    /// Override the pause between attempts
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Nudge the baseline with the model's judgement. Never fails: any error
    /// returns a clone of `baseline`.
    pub async fn refine(&self, baseline: &AssessmentResult, context: &ListingContext) -> AssessmentResult {
        let text = match refine_prompt(baseline, context) {
            Ok(user) => self.complete(prompt::REFINE_SYSTEM_PROMPT, &user).await,
            Err(e) => Err(LlmError::from(e)),
        };

        let text = match text {
            Ok(text) => text,
            Err(e) => {
                warn!(model = %self.settings.model, error = %e, "refinement call failed, keeping heuristic result");
                return baseline.clone();
            }
        };

        match apply_refinement(baseline, &text) {
            Ok(refined) => {
                info!(
                    model = %self.settings.model,
                    before = baseline.overall,
                    after = refined.overall,
                    fixes = refined.top_fixes.len(),
                    "assessment refined"
                );
                refined
            }
            Err(reason) => {
                warn!(model = %self.settings.model, reason = %reason, "unusable refinement response, keeping heuristic result");
                baseline.clone()
            }
        }
    }

    /// Short narrative for the host; `None` on any failure
    pub async fn generate_overview(&self, assessment: &AssessmentResult, context: &ListingContext) -> Option<String> {
        let user = match overview_prompt(assessment, context) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "could not build overview prompt");
                return None;
            }
        };
        match self.complete(prompt::OVERVIEW_SYSTEM_PROMPT, &user).await {
            Ok(text) => clean_overview(&text),
            Err(e) => {
                warn!(model = %self.settings.model, error = %e, "overview generation failed");
                None
            }
        }
    }

    /// One completion with fixed-backoff retries on transport errors and non-2xx statuses
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let request = MessagesRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            temperature: TEMPERATURE,
            system,
            messages: vec![Message {
                role: "user",
                content: user,
            }],
        };

        let mut last_error = LlmError::EmptyResponse;
        for attempt in 1..=MAX_ATTEMPTS {
            if attempt > 1 {
                debug!(attempt, backoff_ms = self.backoff.as_millis() as u64, "retrying LLM call");
                tokio::time::sleep(self.backoff).await;
            }

            let response = match self
                .client
                .post(&self.settings.endpoint)
                .header("x-api-key", &self.settings.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&request)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = LlmError::Request(e);
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                last_error = LlmError::Http { status, body };
                continue;
            }

            let body: MessagesResponse = response.json().await?;
            return body
                .content
                .into_iter()
                .find_map(|block| block.text)
                .filter(|text| !text.trim().is_empty())
                .ok_or(LlmError::EmptyResponse);
        }
        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AmenityAudit, CopyStats, Impact, PhotoStats, SectionScores, TopFix, TrustSignals};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn baseline() -> AssessmentResult {
        AssessmentResult {
            overall: 70,
            section_scores: SectionScores {
                photos: 55,
                copy: 80,
                amenities_clarity: 75,
                trust_signals: 70,
            },
            photo_stats: PhotoStats::default(),
            copy_stats: CopyStats::default(),
            amenities: AmenityAudit {
                listed: vec!["Wifi".into(), "Hot tub".into()],
                text_hits: vec!["Wifi".into()],
                likely_present_not_listed: vec![],
                listed_no_text_evidence: vec!["Hot tub".into()],
            },
            trust_signals: TrustSignals::default(),
            top_fixes: vec![TopFix::new(Impact::High, "Too few gallery photos", "Upload more")],
            refined: false,
            bonus_summary: None,
            owner_overview: None,
        }
    }

    fn client_for(server: &MockServer) -> LlmClient {
        let settings = LlmSettings {
            endpoint: format!("{}/v1/messages", server.uri()),
            timeout_secs: 5,
            ..LlmSettings::new("test-key")
        };
        LlmClient::new(settings).unwrap().with_backoff(Duration::from_millis(5))
    }

    fn text_response(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": text}]
        }))
    }

    #[tokio::test]
    async fn refine_applies_model_output() {
        let server = MockServer::start().await;
        let reply = json!({
            "overall_adjustment": 3,
            "top_fixes": [{"impact": "medium", "reason": "Mention the hot tub", "how_to_fix": "Add a line about it"}],
            "amenities": {"text_hits": ["Wifi", "Hot tub"], "listed_no_text_evidence": []}
        });
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(text_response(&format!("```json\n{reply}\n```")))
            .expect(1)
            .mount(&server)
            .await;

        let refined = client_for(&server).refine(&baseline(), &ListingContext::default()).await;
        assert!(refined.refined);
        assert_eq!(refined.overall, 73);
        assert_eq!(refined.top_fixes[0].reason, "Mention the hot tub");
        assert_eq!(refined.amenities.text_hits, vec!["Wifi", "Hot tub"]);
        assert!(refined.amenities.listed_no_text_evidence.is_empty());
        assert_eq!(refined.section_scores, baseline().section_scores);
    }

    #[tokio::test]
    async fn refine_retries_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(text_response(r#"{"overall_adjustment": -2}"#))
            .mount(&server)
            .await;

        let refined = client_for(&server).refine(&baseline(), &ListingContext::default()).await;
        assert_eq!(refined.overall, 68);
        assert_eq!(refined.top_fixes, baseline().top_fixes);
    }

    #[tokio::test]
    async fn persistent_errors_fall_back_after_three_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(3)
            .mount(&server)
            .await;

        let refined = client_for(&server).refine(&baseline(), &ListingContext::default()).await;
        assert_eq!(refined, baseline());
    }

    #[tokio::test]
    async fn malformed_json_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(text_response("Sure! Here is my assessment: great listing"))
            .mount(&server)
            .await;

        let refined = client_for(&server).refine(&baseline(), &ListingContext::default()).await;
        assert_eq!(refined, baseline());
    }

    #[tokio::test]
    async fn overview_returns_text_or_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(text_response("Your hot tub is a standout. Lead with it in the first line."))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let overview = client.generate_overview(&baseline(), &ListingContext::default()).await;
        assert_eq!(
            overview.as_deref(),
            Some("Your hot tub is a standout. Lead with it in the first line.")
        );

        let overview = client.generate_overview(&baseline(), &ListingContext::default()).await;
        assert!(overview.is_none());
    }
}
