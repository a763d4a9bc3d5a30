//! Content enrichment oracle.
//!
//! Turns a scored material subset into a draft project (name, steps, tools)
//! and a rendered preview reference. The oracle is an opaque external
//! service: possibly slow, possibly failing. Production code uses
//! `HttpOracle` against an Ollama-style endpoint; test code uses `FakeOracle`
//! with scripted responses so the pipeline is deterministic without a
//! network.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;
use upcycle_common::{DraftProject, Material, OracleConfig, OracleError, ScoreResult};

/// External content-generation capability, one call per subset.
#[async_trait]
pub trait EnrichmentOracle: Send + Sync {
    /// Draft a project for the given materials. May time out or fail;
    /// the caller owns the fallback path.
    async fn draft_project(
        &self,
        materials: &[Material],
        score_hint: &ScoreResult,
    ) -> Result<DraftProject, OracleError>;

    /// Render a preview image for a draft, returning an image reference.
    async fn render_preview(&self, draft: &DraftProject) -> Result<String, OracleError>;
}

/// Real oracle over an Ollama-style HTTP endpoint.
pub struct HttpOracle {
    config: OracleConfig,
    client: reqwest::Client,
}

impl HttpOracle {
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OracleError::Http(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn draft_prompt(materials: &[Material], score_hint: &ScoreResult) -> String {
        let inventory: Vec<String> = materials
            .iter()
            .map(|m| {
                format!(
                    "- {} ({}, {} {}, condition {})",
                    m.name, m.material_type, m.available_quantity, m.unit, m.condition
                )
            })
            .collect();
        format!(
            "You are an upcycling project designer. Design one buildable project that \
             uses ALL of these reclaimed materials:\n{}\n\n\
             Feasibility {}/100, sustainability {}/100.\n\
             Respond with valid JSON only, matching this schema:\n\
             {{\"name\": string, \"description\": string, \
             \"difficulty\": \"easy\"|\"medium\"|\"hard\", \
             \"estimated_time_minutes\": integer, \
             \"materials\": [{{\"name\": string, \"quantity\": number, \"unit\": string, \
             \"usage_percentage\": number}}], \
             \"tools\": [{{\"name\": string, \"essential\": boolean, \"alternative\": string?}}], \
             \"instructions\": [string], \"techniques\": [string]}}",
            inventory.join("\n"),
            score_hint.feasibility,
            score_hint.sustainability,
        )
    }

    /// Map a reqwest failure onto the oracle taxonomy.
    fn request_error(&self, e: reqwest::Error) -> OracleError {
        if e.is_timeout() {
            OracleError::Timeout(self.config.timeout_secs)
        } else {
            OracleError::Http(format!("request failed: {e}"))
        }
    }
}

/// Models wrap JSON in prose or code fences; cut out the outermost object.
fn extract_json_object(text: &str) -> Result<&str, OracleError> {
    let start = text
        .find('{')
        .ok_or_else(|| OracleError::InvalidResponse("no JSON object in response".to_string()))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| OracleError::InvalidResponse("unterminated JSON object".to_string()))?;
    if end < start {
        return Err(OracleError::InvalidResponse(
            "malformed JSON object in response".to_string(),
        ));
    }
    Ok(&text[start..=end])
}

#[async_trait]
impl EnrichmentOracle for HttpOracle {
    async fn draft_project(
        &self,
        materials: &[Material],
        score_hint: &ScoreResult,
    ) -> Result<DraftProject, OracleError> {
        if !self.config.enabled {
            return Err(OracleError::Disabled);
        }

        let url = format!("{}/api/generate", self.config.endpoint);
        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": Self::draft_prompt(materials, score_hint),
            "stream": false,
            "format": "json",
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        if !response.status().is_success() {
            return Err(OracleError::Backend(format!(
                "HTTP {} from oracle",
                response.status()
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse(format!("failed to parse response: {e}")))?;

        let text = json
            .get("response")
            .and_then(|v| v.as_str())
            .ok_or(OracleError::EmptyResponse)?;
        if text.trim().is_empty() {
            return Err(OracleError::EmptyResponse);
        }

        debug!("Oracle draft response: {} bytes", text.len());

        let draft: DraftProject = serde_json::from_str(extract_json_object(text)?)
            .map_err(|e| OracleError::InvalidResponse(format!("draft does not match schema: {e}")))?;
        if draft.name.trim().is_empty() {
            return Err(OracleError::InvalidResponse("draft has no name".to_string()));
        }
        Ok(draft)
    }

    async fn render_preview(&self, draft: &DraftProject) -> Result<String, OracleError> {
        if !self.config.enabled {
            return Err(OracleError::Disabled);
        }

        let url = format!("{}/api/render", self.config.endpoint);
        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": format!("Preview image for upcycling project: {}. {}", draft.name, draft.description),
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        if !response.status().is_success() {
            return Err(OracleError::Backend(format!(
                "HTTP {} from renderer",
                response.status()
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse(format!("failed to parse response: {e}")))?;

        json.get("url")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .ok_or(OracleError::EmptyResponse)
    }
}

/// Fake oracle for testing: scripted draft responses, counted calls.
pub struct FakeOracle {
    responses: Mutex<Vec<Result<DraftProject, OracleError>>>,
    call_count: Mutex<usize>,
}

impl FakeOracle {
    /// Responses are consumed in order; the last one repeats forever.
    pub fn new(responses: Vec<Result<DraftProject, OracleError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
        }
    }

    /// Always return the same draft.
    pub fn always(draft: DraftProject) -> Self {
        Self::new(vec![Ok(draft)])
    }

    /// Always fail with the given error.
    pub fn always_error(error: OracleError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl EnrichmentOracle for FakeOracle {
    async fn draft_project(
        &self,
        _materials: &[Material],
        _score_hint: &ScoreResult,
    ) -> Result<DraftProject, OracleError> {
        *self.call_count.lock().unwrap() += 1;
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(OracleError::EmptyResponse);
        }
        if responses.len() == 1 {
            responses[0].clone()
        } else {
            responses.remove(0)
        }
    }

    async fn render_preview(&self, draft: &DraftProject) -> Result<String, OracleError> {
        Ok(format!("fake://preview/{}", draft.name.replace(' ', "-")))
    }
}
