//! Advisory breaking-change assessments from an external model
//!
//! An advisory is displayed next to a verdict and can hide low-confidence
//! entries at display time. It never raises or clears the breaking flag.

use std::fmt;

#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::mask_secret;
use crate::version::error::AdvisoryError;
use crate::version::registries::http_client;

const TEMPERATURE: f64 = 0.3;
const MAX_TOKENS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Unknown labels count as `Low`
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Confidence::High,
            "medium" => Confidence::Medium,
            _ => Confidence::Low,
        }
    }

    /// low=1, medium=2, high=3
    pub fn ordinal(&self) -> u8 {
        match self {
            Confidence::Low => 1,
            Confidence::Medium => 2,
            Confidence::High => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvisorySignal {
    pub breaking: bool,
    pub summary: String,
    pub details: Vec<String>,
    pub confidence: Confidence,
}

#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait BreakingChangeAdvisor: Send + Sync {
    /// Assess one update; `Ok(None)` when the advisor has nothing to say
    async fn analyze(
        &self,
        name: &str,
        current_version: &str,
        latest_version: &str,
        changelog_url: &str,
    ) -> Result<Option<AdvisorySignal>, AdvisoryError>;
}

/// Advisor used when no model is configured
pub struct NoopAdvisor;

#[async_trait::async_trait]
impl BreakingChangeAdvisor for NoopAdvisor {
    async fn analyze(
        &self,
        _name: &str,
        _current_version: &str,
        _latest_version: &str,
        _changelog_url: &str,
    ) -> Result<Option<AdvisorySignal>, AdvisoryError> {
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    error: Option<ChatError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatError {
    message: String,
    #[serde(rename = "type", default)]
    error_type: String,
}

/// Shape the model is asked to reply with
#[derive(Debug, Deserialize)]
struct ModelVerdict {
    #[serde(default)]
    has_breaking_changes: bool,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    details: Vec<String>,
    #[serde(default)]
    confidence: String,
}

/// Advisor backed by an OpenAI-compatible chat completions endpoint
pub struct OpenAiAdvisor {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiAdvisor {
    pub fn new(api_key: &str, model: &str, base_url: &str) -> Result<Self, AdvisoryError> {
        if api_key.is_empty() {
            return Err(AdvisoryError::MissingApiKey);
        }
        Ok(Self {
            client: http_client(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_prompt(name: &str, current: &str, latest: &str, changelog_url: &str) -> String {
        format!(
            r#"You are an expert in analyzing Terraform module and provider updates for breaking changes.

Analyze the upgrade from version {current} to {latest} for the following module/provider:
Module/Provider: {name}
Changelog URL: {changelog_url}

Please analyze if this update contains breaking changes. Consider:
1. API changes (removed variables, changed types, new required variables)
2. Resource replacements or deletions
3. Major behavioral changes
4. Deprecations that affect functionality

Respond ONLY with valid JSON in this exact format (no markdown, no code blocks):
{{
  "has_breaking_changes": true or false,
  "summary": "Brief summary of the changes (1-2 sentences)",
  "details": ["detail 1", "detail 2", "detail 3"],
  "confidence": "high, medium, or low"
}}

If you cannot determine the answer with certainty, set confidence to "low" or "medium"."#
        )
    }

    async fn complete(&self, prompt: String) -> Result<String, AdvisoryError> {
        let endpoint = format!("{}/chat/completions", self.base_url);
        debug!(
            "Calling advisory endpoint {} with model {} (key {})",
            endpoint,
            self.model,
            mask_secret(&self.api_key)
        );

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": prompt }],
                "temperature": TEMPERATURE,
                "max_tokens": MAX_TOKENS,
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AdvisoryError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| AdvisoryError::InvalidResponse(e.to_string()))?;
        if let Some(error) = chat.error {
            return Err(AdvisoryError::InvalidResponse(format!(
                "{} ({})",
                error.message, error.error_type
            )));
        }

        chat.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AdvisoryError::InvalidResponse("no choices in response".to_string()))
    }
}

/// Parse the JSON object embedded in a model reply
pub fn parse_reply(reply: &str) -> Result<AdvisorySignal, AdvisoryError> {
    let (Some(start), Some(end)) = (reply.find('{'), reply.rfind('}')) else {
        return Err(AdvisoryError::InvalidResponse(
            "no JSON found in response".to_string(),
        ));
    };
    if end < start {
        return Err(AdvisoryError::InvalidResponse(
            "no JSON found in response".to_string(),
        ));
    }

    let verdict: ModelVerdict = serde_json::from_str(&reply[start..=end])
        .map_err(|e| AdvisoryError::InvalidResponse(e.to_string()))?;

    Ok(AdvisorySignal {
        breaking: verdict.has_breaking_changes,
        summary: verdict.summary,
        details: verdict.details,
        confidence: Confidence::parse_lenient(&verdict.confidence),
    })
}

#[async_trait::async_trait]
impl BreakingChangeAdvisor for OpenAiAdvisor {
    async fn analyze(
        &self,
        name: &str,
        current_version: &str,
        latest_version: &str,
        changelog_url: &str,
    ) -> Result<Option<AdvisorySignal>, AdvisoryError> {
        debug!(
            "Requesting advisory for {} {} -> {}",
            name, current_version, latest_version
        );
        let prompt = Self::build_prompt(name, current_version, latest_version, changelog_url);
        let reply = self.complete(prompt).await?;
        let signal = parse_reply(&reply)?;

        debug!(
            "Advisory for {}: breaking={} confidence={}",
            name, signal.breaking, signal.confidence
        );
        Ok(Some(signal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use rstest::rstest;

    #[rstest]
    #[case("high", Confidence::High)]
    #[case("Medium", Confidence::Medium)]
    #[case("low", Confidence::Low)]
    #[case("very sure", Confidence::Low)]
    #[case("", Confidence::Low)]
    fn confidence_parses_leniently(#[case] value: &str, #[case] expected: Confidence) {
        assert_eq!(Confidence::parse_lenient(value), expected);
    }

    #[test]
    fn confidence_ordinals_are_ordered() {
        assert_eq!(Confidence::Low.ordinal(), 1);
        assert_eq!(Confidence::Medium.ordinal(), 2);
        assert_eq!(Confidence::High.ordinal(), 3);
    }

    #[test]
    fn parse_reply_extracts_wrapped_json() {
        let reply = "```json\n{\"has_breaking_changes\": true, \"summary\": \"Drops v4 inputs\", \"details\": [\"removed azs\"], \"confidence\": \"maybe\"}\n```";

        let signal = parse_reply(reply).unwrap();

        assert!(signal.breaking);
        assert_eq!(signal.summary, "Drops v4 inputs");
        assert_eq!(signal.details, vec!["removed azs"]);
        assert_eq!(signal.confidence, Confidence::Low);
    }

    #[rstest]
    #[case("no json here")]
    #[case("} backwards {")]
    #[case("{not json}")]
    fn parse_reply_rejects_unusable_text(#[case] reply: &str) {
        assert!(matches!(
            parse_reply(reply),
            Err(AdvisoryError::InvalidResponse(_))
        ));
    }

    #[test]
    fn new_requires_api_key() {
        assert!(matches!(
            OpenAiAdvisor::new("", "gpt-4o-mini", "http://localhost"),
            Err(AdvisoryError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn noop_advisor_returns_nothing() {
        let signal = NoopAdvisor.analyze("vpc", "1.0.0", "2.0.0", "").await.unwrap();
        assert_eq!(signal, None);
    }

    #[tokio::test]
    async fn analyze_posts_chat_completion_and_parses_reply() {
        let mut server = Server::new_async().await;

        let content = r#"{\"has_breaking_changes\": false, \"summary\": \"Bug fixes\", \"details\": [], \"confidence\": \"high\"}"#;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test-key-123456")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4o-mini",
                "max_tokens": 1000
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"choices": [{{"message": {{"role": "assistant", "content": "{}"}}}}]}}"#,
                content
            ))
            .create_async()
            .await;

        let advisor = OpenAiAdvisor::new("sk-test-key-123456", "gpt-4o-mini", &server.url()).unwrap();
        let signal = advisor
            .analyze("vpc", "5.0.0", "5.1.0", "https://example.com/changelog")
            .await
            .unwrap()
            .unwrap();

        mock.assert_async().await;
        assert!(!signal.breaking);
        assert_eq!(signal.summary, "Bug fixes");
        assert_eq!(signal.confidence, Confidence::High);
    }

    #[tokio::test]
    async fn analyze_reports_non_success_status() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error": {"message": "bad key"}}"#)
            .create_async()
            .await;

        let advisor = OpenAiAdvisor::new("sk-test-key-123456", "gpt-4o-mini", &server.url()).unwrap();
        let result = advisor.analyze("vpc", "5.0.0", "5.1.0", "").await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(AdvisoryError::UnexpectedStatus { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn analyze_reports_api_error_payload() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": [], "error": {"message": "model overloaded", "type": "server_error"}}"#)
            .create_async()
            .await;

        let advisor = OpenAiAdvisor::new("sk-test-key-123456", "gpt-4o-mini", &server.url()).unwrap();
        let result = advisor.analyze("vpc", "5.0.0", "5.1.0", "").await;

        mock.assert_async().await;
        assert!(matches!(result, Err(AdvisoryError::InvalidResponse(msg)) if msg.contains("overloaded")));
    }
}
