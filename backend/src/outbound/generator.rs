//! Reqwest-backed alternative-generator adapter.
//!
//! Owns transport detail only: request shape, timeout, HTTP error mapping,
//! and cleanup of the model's free-text reply into exactly four short
//! alternatives. Recovery (the fixed fallback list) lives in the decision
//! service, keeping the port a two-branch contract.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::domain::decision::ALTERNATIVE_COUNT;
use crate::domain::ports::{AlternativeSource, GeneratorError};

/// Default deadline for one generation call.
pub const DEFAULT_GENERATOR_TIMEOUT: Duration = Duration::from_secs(10);

const SYSTEM_PROMPT: &str = "You are a decision adviser. Produce exactly 4 short, practical, \
     distinct alternatives for the user's dilemma, one per line, at most 15 words each, \
     with no numbering and no extra commentary.";

/// HTTP adapter for the external LLM generation endpoint.
pub struct GeneratorHttpSource {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerationResponseDto {
    text: String,
}

impl GeneratorHttpSource {
    /// Build an adapter with an explicit per-request timeout.
    ///
    /// # Errors
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        endpoint: Url,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl AlternativeSource for GeneratorHttpSource {
    async fn generate(
        &self,
        prompt: &str,
    ) -> Result<[String; ALTERNATIVE_COUNT], GeneratorError> {
        let mut request = self.client.post(self.endpoint.clone()).json(&json!({
            "system": SYSTEM_PROMPT,
            "prompt": format!("Produce 4 distinct alternatives for this dilemma: {prompt}"),
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status));
        }

        let decoded: GenerationResponseDto = serde_json::from_slice(&body)
            .map_err(|err| GeneratorError::decode(format!("invalid generator JSON: {err}")))?;
        parse_alternatives(&decoded.text)
    }
}

/// Clean a free-text reply into exactly [`ALTERNATIVE_COUNT`] alternatives.
///
/// Strips list markers and blank lines the way the model tends to format
/// output; anything shorter than four usable lines is unusable.
fn parse_alternatives(text: &str) -> Result<[String; ALTERNATIVE_COUNT], GeneratorError> {
    let cleaned: Vec<String> = text
        .lines()
        .map(clean_line)
        .filter(|line| line.chars().count() > 3)
        .collect();

    if cleaned.len() < ALTERNATIVE_COUNT {
        return Err(GeneratorError::decode(format!(
            "expected {ALTERNATIVE_COUNT} alternatives, got {}",
            cleaned.len()
        )));
    }
    let mut alternatives: [String; ALTERNATIVE_COUNT] = Default::default();
    for (slot, line) in alternatives.iter_mut().zip(cleaned) {
        *slot = line;
    }
    Ok(alternatives)
}

fn clean_line(line: &str) -> String {
    line.trim()
        .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == '-' || c == ' ')
        .to_string()
}

fn map_transport_error(error: reqwest::Error) -> GeneratorError {
    if error.is_timeout() {
        GeneratorError::timeout(error.to_string())
    } else {
        GeneratorError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode) -> GeneratorError {
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            GeneratorError::timeout(format!("status {}", status.as_u16()))
        }
        _ => GeneratorError::transport(format!("status {}", status.as_u16())),
    }
}
