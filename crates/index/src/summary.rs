use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use websift_core::config::SummaryConfig;
use websift_core::SiftError;

/// Content beyond this is not worth sending to the model for a summary.
const MAX_SUMMARY_INPUT_CHARS: usize = 5000;

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
}

/// Thin client for the text-generation API used to summarize page content.
/// An external collaborator: failures degrade to "no summary" upstream.
#[derive(Clone)]
pub struct SummaryClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl SummaryClient {
    pub fn new(config: &SummaryConfig, api_base: &str, api_key: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        }
    }

    pub async fn summarize(&self, content: &str, max_words: usize) -> Result<String, SiftError> {
        let truncated: String = content.chars().take(MAX_SUMMARY_INPUT_CHARS).collect();
        let prompt = format!(
            "Summarize the following content in {max_words} words or less. \
             Be concise and capture the key points:\n\n{truncated}"
        );

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base, self.model, self.api_key
        );

        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SiftError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SiftError::Fetch(format!(
                "summary API returned {}",
                response.status()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| SiftError::Fetch(format!("malformed summary response: {e}")))?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text.trim().to_string())
            .ok_or_else(|| SiftError::Fetch("summary response had no candidates".to_string()))?;

        debug!(chars = text.len(), "generated summary");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn summarize_extracts_first_candidate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [
                    { "content": { "parts": [ { "text": "  A short summary.  " } ] } }
                ]
            })))
            .mount(&server)
            .await;

        let client = SummaryClient::new(&SummaryConfig::default(), &server.uri(), "k".into());
        let summary = client.summarize("long content", 50).await.unwrap();
        assert_eq!(summary, "A short summary.");
    }

    #[tokio::test]
    async fn summarize_surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = SummaryClient::new(&SummaryConfig::default(), &server.uri(), "k".into());
        assert!(client.summarize("content", 50).await.is_err());
    }
}
