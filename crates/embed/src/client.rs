use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use websift_core::config::EmbeddingConfig;
use websift_core::SiftError;

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_CAP_SECS: u64 = 10;
const BATCH_SIZE: usize = 100;
const BATCH_PAUSE_MS: u64 = 500;

/// Task type sent to the embedding API. Document and query vectors live in
/// the same space but the model treats the roles asymmetrically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingTask {
    Document,
    Query,
}

impl EmbeddingTask {
    fn api_value(self) -> &'static str {
        match self {
            EmbeddingTask::Document => "RETRIEVAL_DOCUMENT",
            EmbeddingTask::Query => "RETRIEVAL_QUERY",
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: RequestContent<'a>,
    #[serde(rename = "taskType")]
    task_type: &'static str,
    #[serde(rename = "outputDimensionality")]
    output_dimensionality: usize,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Remote embedding client with retry, backoff, and batched fan-out.
#[derive(Clone)]
pub struct EmbeddingClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl EmbeddingClient {
    pub fn new(config: &EmbeddingConfig, api_key: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            dimension: config.dimension,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub async fn embed_document(&self, text: &str) -> Result<Vec<f32>, SiftError> {
        self.embed_with_retry(text, EmbeddingTask::Document).await
    }

    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>, SiftError> {
        self.embed_with_retry(query, EmbeddingTask::Query).await
    }

    /// Embed `texts` in groups of at most 100, all items of a group in
    /// flight at once, with a short pause between groups. Returns vectors in
    /// input order, or the first error after retries are exhausted.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SiftError> {
        let mut all = Vec::with_capacity(texts.len());

        for (group_idx, group) in texts.chunks(BATCH_SIZE).enumerate() {
            if group_idx > 0 {
                tokio::time::sleep(Duration::from_millis(BATCH_PAUSE_MS)).await;
            }
            let results = join_all(
                group
                    .iter()
                    .map(|t| self.embed_with_retry(t, EmbeddingTask::Document)),
            )
            .await;
            for result in results {
                all.push(result?);
            }
        }

        Ok(all)
    }

    async fn embed_with_retry(
        &self,
        text: &str,
        task: EmbeddingTask,
    ) -> Result<Vec<f32>, SiftError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.embed_once(text, task).await {
                Ok(vector) => return Ok(vector),
                // a wrong-sized vector will not fix itself on retry
                Err(e @ SiftError::DimensionMismatch { .. }) => return Err(e),
                Err(e) if attempt < MAX_ATTEMPTS => {
                    let backoff = (1u64 << (attempt - 1)).min(BACKOFF_CAP_SECS);
                    warn!(attempt, backoff_secs = backoff, error = %e, "embedding call failed, retrying");
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "embedding call failed, giving up");
                    return Err(e);
                }
            }
        }
    }

    async fn embed_once(&self, text: &str, task: EmbeddingTask) -> Result<Vec<f32>, SiftError> {
        let url = format!(
            "{}/{}:embedContent?key={}",
            self.api_base, self.model, self.api_key
        );

        let request = EmbedRequest {
            model: &self.model,
            content: RequestContent {
                parts: [RequestPart { text }],
            },
            task_type: task.api_value(),
            output_dimensionality: self.dimension,
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SiftError::Embed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SiftError::Embed(format!(
                "embedding API returned {}",
                response.status()
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| SiftError::Embed(format!("malformed embedding response: {e}")))?;

        let values = body.embedding.values;
        if values.len() != self.dimension {
            return Err(SiftError::DimensionMismatch {
                got: values.len(),
                expected: self.dimension,
            });
        }

        debug!(chars = text.len(), task = task.api_value(), "embedded text");
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server_uri: &str, dimension: usize) -> EmbeddingConfig {
        EmbeddingConfig {
            model: "models/test-embedder".to_string(),
            dimension,
            chunk_size: 1000,
            chunk_overlap: 200,
            api_base: server_uri.to_string(),
        }
    }

    fn embedding_body(values: Vec<f32>) -> serde_json::Value {
        json!({ "embedding": { "values": values } })
    }

    #[tokio::test]
    async fn embed_query_returns_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r":embedContent$"))
            .and(body_string_contains("RETRIEVAL_QUERY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(vec![0.5; 4])))
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(&test_config(&server.uri(), 4), "k".into());
        let vector = client.embed_query("fox").await.unwrap();
        assert_eq!(vector.len(), 4);
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(vec![1.0; 4])))
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(&test_config(&server.uri(), 4), "k".into());
        let vector = client.embed_document("text").await.unwrap();
        assert_eq!(vector, vec![1.0; 4]);
    }

    #[tokio::test]
    async fn exhausted_retries_propagate_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(&test_config(&server.uri(), 4), "k".into());
        let err = client.embed_document("text").await.unwrap_err();
        assert!(matches!(err, SiftError::Embed(_)));
    }

    #[tokio::test]
    async fn wrong_dimension_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(vec![1.0; 3])))
            .expect(1)
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(&test_config(&server.uri(), 4), "k".into());
        let err = client.embed_document("text").await.unwrap_err();
        assert!(matches!(
            err,
            SiftError::DimensionMismatch { got: 3, expected: 4 }
        ));
    }

    #[tokio::test]
    async fn batch_preserves_input_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("alpha"))
            .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(vec![1.0, 0.0])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("beta"))
            .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(vec![0.0, 1.0])))
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(&test_config(&server.uri(), 2), "k".into());
        let vectors = client
            .embed_batch(&["alpha".to_string(), "beta".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }
}
