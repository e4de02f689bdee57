use crate::config::EmbeddingConfig;
use crate::error::EmbeddingError;
use crate::provider::{EmbeddingOutput, EmbeddingProvider, EmbeddingTask, EmbeddingUsage};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    task: &'a str,
    input: &'a [String],
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    model: Option<String>,
    data: Vec<EmbeddingRow>,
    #[serde(default)]
    usage: EmbeddingUsage,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Jina AI embeddings over HTTP.
pub struct JinaEmbeddingProvider {
    http: reqwest::Client,
    api_key: String,
    config: EmbeddingConfig,
}

impl JinaEmbeddingProvider {
    /// Fails immediately when the API key is missing or blank.
    pub fn new(config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        config.validate().map_err(EmbeddingError::InvalidConfig)?;
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(EmbeddingError::MissingApiKey)?
            .to_string();
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        info!(
            "Initialized Jina embedding provider with model {}, dimension {}",
            config.model, config.dimension
        );
        Ok(Self {
            http,
            api_key,
            config,
        })
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    /// POST with exponential backoff on 429, 5xx and transport failures.
    async fn post_with_retry(
        &self,
        request: &EmbeddingRequest<'_>,
    ) -> Result<reqwest::Response, EmbeddingError> {
        let max_attempts = self.config.max_retries.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let backoff = backoff_delay(self.config.retry_base_delay(), attempt);

            match self
                .http
                .post(&self.config.base_url)
                .bearer_auth(&self.api_key)
                .json(request)
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => {
                    let status = resp.status();
                    let retryable =
                        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                    if !retryable || attempt >= max_attempts {
                        if status == StatusCode::TOO_MANY_REQUESTS {
                            return Err(EmbeddingError::RateLimited { attempts: attempt });
                        }
                        let body = resp.text().await.unwrap_or_default();
                        return Err(EmbeddingError::Api {
                            status: status.as_u16(),
                            body,
                        });
                    }
                    warn!(
                        "Embedding request returned {status}, waiting {backoff:?} before retry {attempt}/{max_attempts}"
                    );
                }
                Err(err) => {
                    let transient = err.is_timeout() || err.is_connect() || err.is_request();
                    if !transient || attempt >= max_attempts {
                        return Err(err.into());
                    }
                    warn!("Embedding request failed, retrying in {backoff:?}: {err}");
                }
            }

            tokio::time::sleep(backoff).await;
        }
    }
}

/// `base * 2^(attempt - 1)` for a 1-based attempt number.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}

/// Put rows back in request order and check their shape.
fn order_rows(
    mut rows: Vec<EmbeddingRow>,
    expected: usize,
    dimension: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if rows.len() != expected {
        return Err(EmbeddingError::InvalidResponse(format!(
            "expected {expected} embeddings, got {}",
            rows.len()
        )));
    }

    if rows.iter().all(|row| row.index.is_some()) {
        rows.sort_by_key(|row| row.index);
        for (position, row) in rows.iter().enumerate() {
            if row.index != Some(position) {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "unexpected embedding index {:?} at position {position}",
                    row.index
                )));
            }
        }
    }

    rows.into_iter()
        .map(|row| {
            if row.embedding.len() == dimension {
                Ok(row.embedding)
            } else {
                Err(EmbeddingError::InvalidResponse(format!(
                    "expected dimension {dimension}, got {}",
                    row.embedding.len()
                )))
            }
        })
        .collect()
}

#[async_trait]
impl EmbeddingProvider for JinaEmbeddingProvider {
    fn model(&self) -> &str {
        &self.config.model
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    fn batch_delay(&self) -> Duration {
        self.config.batch_delay()
    }

    async fn embed(
        &self,
        texts: &[String],
        task: EmbeddingTask,
    ) -> Result<EmbeddingOutput, EmbeddingError> {
        if texts.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        if texts.len() > self.config.batch_size {
            return Err(EmbeddingError::BatchTooLarge {
                size: texts.len(),
                limit: self.config.batch_size,
            });
        }

        let request = EmbeddingRequest {
            model: &self.config.model,
            task: task.jina_task(),
            input: texts,
            dimensions: self.config.dimension,
        };
        debug!(
            "Requesting {} embeddings from {} ({})",
            texts.len(),
            self.config.model,
            request.task
        );

        let response: EmbeddingResponse = self
            .post_with_retry(&request)
            .await?
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(format!("failed to parse response: {e}")))?;

        let embeddings = order_rows(response.data, texts.len(), self.config.dimension)?;
        Ok(EmbeddingOutput {
            embeddings,
            model: response.model.unwrap_or_else(|| self.config.model.clone()),
            usage: response.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn config_for(server: &MockServer) -> EmbeddingConfig {
        EmbeddingConfig {
            base_url: format!("{}/v1/embeddings", server.uri()),
            dimension: 3,
            batch_size: 2,
            retry_base_delay_ms: 1,
            batch_delay_ms: 0,
            ..Default::default()
        }
        .with_api_key("test-key")
    }

    fn ok_body(rows: &[(usize, [f32; 3])], tokens: u64) -> Value {
        json!({
            "model": "jina-embeddings-v3",
            "object": "list",
            "usage": { "total_tokens": tokens, "prompt_tokens": tokens },
            "data": rows
                .iter()
                .map(|(index, embedding)| json!({
                    "object": "embedding",
                    "index": index,
                    "embedding": embedding,
                }))
                .collect::<Vec<_>>(),
        })
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_api_key_fails_at_construction() {
        let result = JinaEmbeddingProvider::new(EmbeddingConfig::default());
        assert!(matches!(result, Err(EmbeddingError::MissingApiKey)));

        let result = JinaEmbeddingProvider::new(EmbeddingConfig::default().with_api_key("  "));
        assert!(matches!(result, Err(EmbeddingError::MissingApiKey)));
    }

    #[test]
    fn test_backoff_doubles() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(100));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(200));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_embed_sends_task_and_reorders_rows() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "jina-embeddings-v3",
                "task": "retrieval.passage",
                "dimensions": 3,
                "input": ["first", "second"],
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(ok_body(&[(1, [0.0, 1.0, 0.0]), (0, [1.0, 0.0, 0.0])], 7)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = JinaEmbeddingProvider::new(config_for(&server)).expect("provider");
        let output = provider
            .embed(&texts(&["first", "second"]), EmbeddingTask::Passage)
            .await
            .expect("embed");

        assert_eq!(
            output.embeddings,
            vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]
        );
        assert_eq!(
            output.usage,
            EmbeddingUsage {
                total_tokens: 7,
                prompt_tokens: 7
            }
        );
    }

    #[tokio::test]
    async fn test_query_uses_query_task() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "task": "retrieval.query" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(&[(0, [0.5, 0.5, 0.0])], 2)))
            .expect(1)
            .mount(&server)
            .await;

        let provider = JinaEmbeddingProvider::new(config_for(&server)).expect("provider");
        let vector = provider.embed_query("find the parser").await.expect("embed");
        assert_eq!(vector, vec![0.5, 0.5, 0.0]);
    }

    #[test_log::test(tokio::test)]
    async fn test_rate_limit_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(&[(0, [1.0, 0.0, 0.0])], 1)))
            .expect(1)
            .mount(&server)
            .await;

        let provider = JinaEmbeddingProvider::new(config_for(&server)).expect("provider");
        let output = provider
            .embed(&texts(&["only"]), EmbeddingTask::Passage)
            .await
            .expect("embed after retries");
        assert_eq!(output.embeddings.len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let provider = JinaEmbeddingProvider::new(config_for(&server)).expect("provider");
        let result = provider
            .embed(&texts(&["only"]), EmbeddingTask::Passage)
            .await;
        assert!(matches!(
            result,
            Err(EmbeddingError::RateLimited { attempts: 3 })
        ));
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(&[(0, [1.0, 0.0, 0.0])], 1)))
            .expect(1)
            .mount(&server)
            .await;

        let provider = JinaEmbeddingProvider::new(config_for(&server)).expect("provider");
        let result = provider
            .embed(&texts(&["only"]), EmbeddingTask::Passage)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_bad_request_fails_fast() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("model not found"))
            .expect(1)
            .mount(&server)
            .await;

        let provider = JinaEmbeddingProvider::new(config_for(&server)).expect("provider");
        let err = provider
            .embed(&texts(&["only"]), EmbeddingTask::Passage)
            .await
            .expect_err("400 must fail");
        match err {
            EmbeddingError::Api { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "model not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_count_mismatch_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(&[(0, [1.0, 0.0, 0.0])], 1)))
            .mount(&server)
            .await;

        let provider = JinaEmbeddingProvider::new(config_for(&server)).expect("provider");
        let result = provider
            .embed(&texts(&["one", "two"]), EmbeddingTask::Passage)
            .await;
        assert!(matches!(result, Err(EmbeddingError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "index": 0, "embedding": [1.0, 0.0] }],
            })))
            .mount(&server)
            .await;

        let provider = JinaEmbeddingProvider::new(config_for(&server)).expect("provider");
        let result = provider
            .embed(&texts(&["one"]), EmbeddingTask::Passage)
            .await;
        assert!(matches!(result, Err(EmbeddingError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_oversized_batch_is_rejected_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = JinaEmbeddingProvider::new(config_for(&server)).expect("provider");
        let result = provider
            .embed(&texts(&["a", "b", "c"]), EmbeddingTask::Passage)
            .await;
        assert!(matches!(
            result,
            Err(EmbeddingError::BatchTooLarge { size: 3, limit: 2 })
        ));
    }

    #[tokio::test]
    async fn test_embed_batched_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(|request: &Request| {
                let body: Value = request.body_json().expect("json body");
                let inputs = body["input"].as_array().cloned().unwrap_or_default();
                let rows: Vec<(usize, [f32; 3])> = inputs
                    .iter()
                    .enumerate()
                    .map(|(i, text)| {
                        let len = text.as_str().map_or(0, str::len) as f32;
                        (i, [len, 0.0, 1.0])
                    })
                    .collect();
                ResponseTemplate::new(200).set_body_json(ok_body(&rows, inputs.len() as u64 * 10))
            })
            .expect(3)
            .mount(&server)
            .await;

        let provider = JinaEmbeddingProvider::new(config_for(&server)).expect("provider");
        let output = provider
            .embed_batched(&texts(&["a", "bb", "ccc", "dddd", "eeeee"]), EmbeddingTask::Passage)
            .await
            .expect("embed");

        let lengths: Vec<f32> = output.embeddings.iter().map(|v| v[0]).collect();
        assert_eq!(lengths, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(output.usage.total_tokens, 50);
        assert_eq!(output.usage.prompt_tokens, 50);
    }
}
