use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::LiteLlmConfig;

#[derive(Debug, Error)]
pub enum LiteLlmError {
    #[error("Invalid LiteLLM URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("LiteLLM request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("LiteLLM {operation} failed: status={status}, body={body}")]
    Status {
        operation: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("LiteLLM key generation response did not include a key")]
    MissingKey,
}

pub type Result<T> = std::result::Result<T, LiteLlmError>;

/// `GET /models` body. Entries are kept as the proxy sent them.
#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct GenerateKeyRequest<'a> {
    models: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_alias: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GenerateKeyResponse {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeyInfoResponse {
    #[serde(default)]
    info: Option<KeyInfo>,
}

#[derive(Debug, Deserialize)]
struct KeyInfo {
    #[serde(default)]
    models: Option<Vec<String>>,
}

/// HTTP client for the LiteLLM proxy admin API.
///
/// Every call authenticates with the master key. Connection failures are
/// retried up to `max_retries` times; any non-200 response is an error.
#[derive(Debug, Clone)]
pub struct LiteLlmClient {
    client: Client,
    base_url: Url,
    master_key: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl LiteLlmClient {
    pub fn new(config: &LiteLlmConfig) -> Result<Self> {
        let base_url =
            Url::parse(config.url.trim_end_matches('/')).map_err(|source| {
                LiteLlmError::InvalidUrl {
                    url: config.url.clone(),
                    source,
                }
            })?;

        let client = Client::builder()
            .user_agent("Mama/1.0")
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url,
            master_key: config.master_key.clone(),
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let url = format!("{}{path}", self.base_url.as_str().trim_end_matches('/'));
        Url::parse(&url).map_err(|source| LiteLlmError::InvalidUrl { url, source })
    }

    /// Sends the request, retrying connection failures, and requires a 200.
    ///
    /// Every outcome is counted in `litellm_requests_total{operation,status}`.
    async fn call(
        &self,
        operation: &'static str,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<Response> {
        let mut attempt = 0;
        let response = loop {
            match build().bearer_auth(&self.master_key).send().await {
                Ok(response) => break response,
                Err(e) if e.is_connect() && attempt < self.max_retries => {
                    attempt += 1;
                    metrics::counter!("litellm_retries_total", "operation" => operation)
                        .increment(1);
                    warn!(
                        error = %e,
                        operation,
                        attempt,
                        max_retries = self.max_retries,
                        "LiteLLM unreachable, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    record_call(operation, "unreachable");
                    return Err(e.into());
                }
            }
        };

        let status = response.status();
        record_call(operation, status.as_str());
        if status == StatusCode::OK {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(LiteLlmError::Status {
            operation,
            status,
            body,
        })
    }

    pub async fn list_models(&self) -> Result<Vec<Value>> {
        let url = self.endpoint("/models")?;
        let response = self
            .call("model list", || self.client.get(url.clone()))
            .await?;

        let models: ModelsResponse = response.json().await?;

        debug!("Fetched {} models from LiteLLM", models.data.len());
        Ok(models.data)
    }

    pub async fn generate_key(
        &self,
        models: &[String],
        user_id: Option<&str>,
        metadata: Option<&Value>,
        key_alias: Option<&str>,
    ) -> Result<String> {
        let url = self.endpoint("/key/generate")?;
        let payload = GenerateKeyRequest {
            models,
            user_id: user_id.filter(|s| !s.is_empty()),
            metadata: metadata.filter(|m| !m.is_null()),
            key_alias: key_alias.filter(|s| !s.is_empty()),
        };

        let response = self
            .call("key generation", || self.client.post(url.clone()).json(&payload))
            .await?;

        let generated: GenerateKeyResponse = response.json().await?;

        match generated.key.or(generated.token) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(LiteLlmError::MissingKey),
        }
    }

    pub async fn delete_key(&self, key: &str) -> Result<()> {
        let url = self.endpoint("/key/delete")?;
        let payload = serde_json::json!({ "keys": [key] });

        self.call("key deletion", || self.client.post(url.clone()).json(&payload))
            .await?;
        Ok(())
    }

    pub async fn update_key_alias(&self, key: &str, key_alias: &str) -> Result<()> {
        let url = self.endpoint("/key/update")?;
        let payload = serde_json::json!({ "key": key, "key_alias": key_alias });

        self.call("key alias update", || self.client.post(url.clone()).json(&payload))
            .await?;
        Ok(())
    }

    pub async fn update_key_models(&self, key: &str, models: &[String]) -> Result<()> {
        let url = self.endpoint("/key/update")?;
        let payload = serde_json::json!({ "key": key, "models": models });

        self.call("key model update", || self.client.post(url.clone()).json(&payload))
            .await?;
        Ok(())
    }

    /// Models the key may call, or `None` when the proxy reports no restriction.
    pub async fn get_key_models(&self, key: &str) -> Result<Option<Vec<String>>> {
        let mut url = self.endpoint("/key/info")?;
        url.query_pairs_mut().append_pair("key", key);

        let response = self
            .call("key info", || self.client.get(url.clone()))
            .await?;

        let info: KeyInfoResponse = response.json().await?;

        Ok(info.info.and_then(|i| i.models))
    }
}

fn record_call(operation: &'static str, status: &str) {
    metrics::counter!(
        "litellm_requests_total",
        "operation" => operation,
        "status" => status.to_string()
    )
    .increment(1);
}
