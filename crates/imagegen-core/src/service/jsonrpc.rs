use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{GenerateError, ImageService};
use crate::image::{GeneratedImage, GenerationRequest};

/// Forwards generation calls to a dashboard backend over JSON-RPC 2.0.
pub struct JsonRpcImageService {
    client: reqwest::Client,
    endpoint: String,
    method: String,
    next_id: AtomicU64,
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a GenerationRequest,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl JsonRpcImageService {
    pub fn new(endpoint: impl Into<String>, method: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint, method)
    }

    pub fn with_client(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            method: method.into(),
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl ImageService for JsonRpcImageService {
    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedImage, GenerateError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        info!(id, method = %self.method, endpoint = %self.endpoint, "sending json-rpc generate");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&RpcRequest {
                jsonrpc: "2.0",
                id,
                method: &self.method,
                params: &request,
            })
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(id, status = status.as_u16(), "json-rpc response received");

        let parsed: RpcResponse = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(err) if status.is_success() => {
                return Err(GenerateError::Malformed(err.to_string()));
            }
            Err(_) => {
                return Err(GenerateError::Service {
                    status: Some(status.as_u16()),
                    payload: json!({ "message": text }),
                });
            }
        };

        if let Some(error) = parsed.error {
            return Err(GenerateError::Service {
                status: Some(status.as_u16()),
                payload: error,
            });
        }

        let result = parsed.result.ok_or_else(|| {
            GenerateError::Malformed("response had neither result nor error".to_string())
        })?;
        let mut image: GeneratedImage = serde_json::from_value(result)
            .map_err(|err| GenerateError::Malformed(err.to_string()))?;
        if image.prompt.is_empty() {
            image.prompt = request.prompt;
        }
        Ok(image)
    }
}
