//! Outbound generation calls.
//!
//! [`ImageService`] is the only seam the panel talks to. Two transports
//! implement it: [`DirectImageService`] calls an OpenAI-compatible images
//! endpoint, [`JsonRpcImageService`] forwards to a dashboard backend.

mod direct;
mod jsonrpc;

pub use direct::DirectImageService;
pub use jsonrpc::JsonRpcImageService;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use thiserror::Error;

use crate::config::{BackendKind, FileConfig};
use crate::image::{GeneratedImage, GenerationRequest};
use crate::secret_store::SecretStoreError;

/// A request/response image generation backend.
#[async_trait]
pub trait ImageService: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedImage, GenerateError>;
}

/// Why an outbound generation call failed.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service rejected the request: {payload}")]
    Service { status: Option<u16>, payload: Value },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("unknown image model configuration '{0}'")]
    UnknownConfiguration(String),
    #[error("could not read API key: {0}")]
    Secret(#[from] SecretStoreError),
    #[error("generation task failed: {0}")]
    TaskFailed(String),
}

impl GenerateError {
    /// Structured description of the failure, as shown to the user.
    pub fn payload(&self) -> Value {
        match self {
            GenerateError::Service { payload, .. } => payload.clone(),
            other => json!({ "message": other.to_string() }),
        }
    }

    /// The payload serialized as JSON text.
    pub fn notification_message(&self) -> String {
        serde_json::to_string(&self.payload()).unwrap_or_else(|_| self.to_string())
    }
}

/// Build the transport selected by `[backend]` in the configuration.
pub fn service_from_config(config: &FileConfig) -> Arc<dyn ImageService> {
    match (config.backend.kind, config.backend.endpoint.as_deref()) {
        (BackendKind::JsonRpc, Some(endpoint)) => Arc::new(JsonRpcImageService::new(
            endpoint,
            config.backend.method.clone(),
        )),
        _ => Arc::new(DirectImageService::new(config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_error_notifies_with_its_payload() {
        let err = GenerateError::Service {
            status: Some(400),
            payload: json!({ "code": "invalid_size", "message": "bad size" }),
        };
        assert_eq!(
            err.notification_message(),
            r#"{"code":"invalid_size","message":"bad size"}"#
        );
    }

    #[test]
    fn other_errors_notify_with_a_message_object() {
        let err = GenerateError::UnknownConfiguration("nope".to_string());
        let payload = err.payload();
        assert_eq!(
            payload["message"],
            "unknown image model configuration 'nope'"
        );
        assert!(err.notification_message().starts_with("{\"message\":"));
    }
}
