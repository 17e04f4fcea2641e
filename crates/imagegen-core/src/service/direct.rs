use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{GenerateError, ImageService};
use crate::config::{FileConfig, ImageModelConfiguration};
use crate::image::{GeneratedImage, GenerationRequest, ImageSource};

/// Calls `POST {base_url}/images/generations` on an OpenAI-compatible provider.
pub struct DirectImageService {
    client: reqwest::Client,
    configurations: BTreeMap<String, ImageModelConfiguration>,
}

#[derive(Debug, Serialize)]
struct ImagesRequestBody<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    quality: &'a str,
    style: &'a str,
    response_format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
    b64_json: Option<String>,
    revised_prompt: Option<String>,
}

impl DirectImageService {
    pub fn new(config: &FileConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: &FileConfig) -> Self {
        Self {
            client,
            configurations: config.configurations.clone(),
        }
    }

    fn endpoint(configuration: &ImageModelConfiguration) -> String {
        format!(
            "{}/images/generations",
            configuration.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ImageService for DirectImageService {
    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedImage, GenerateError> {
        let configuration = self
            .configurations
            .get(&request.configuration)
            .ok_or_else(|| GenerateError::UnknownConfiguration(request.configuration.clone()))?;

        let api_key = configuration.resolve_api_key(&request.configuration)?;
        let body = ImagesRequestBody {
            model: &request.model_name,
            prompt: &request.prompt,
            n: 1,
            size: &request.size,
            quality: &request.quality,
            style: &request.style,
            response_format: configuration.response_format.as_str(),
            user: configuration.user.as_deref(),
        };

        let endpoint = Self::endpoint(configuration);
        info!(
            configuration = %request.configuration,
            model = %request.model_name,
            size = %request.size,
            "requesting image generation"
        );
        if configuration.log_requests {
            debug!(endpoint = %endpoint, body = ?body, "image generation request");
        }

        let mut builder = self
            .client
            .post(&endpoint)
            .timeout(Duration::from_secs(configuration.timeout_secs))
            .json(&body);
        match api_key {
            Some(key) => builder = builder.bearer_auth(key),
            None => warn!(
                configuration = %request.configuration,
                "no API key configured; sending unauthenticated request"
            ),
        }
        if let Some(organization) = configuration.organization_id.as_deref() {
            builder = builder.header("OpenAI-Organization", organization);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if configuration.log_responses {
            debug!(status = status.as_u16(), body = %text, "image generation response");
        }

        if !status.is_success() {
            return Err(GenerateError::Service {
                status: Some(status.as_u16()),
                payload: error_payload(&text),
            });
        }

        let parsed: ImagesResponse =
            serde_json::from_str(&text).map_err(|err| GenerateError::Malformed(err.to_string()))?;
        let first = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| GenerateError::Malformed("response contained no images".to_string()))?;

        let source = match (first.url, first.b64_json) {
            (Some(url), _) if !url.is_empty() => ImageSource::Remote { url },
            (_, Some(base64)) if !base64.is_empty() => ImageSource::Inline { base64 },
            _ => {
                return Err(GenerateError::Malformed(
                    "image carried neither url nor b64_json".to_string(),
                ));
            }
        };

        Ok(GeneratedImage {
            source,
            prompt: request.prompt,
            revised_prompt: first.revised_prompt,
        })
    }
}

/// The body's `error` object when present, the whole JSON body otherwise, else the raw text.
fn error_payload(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(mut body) => match body.get_mut("error") {
            Some(error) => error.take(),
            None => body,
        },
        Err(_) => json!({ "message": text }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let configuration = ImageModelConfiguration {
            base_url: "https://api.example.test/v1/".to_string(),
            ..ImageModelConfiguration::default()
        };
        assert_eq!(
            DirectImageService::endpoint(&configuration),
            "https://api.example.test/v1/images/generations"
        );
    }

    #[test]
    fn error_payload_unwraps_error_object() {
        let payload = error_payload(
            r#"{"error":{"message":"Invalid size","type":"invalid_request_error"}}"#,
        );
        assert_eq!(payload["message"], "Invalid size");
    }

    #[test]
    fn error_payload_keeps_plain_text() {
        let payload = error_payload("Bad Gateway");
        assert_eq!(payload, json!({ "message": "Bad Gateway" }));
    }
}
