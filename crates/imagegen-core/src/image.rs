//! Request and result types exchanged with image generation backends.

use serde::{Deserialize, Serialize};

/// MIME prefix used when an inline image is shown as a data URI.
pub const INLINE_PNG_PREFIX: &str = "data:image/png;base64,";

/// Parameters of one generation call, taken verbatim from the panel fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub configuration: String,
    pub model_name: String,
    pub prompt: String,
    pub size: String,
    pub quality: String,
    pub style: String,
}

/// Where the pixels of a generated image live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Hosted by the provider.
    Remote { url: String },
    /// Base64-encoded PNG returned inline.
    Inline { base64: String },
}

impl ImageSource {
    /// Value usable as an image `src`: the URL itself or a PNG data URI.
    pub fn src(&self) -> String {
        match self {
            ImageSource::Remote { url } => url.clone(),
            ImageSource::Inline { base64 } => format!("{INLINE_PNG_PREFIX}{base64}"),
        }
    }
}

/// A successful generation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireImage", into = "WireImage")]
pub struct GeneratedImage {
    pub source: ImageSource,
    /// Prompt the image was generated from.
    pub prompt: String,
    /// Prompt after provider-side rewriting, when the provider reports one.
    pub revised_prompt: Option<String>,
}

impl GeneratedImage {
    pub fn remote(url: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            source: ImageSource::Remote { url: url.into() },
            prompt: prompt.into(),
            revised_prompt: None,
        }
    }

    pub fn inline(base64: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            source: ImageSource::Inline {
                base64: base64.into(),
            },
            prompt: prompt.into(),
            revised_prompt: None,
        }
    }
}

/// JSON shape used by dashboard backends: `{url?, base64Data?, prompt}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_data: Option<String>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revised_prompt: Option<String>,
}

impl TryFrom<WireImage> for GeneratedImage {
    type Error = String;

    fn try_from(wire: WireImage) -> Result<Self, Self::Error> {
        let url = wire.url.filter(|url| !url.is_empty());
        let base64 = wire.base64_data.filter(|data| !data.is_empty());
        let source = match (url, base64) {
            (Some(url), _) => ImageSource::Remote { url },
            (None, Some(base64)) => ImageSource::Inline { base64 },
            (None, None) => return Err("image carries neither url nor base64Data".to_string()),
        };
        Ok(GeneratedImage {
            source,
            prompt: wire.prompt,
            revised_prompt: wire.revised_prompt,
        })
    }
}

impl From<GeneratedImage> for WireImage {
    fn from(image: GeneratedImage) -> Self {
        let (url, base64_data) = match image.source {
            ImageSource::Remote { url } => (Some(url), None),
            ImageSource::Inline { base64 } => (None, Some(base64)),
        };
        WireImage {
            url,
            base64_data,
            prompt: image.prompt,
            revised_prompt: image.revised_prompt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn remote_source_is_the_url() {
        let image = GeneratedImage::remote("http://x/img.png", "a cat");
        assert_eq!(image.source.src(), "http://x/img.png");
    }

    #[test]
    fn inline_source_is_a_png_data_uri() {
        let image = GeneratedImage::inline("AAA=", "a cat");
        assert_eq!(image.source.src(), "data:image/png;base64,AAA=");
    }

    #[test]
    fn wire_image_prefers_url_over_inline_data() {
        let image: GeneratedImage = serde_json::from_value(json!({
            "url": "http://x/img.png",
            "base64Data": "AAA=",
            "prompt": "a cat"
        }))
        .unwrap();
        assert_eq!(
            image.source,
            ImageSource::Remote {
                url: "http://x/img.png".to_string()
            }
        );
        assert_eq!(image.prompt, "a cat");
    }

    #[test]
    fn wire_image_without_url_falls_back_to_inline() {
        let image: GeneratedImage = serde_json::from_value(json!({
            "url": null,
            "base64Data": "AAA=",
            "prompt": "a dog"
        }))
        .unwrap();
        assert_eq!(image.source.src(), "data:image/png;base64,AAA=");
    }

    #[test]
    fn wire_image_without_any_source_is_rejected() {
        let result = serde_json::from_value::<GeneratedImage>(json!({ "prompt": "nothing" }));
        assert!(result.is_err());
    }

    #[test]
    fn request_serializes_with_camel_case_model_name() {
        let request = GenerationRequest {
            configuration: "cfgA".to_string(),
            model_name: "dall-e-3".to_string(),
            prompt: "a cat".to_string(),
            size: "1024x1024".to_string(),
            quality: "hd".to_string(),
            style: "vivid".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["modelName"], "dall-e-3");
        assert_eq!(value["configuration"], "cfgA");
    }
}
