//! Bound form state for the image generation panel.

use imagegen_core::GenerationRequest;
use imagegen_core::options::{PanelOptions, default_value};

/// Current values of the panel's fields. Widgets edit these in place; submissions
/// read them from here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelState {
    pub options: PanelOptions,
    pub configuration: String,
    pub model_name: String,
    pub prompt: String,
    pub size: String,
    pub quality: String,
    pub style: String,
}

impl PanelState {
    /// Every selection starts at the first entry of its list.
    pub fn new(options: PanelOptions) -> Self {
        Self {
            configuration: default_value(&options.configurations),
            model_name: default_value(&options.models),
            prompt: String::new(),
            size: default_value(&options.sizes),
            quality: default_value(&options.qualities),
            style: default_value(&options.styles),
            options,
        }
    }

    pub fn to_request(&self) -> GenerationRequest {
        GenerationRequest {
            configuration: self.configuration.clone(),
            model_name: self.model_name.clone(),
            prompt: self.prompt.clone(),
            size: self.size.clone(),
            quality: self.quality.clone(),
            style: self.style.clone(),
        }
    }
}
