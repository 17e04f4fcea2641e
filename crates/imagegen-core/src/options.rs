//! Option lists backing the image panel's selection fields.

use serde::{Deserialize, Serialize};

pub const SUPPORTED_MODELS: &[&str] = &["dall-e-2", "dall-e-3"];
pub const SUPPORTED_SIZES: &[&str] = &[
    "256x256",
    "512x512",
    "1024x1024",
    "1024x1792",
    "1792x1024",
];
pub const SUPPORTED_QUALITIES: &[&str] = &["standard", "hd"];
pub const SUPPORTED_STYLES: &[&str] = &["vivid", "natural"];

pub const CONFIGURATION_HELP: &str = "Name of the configured image client. \
Corresponds to a [configurations.NAME] table in config.toml.";
pub const SIZE_HELP: &str = "Must be one of 1024x1024, 1792x1024, or 1024x1792 when the model is dall-e-3. \
Must be one of 256x256, 512x512, or 1024x1024 when the model is dall-e-2.";
pub const QUALITY_HELP: &str = "The quality of the image that will be generated. \
'hd' creates images with finer details and greater consistency across the image. \
Only supported by dall-e-3.";
pub const STYLE_HELP: &str = "Vivid leans towards hyper-real and dramatic images. \
Natural produces more natural, less hyper-real looking images. \
Only supported by dall-e-3.";

/// A displayed label paired with the value that gets submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectableOption {
    pub label: String,
    pub value: String,
}

impl SelectableOption {
    /// Option whose label and value are the same text.
    pub fn same(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            label: text.clone(),
            value: text,
        }
    }
}

/// Build an option list from plain strings, one option per entry.
pub fn options_from<I, S>(values: I) -> Vec<SelectableOption>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(SelectableOption::same).collect()
}

/// Value of the first option, or an empty string for an empty list.
pub fn default_value(options: &[SelectableOption]) -> String {
    options
        .first()
        .map(|option| option.value.clone())
        .unwrap_or_default()
}

/// Every option list the panel renders, built once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelOptions {
    pub configurations: Vec<SelectableOption>,
    pub models: Vec<SelectableOption>,
    pub sizes: Vec<SelectableOption>,
    pub qualities: Vec<SelectableOption>,
    pub styles: Vec<SelectableOption>,
}

impl PanelOptions {
    /// Combine the fixed lists with the externally supplied configuration names.
    pub fn new<I, S>(configuration_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            configurations: options_from(configuration_names),
            models: options_from(SUPPORTED_MODELS.iter().copied()),
            sizes: options_from(SUPPORTED_SIZES.iter().copied()),
            qualities: options_from(SUPPORTED_QUALITIES.iter().copied()),
            styles: options_from(SUPPORTED_STYLES.iter().copied()),
        }
    }
}
