//! Core library crate: configuration, data model and transports for image generation.

pub mod config;
pub mod image;
pub mod logging;
pub mod options;
pub mod results;
pub mod save;
pub mod secret_store;
pub mod service;

pub use config::{
    BackendKind, BackendPreferences, ConfigError, ConfigLoadResult, ConfigSource,
    DEFAULT_CONFIGURATION_NAME, FileConfig, ImageModelConfiguration, ResponseFormat,
    SecretValue, ThemePreference, UiPreferences, config_directory, config_path, load_config,
    load_config_from, save_config, save_config_to,
};
pub use image::{GeneratedImage, GenerationRequest, ImageSource};
pub use options::{PanelOptions, SelectableOption};
pub use results::{GalleryItem, ResultEntry, ResultsList, gallery_items};
pub use service::{
    DirectImageService, GenerateError, ImageService, JsonRpcImageService, service_from_config,
};
