//! UI widgets for the image generation panel

pub mod activity_log;
pub mod config_panel;
pub mod gallery;
pub mod prompt_input;
