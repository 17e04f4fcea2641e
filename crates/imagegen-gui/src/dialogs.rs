//! File dialog utilities

use std::path::PathBuf;

/// Ask where to save a generated image, suggesting `default_name`.
pub fn pick_image_destination(default_name: &str) -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Save Generated Image")
        .set_file_name(default_name)
        .add_filter("PNG Images", &["png"])
        .save_file()
}
