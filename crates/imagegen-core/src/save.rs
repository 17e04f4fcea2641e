//! Writing generated images to disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::image::{GeneratedImage, ImageSource};

const MAX_SLUG_LEN: usize = 40;

#[derive(Debug, Error)]
pub enum SaveImageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid inline image data: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("download returned HTTP {0}")]
    Status(u16),
}

/// Raw PNG bytes of an image: decoded inline data or a download of the remote URL.
pub async fn fetch_image_bytes(image: &GeneratedImage) -> Result<Vec<u8>, SaveImageError> {
    match &image.source {
        ImageSource::Inline { base64 } => Ok(STANDARD.decode(base64.trim())?),
        ImageSource::Remote { url } => {
            let response = reqwest::get(url).await?;
            if !response.status().is_success() {
                return Err(SaveImageError::Status(response.status().as_u16()));
            }
            Ok(response.bytes().await?.to_vec())
        }
    }
}

/// Save `image` into `dir` under a timestamped name and return the written path.
pub async fn save_image(image: &GeneratedImage, dir: &Path) -> Result<PathBuf, SaveImageError> {
    let bytes = fetch_image_bytes(image).await?;
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name_for(image, Utc::now()));
    write_image_bytes(&bytes, &path)?;
    Ok(path)
}

pub fn write_image_bytes(bytes: &[u8], path: &Path) -> Result<(), SaveImageError> {
    fs::write(path, bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "image saved");
    Ok(())
}

/// `image-<timestamp>-<prompt slug>.png`
pub fn file_name_for(image: &GeneratedImage, now: DateTime<Utc>) -> String {
    format!(
        "image-{}-{}.png",
        now.format("%Y%m%dT%H%M%SZ"),
        prompt_slug(&image.prompt)
    )
}

fn prompt_slug(prompt: &str) -> String {
    let mut slug = String::with_capacity(MAX_SLUG_LEN);
    let mut previous_dash = true;
    for ch in prompt.chars() {
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            previous_dash = false;
        } else if !previous_dash {
            slug.push('-');
            previous_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "image".to_string()
    } else {
        slug
    }
}
