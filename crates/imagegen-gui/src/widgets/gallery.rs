//! Results gallery: one card per generated image, newest first.

use std::collections::HashMap;

use egui::load::SizedTexture;
use imagegen_core::save::fetch_image_bytes;
use imagegen_core::{ImageSource, ResultsList, gallery_items};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::warn;

const MAX_IMAGE_WIDTH: f32 = 512.0;
const MAX_SOURCE_PREVIEW: usize = 64;

/// What the user asked for on a gallery card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryAction {
    Save(u64),
    OpenUrl(String),
}

enum TextureSlot {
    Loading,
    Ready(egui::TextureHandle),
    Failed(String),
}

type FetchedBytes = (u64, Result<Vec<u8>, String>);

/// Decoded textures keyed by result id. Each entry is fetched and decoded once.
pub struct GalleryState {
    textures: HashMap<u64, TextureSlot>,
    fetched_tx: mpsc::UnboundedSender<FetchedBytes>,
    fetched_rx: mpsc::UnboundedReceiver<FetchedBytes>,
}

impl GalleryState {
    pub fn new() -> Self {
        let (fetched_tx, fetched_rx) = mpsc::unbounded_channel();
        Self {
            textures: HashMap::new(),
            fetched_tx,
            fetched_rx,
        }
    }

    /// Turn finished fetches into textures and start fetches for new results.
    pub fn sync(&mut self, ctx: &egui::Context, results: &ResultsList, runtime: &Handle) {
        while let Ok((id, fetched)) = self.fetched_rx.try_recv() {
            let decoded =
                fetched.and_then(|bytes| decode_image(&bytes).map_err(|err| err.to_string()));
            let slot = match decoded {
                Ok(image) => TextureSlot::Ready(ctx.load_texture(
                    format!("generated-image-{id}"),
                    image,
                    egui::TextureOptions::LINEAR,
                )),
                Err(err) => {
                    warn!(id, error = %err, "could not load generated image");
                    TextureSlot::Failed(err)
                }
            };
            self.textures.insert(id, slot);
        }

        for entry in results.iter() {
            if self.textures.contains_key(&entry.id) {
                continue;
            }
            self.textures.insert(entry.id, TextureSlot::Loading);

            let id = entry.id;
            let image = entry.image.clone();
            let fetched_tx = self.fetched_tx.clone();
            let repaint = ctx.clone();
            runtime.spawn(async move {
                let fetched = fetch_image_bytes(&image).await.map_err(|err| err.to_string());
                let _ = fetched_tx.send((id, fetched));
                repaint.request_repaint();
            });
        }
    }

    pub fn is_loading(&self) -> bool {
        self.textures
            .values()
            .any(|slot| matches!(slot, TextureSlot::Loading))
    }
}

impl Default for GalleryState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn decode_image(bytes: &[u8]) -> Result<egui::ColorImage, image::ImageError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(
        size,
        rgba.as_flat_samples().as_slice(),
    ))
}

/// Shortened image source for display; data URIs can be megabytes long.
fn source_preview(src: &str) -> String {
    if src.chars().count() <= MAX_SOURCE_PREVIEW {
        return src.to_string();
    }
    let head: String = src.chars().take(MAX_SOURCE_PREVIEW).collect();
    format!("{head}…")
}

/// Render the gallery
/// Returns the action the user clicked, if any
pub fn render(
    ui: &mut egui::Ui,
    results: &ResultsList,
    state: &GalleryState,
) -> Option<GalleryAction> {
    let items = gallery_items(results);
    if items.is_empty() {
        ui.weak("No images generated yet.");
        return None;
    }

    let mut action = None;
    for (item, entry) in items.iter().zip(results.iter()) {
        ui.group(|ui| {
            ui.set_min_width(ui.available_width());

            match state.textures.get(&item.id) {
                Some(TextureSlot::Ready(texture)) => {
                    let width = ui.available_width().min(MAX_IMAGE_WIDTH);
                    ui.add(
                        egui::Image::from_texture(SizedTexture::from_handle(texture))
                            .max_width(width)
                            .maintain_aspect_ratio(true),
                    );
                }
                Some(TextureSlot::Failed(err)) => {
                    ui.colored_label(egui::Color32::RED, format!("Could not load image: {err}"));
                    ui.monospace(source_preview(&item.src));
                }
                Some(TextureSlot::Loading) | None => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Loading image…");
                    });
                }
            }

            let caption = ui.label(egui::RichText::new(&item.caption).italics());
            if let Some(revised) = &entry.image.revised_prompt {
                caption.on_hover_text(format!("Revised prompt: {revised}"));
            }

            ui.horizontal(|ui| {
                if ui.button("Save…").clicked() {
                    action = Some(GalleryAction::Save(item.id));
                }
                if let ImageSource::Remote { url } = &entry.image.source {
                    if ui.button("Open").on_hover_text(url.as_str()).clicked() {
                        action = Some(GalleryAction::OpenUrl(url.clone()));
                    }
                }
            });
        });
        ui.add_space(6.0);
    }

    action
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let pixels = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(pixels)
            .write_to(&mut out, image::ImageFormat::Png)
            .expect("encode png");
        out.into_inner()
    }

    #[test]
    fn decodes_png_dimensions() {
        let image = decode_image(&png_bytes(3, 2)).expect("decoded");
        assert_eq!(image.size, [3, 2]);
    }

    #[test]
    fn rejects_non_image_bytes() {
        assert!(decode_image(b"not an image").is_err());
    }

    #[test]
    fn long_sources_are_shortened() {
        assert_eq!(source_preview("http://x/img.png"), "http://x/img.png");
        let data_uri = format!("data:image/png;base64,{}", "A".repeat(500));
        let preview = source_preview(&data_uri);
        assert!(preview.starts_with("data:image/png;base64,"));
        assert_eq!(preview.chars().count(), MAX_SOURCE_PREVIEW + 1);
    }
}
