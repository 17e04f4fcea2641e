//! Panels hosted by the dashboard.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use imagegen_core::save::{SaveImageError, fetch_image_bytes, file_name_for, write_image_bytes};
use imagegen_core::{ImageService, PanelOptions};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::controller::{Settlement, SubmissionController, SubmitOutcome};
use crate::dialogs;
use crate::notifier::Notifier;
use crate::state::PanelState;
use crate::ui_state::ActivityLog;
use crate::widgets;
use crate::widgets::gallery::{GalleryAction, GalleryState};

pub const IMAGES_PANEL_TAG: &str = "image-generation";

/// A page of the dashboard, shown when selected in the side navigation.
pub trait DashboardPanel {
    /// Stable identifier the host registers the panel under.
    fn tag(&self) -> &'static str;

    fn title(&self) -> &'static str;

    /// Runs every frame, visible or not, so background work settles promptly.
    fn tick(&mut self, ctx: &egui::Context, log: &mut ActivityLog);

    fn ui(&mut self, ui: &mut egui::Ui, log: &mut ActivityLog);

    /// True while the panel is waiting on background work.
    fn wants_repaint(&self) -> bool {
        false
    }
}

struct SaveOutcome {
    path: PathBuf,
    result: Result<(), SaveImageError>,
}

/// Configuration form, prompt, and gallery of generated images.
pub struct ImagesPanel {
    state: PanelState,
    controller: SubmissionController,
    gallery: GalleryState,
    notifier: Arc<dyn Notifier>,
    runtime: Handle,
    save_tx: mpsc::UnboundedSender<SaveOutcome>,
    save_rx: mpsc::UnboundedReceiver<SaveOutcome>,
}

impl ImagesPanel {
    pub fn new(
        options: PanelOptions,
        service: Arc<dyn ImageService>,
        notifier: Arc<dyn Notifier>,
        runtime: Handle,
    ) -> Self {
        let (save_tx, save_rx) = mpsc::unbounded_channel();
        Self {
            state: PanelState::new(options),
            controller: SubmissionController::new(service, Arc::clone(&notifier), runtime.clone()),
            gallery: GalleryState::new(),
            notifier,
            runtime,
            save_tx,
            save_rx,
        }
    }

    fn submit(&mut self, log: &mut ActivityLog) {
        let request = self.state.to_request();
        let summary = format!(
            "{} / {} / {} / {} / {}",
            request.configuration, request.model_name, request.size, request.quality, request.style
        );
        match self.controller.submit(request) {
            SubmitOutcome::Started(_) => log.info(format!("Generating image ({summary})")),
            SubmitOutcome::Rejected => log.warning("A generation is already running"),
        }
    }

    fn handle_gallery_action(&mut self, action: GalleryAction, log: &mut ActivityLog) {
        match action {
            GalleryAction::Save(id) => {
                let results = self.controller.results();
                let Some(entry) = results.iter().find(|entry| entry.id == id) else {
                    return;
                };
                let default_name = file_name_for(&entry.image, Utc::now());
                let Some(path) = dialogs::pick_image_destination(&default_name) else {
                    return;
                };

                log.info(format!("Saving image to {}", path.display()));
                let image = entry.image.clone();
                let save_tx = self.save_tx.clone();
                self.runtime.spawn(async move {
                    let result = match fetch_image_bytes(&image).await {
                        Ok(bytes) => write_image_bytes(&bytes, &path),
                        Err(err) => Err(err),
                    };
                    let _ = save_tx.send(SaveOutcome { path, result });
                });
            }
            GalleryAction::OpenUrl(url) => {
                if let Err(err) = open::that(&url) {
                    warn!(%url, error = %err, "failed to open image URL");
                    self.notifier.show_error(&format!("Could not open {url}: {err}"));
                    log.error(format!("Failed to open {url}: {err}"));
                }
            }
        }
    }

    fn drain_saves(&mut self, log: &mut ActivityLog) {
        while let Ok(outcome) = self.save_rx.try_recv() {
            match outcome.result {
                Ok(()) => {
                    info!(path = %outcome.path.display(), "image saved from gallery");
                    log.info(format!("Saved {}", outcome.path.display()));
                }
                Err(err) => {
                    self.notifier.show_error(&format!("Could not save image: {err}"));
                    log.error(format!("Failed to save {}: {err}", outcome.path.display()));
                }
            }
        }
    }
}

impl DashboardPanel for ImagesPanel {
    fn tag(&self) -> &'static str {
        IMAGES_PANEL_TAG
    }

    fn title(&self) -> &'static str {
        "Images"
    }

    fn tick(&mut self, ctx: &egui::Context, log: &mut ActivityLog) {
        for settlement in self.controller.poll() {
            match settlement {
                Settlement::Succeeded { prompt, .. } => {
                    log.info(format!("Image generated for \"{prompt}\""));
                }
                Settlement::Failed { message } => {
                    log.error(format!("Image generation failed: {message}"));
                }
            }
        }
        self.gallery.sync(ctx, self.controller.results(), &self.runtime);
        self.drain_saves(log);
    }

    fn ui(&mut self, ui: &mut egui::Ui, log: &mut ActivityLog) {
        ui.heading("Image Generation");
        ui.add_space(4.0);

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.group(|ui| {
                    ui.set_min_width(ui.available_width());
                    widgets::config_panel::render(ui, &mut self.state);
                });

                ui.add_space(8.0);

                let busy = self.controller.busy_flag();
                let mut generate = false;
                ui.group(|ui| {
                    ui.set_min_width(ui.available_width());
                    generate = widgets::prompt_input::render(ui, &mut self.state.prompt, busy);
                });
                if generate {
                    self.submit(log);
                }

                ui.add_space(12.0);
                ui.heading("Results");
                ui.separator();

                if let Some(action) =
                    widgets::gallery::render(ui, self.controller.results(), &self.gallery)
                {
                    self.handle_gallery_action(action, log);
                }
            });
    }

    fn wants_repaint(&self) -> bool {
        self.controller.is_busy() || self.gallery.is_loading()
    }
}
