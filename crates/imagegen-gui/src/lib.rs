//! Image playground GUI built on eframe/egui.
//!
//! The host [`app::DashboardApp`] shows registered [`panel::DashboardPanel`]s in a
//! side navigation. The images panel binds its form to [`state::PanelState`] and
//! runs generation calls through [`controller::SubmissionController`].

pub mod app;
pub mod async_bridge;
pub mod controller;
pub mod dialogs;
pub mod notifier;
pub mod panel;
pub mod state;
pub mod ui_state;
pub mod widgets;

use anyhow::{Context, anyhow};
use tracing::warn;

use crate::async_bridge::AsyncBridge;

/// Main entry point for the GUI
pub fn run() -> anyhow::Result<()> {
    let load = imagegen_core::load_config();
    for warning in &load.warnings {
        warn!(%warning, "configuration warning");
    }

    let async_bridge = AsyncBridge::new().context("failed to start async runtime")?;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 820.0])
            .with_min_inner_size([720.0, 560.0])
            .with_resizable(true)
            .with_title("Image Playground"),
        ..Default::default()
    };

    eframe::run_native(
        "Image Playground",
        native_options,
        Box::new(move |cc| Ok(Box::new(app::DashboardApp::new(cc, load, async_bridge)))),
    )
    .map_err(|e| anyhow!("failed to run GUI: {e}"))
}
