//! Dashboard host application

use std::sync::Arc;
use std::time::Duration;

use imagegen_core::{
    ConfigLoadResult, ConfigSource, FileConfig, PanelOptions, config_path, save_config,
    service_from_config,
};
use tracing::info;

use crate::async_bridge::AsyncBridge;
use crate::notifier::{Notifier, ToastNotifier};
use crate::panel::{DashboardPanel, ImagesPanel};
use crate::ui_state::{Theme, UiState};
use crate::widgets;

/// Main application struct implementing eframe::App
pub struct DashboardApp {
    /// Registered panels, in side navigation order
    panels: Vec<Box<dyn DashboardPanel>>,

    /// Index of the panel shown in the central area
    selected: usize,

    ui_state: UiState,

    /// Loaded configuration, rewritten when UI preferences change
    config: FileConfig,

    toasts: Arc<ToastNotifier>,

    /// Declared last so panels drop before the runtime they spawn on
    #[allow(dead_code)]
    async_bridge: AsyncBridge,
}

impl DashboardApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        load: ConfigLoadResult,
        async_bridge: AsyncBridge,
    ) -> Self {
        let ConfigLoadResult {
            config,
            warnings,
            source,
        } = load;

        let mut ui_state = UiState::new(config.ui.theme, config.ui.show_activity_log);
        ui_state.activity_log.info("Application started");
        if source == ConfigSource::Default {
            ui_state.activity_log.info(format!(
                "No configuration file found, using defaults ({})",
                config_path().display()
            ));
        }
        for warning in warnings {
            ui_state.activity_log.warning(warning);
        }

        let toasts = Arc::new(ToastNotifier::new());
        let notifier: Arc<dyn Notifier> = toasts.clone();
        let images = ImagesPanel::new(
            PanelOptions::new(config.configuration_names()),
            service_from_config(&config),
            notifier,
            async_bridge.handle(),
        );
        let panels: Vec<Box<dyn DashboardPanel>> = vec![Box::new(images)];
        for panel in &panels {
            info!(tag = panel.tag(), "registered dashboard panel");
        }

        Self {
            panels,
            selected: 0,
            ui_state,
            config,
            toasts,
            async_bridge,
        }
    }

    fn apply_theme(&self, ctx: &egui::Context) {
        let visuals = match self.ui_state.theme {
            Theme::Dark => egui::Visuals::dark(),
            Theme::Light => egui::Visuals::light(),
        };
        ctx.set_visuals(visuals);
    }

    /// Write theme and log visibility back to config.toml.
    fn persist_ui_preferences(&mut self) {
        self.config.ui.theme = self.ui_state.theme.into();
        self.config.ui.show_activity_log = self.ui_state.activity_log_expanded;
        if let Err(e) = save_config(&self.config) {
            self.ui_state
                .activity_log
                .error(format!("Failed to save preferences: {}", e));
        }
    }

    fn render_top_panel(&mut self, ctx: &egui::Context) {
        let mut preferences_changed = false;

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Image Playground");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let theme_label = match self.ui_state.theme {
                        Theme::Dark => "☀ Light",
                        Theme::Light => "🌙 Dark",
                    };
                    if ui.button(theme_label).clicked() {
                        self.ui_state.theme = self.ui_state.theme.toggled();
                        preferences_changed = true;
                    }

                    if ui
                        .selectable_label(self.ui_state.activity_log_expanded, "Activity Log")
                        .clicked()
                    {
                        self.ui_state.activity_log_expanded = !self.ui_state.activity_log_expanded;
                        preferences_changed = true;
                    }
                });
            });
        });

        if preferences_changed {
            self.persist_ui_preferences();
        }
    }

    fn render_side_nav(&mut self, ctx: &egui::Context) {
        let mut selected = self.selected;
        egui::SidePanel::left("dashboard_nav")
            .resizable(false)
            .default_width(160.0)
            .show(ctx, |ui| {
                ui.add_space(6.0);
                for (index, panel) in self.panels.iter().enumerate() {
                    if ui
                        .selectable_label(selected == index, panel.title())
                        .on_hover_text(panel.tag())
                        .clicked()
                    {
                        selected = index;
                    }
                }
            });
        self.selected = selected;
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.apply_theme(ctx);

        for panel in &mut self.panels {
            panel.tick(ctx, &mut self.ui_state.activity_log);
        }

        self.render_top_panel(ctx);
        self.render_side_nav(ctx);

        if self.ui_state.activity_log_expanded {
            egui::TopBottomPanel::bottom("activity_log_panel")
                .resizable(true)
                .default_height(180.0)
                .show(ctx, |ui| {
                    widgets::activity_log::render(ui, &mut self.ui_state.activity_log);
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(panel) = self.panels.get_mut(self.selected) {
                panel.ui(ui, &mut self.ui_state.activity_log);
            }
        });

        let toasts_visible = self.toasts.render(ctx);
        if toasts_visible || self.panels.iter().any(|panel| panel.wants_repaint()) {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}
