//! Activity log widget

use crate::ui_state::{ActivityLog, LogLevel, MAX_LOG_ENTRIES};

pub fn render(ui: &mut egui::Ui, log: &mut ActivityLog) {
    ui.vertical(|ui| {
        ui.horizontal(|ui| {
            ui.strong("Activity Log");
            ui.label(format!("{} / {}", log.len(), MAX_LOG_ENTRIES));

            if ui.button("Clear").clicked() {
                log.clear();
            }
        });

        ui.separator();

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for entry in log.entries() {
                    ui.horizontal(|ui| {
                        ui.label(&entry.timestamp);

                        let (color, prefix) = match entry.level {
                            LogLevel::Info => (egui::Color32::GRAY, "INFO"),
                            LogLevel::Warning => (egui::Color32::YELLOW, "WARN"),
                            LogLevel::Error => (egui::Color32::RED, "ERROR"),
                        };

                        ui.colored_label(color, prefix);
                        ui.label(&entry.message);
                    });
                }
            });
    });
}
