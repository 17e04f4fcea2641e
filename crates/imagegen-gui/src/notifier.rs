//! Error notifications shown by the host dashboard.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::warn;

const TOAST_LIFETIME: Duration = Duration::from_secs(8);
const MAX_TOASTS: usize = 5;

/// Receives user-facing error messages from panels.
pub trait Notifier: Send + Sync {
    fn show_error(&self, message: &str);
}

#[derive(Debug, Clone)]
struct Toast {
    message: String,
    shown_at: Instant,
}

/// Notifier rendered as a stack of toasts in the bottom-right corner.
#[derive(Debug, Default)]
pub struct ToastNotifier {
    toasts: Mutex<VecDeque<Toast>>,
}

impl ToastNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages still on screen, oldest first.
    pub fn visible_messages(&self) -> Vec<String> {
        let mut toasts = self.toasts.lock().unwrap_or_else(PoisonError::into_inner);
        expire(&mut toasts, Instant::now());
        toasts.iter().map(|toast| toast.message.clone()).collect()
    }

    /// Draw the active toasts. Returns true while any are visible so the host keeps repainting.
    pub fn render(&self, ctx: &egui::Context) -> bool {
        let mut toasts = self.toasts.lock().unwrap_or_else(PoisonError::into_inner);
        expire(&mut toasts, Instant::now());
        if toasts.is_empty() {
            return false;
        }

        let mut dismissed = None;
        egui::Area::new(egui::Id::new("imagegen_toasts"))
            .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-12.0, -12.0))
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                ui.set_max_width(420.0);
                for (index, toast) in toasts.iter().enumerate() {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.colored_label(egui::Color32::RED, "Error");
                            if ui.small_button("✕").clicked() {
                                dismissed = Some(index);
                            }
                        });
                        ui.label(egui::RichText::new(&toast.message).monospace());
                    });
                    ui.add_space(4.0);
                }
            });

        if let Some(index) = dismissed {
            toasts.remove(index);
        }
        true
    }
}

impl Notifier for ToastNotifier {
    fn show_error(&self, message: &str) {
        warn!(message, "notifying user of error");
        let mut toasts = self.toasts.lock().unwrap_or_else(PoisonError::into_inner);
        if toasts.len() >= MAX_TOASTS {
            toasts.pop_front();
        }
        toasts.push_back(Toast {
            message: message.to_string(),
            shown_at: Instant::now(),
        });
    }
}

fn expire(toasts: &mut VecDeque<Toast>, now: Instant) {
    toasts.retain(|toast| now.duration_since(toast.shown_at) < TOAST_LIFETIME);
}
