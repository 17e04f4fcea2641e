//! Prompt entry, Generate button and busy indicator.

use crate::controller::BusyFlag;

/// Returns true when the user asked to generate.
pub fn render(ui: &mut egui::Ui, prompt: &mut String, busy: BusyFlag) -> bool {
    let mut generate = false;

    ui.label("Prompt").on_hover_text(
        "A text description of the desired image. \
         Up to 1000 characters for dall-e-2 and 4000 for dall-e-3.",
    );
    let response = ui.add(
        egui::TextEdit::multiline(prompt)
            .hint_text("A watercolor painting of a lighthouse at dawn")
            .desired_rows(3)
            .desired_width(f32::INFINITY),
    );

    let idle = busy == BusyFlag::Hidden;
    let shortcut = response.has_focus()
        && ui.input(|input| input.key_pressed(egui::Key::Enter) && input.modifiers.command);

    ui.horizontal(|ui| {
        let button = egui::Button::new(egui::RichText::new("Generate").size(18.0))
            .fill(egui::Color32::from_rgb(0, 120, 200))
            .min_size(egui::vec2(140.0, 32.0));
        let clicked = ui
            .add_enabled(idle, button)
            .on_hover_text("Ctrl+Enter")
            .on_disabled_hover_text("A generation is already running")
            .clicked();
        generate = idle && (clicked || shortcut);

        if busy == BusyFlag::Visible {
            ui.spinner();
            ui.label("Generating…");
        }
    });

    generate
}
