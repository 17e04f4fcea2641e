//! Selection fields: configuration, model, size, quality and style.

use imagegen_core::SelectableOption;
use imagegen_core::options::{CONFIGURATION_HELP, QUALITY_HELP, SIZE_HELP, STYLE_HELP};

use crate::state::PanelState;

/// Render the five selection fields, writing picks straight into `state`.
pub fn render(ui: &mut egui::Ui, state: &mut PanelState) {
    egui::Grid::new("image_settings_grid")
        .num_columns(2)
        .spacing([12.0, 6.0])
        .show(ui, |ui| {
            select_row(
                ui,
                "configuration_select",
                "Model configuration",
                Some(CONFIGURATION_HELP),
                &state.options.configurations,
                &mut state.configuration,
            );
            select_row(
                ui,
                "model_select",
                "Model",
                None,
                &state.options.models,
                &mut state.model_name,
            );
            select_row(
                ui,
                "size_select",
                "Size",
                Some(SIZE_HELP),
                &state.options.sizes,
                &mut state.size,
            );
            select_row(
                ui,
                "quality_select",
                "Quality",
                Some(QUALITY_HELP),
                &state.options.qualities,
                &mut state.quality,
            );
            select_row(
                ui,
                "style_select",
                "Style",
                Some(STYLE_HELP),
                &state.options.styles,
                &mut state.style,
            );
        });
}

fn select_row(
    ui: &mut egui::Ui,
    id_salt: &str,
    label: &str,
    help: Option<&str>,
    options: &[SelectableOption],
    value: &mut String,
) {
    let label_response = ui.label(label);
    if let Some(help) = help {
        label_response.on_hover_text(help);
    }

    egui::ComboBox::from_id_salt(id_salt)
        .width(220.0)
        .selected_text(selected_label(options, value))
        .show_ui(ui, |ui| {
            for option in options {
                ui.selectable_value(value, option.value.clone(), option.label.as_str());
            }
        });
    ui.end_row();
}

fn selected_label(options: &[SelectableOption], value: &str) -> String {
    if options.is_empty() {
        return "(none configured)".to_string();
    }
    options
        .iter()
        .find(|option| option.value == value)
        .map(|option| option.label.clone())
        .unwrap_or_else(|| value.to_string())
}
