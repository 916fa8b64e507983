use eframe::egui::{self, Color32, RichText, Ui};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – column indices, process button, outputs
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Columns");
    ui.label("Select a FITS file and process it.");
    ui.separator();

    egui::Grid::new("column_indices")
        .num_columns(2)
        .spacing([8.0, 6.0])
        .show(ui, |ui: &mut Ui| {
            ui.label("First column index:");
            ui.add(egui::TextEdit::singleline(&mut state.x_index_input).desired_width(48.0));
            ui.end_row();

            ui.label("Second column index:");
            ui.add(egui::TextEdit::singleline(&mut state.y_index_input).desired_width(48.0));
            ui.end_row();
        });
    ui.add_space(6.0);

    let button = egui::Button::new("Select FITS file and process");
    if ui.add_enabled(!state.busy, button).clicked() {
        open_file_dialog(state);
    }
    if state.busy {
        ui.spinner();
    }

    if let Some(err) = &state.error_message {
        ui.add_space(6.0);
        ui.label(RichText::new(err).color(Color32::RED));
    }

    if let Some(artifacts) = &state.artifacts {
        ui.separator();
        ui.strong("Last outputs");
        ui.label(format!("Text: {}", artifacts.text_path.display()));
        ui.label(format!("FITS: {}", artifacts.binary_path.display()));
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.add_enabled(!state.busy, egui::Button::new("Open…")).clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();
        ui.label(format!("Stage: {}", state.stage));

        if let Some(plot) = &state.plot {
            ui.separator();
            ui.label(format!("{}: {} points", plot.name, plot.len()));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(msg);
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

/// Ask for a source file and process it.  Cancelling still goes through the
/// pipeline so the "no file selected" message comes from one place.
pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Select the .fits file to process")
        .add_filter("FITS files", &["fits", "fit", "fts"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("All files", &["*"])
        .pick_file();

    if let Some(path) = &file {
        log::info!("Processing {}", path.display());
    }
    state.process(file);
}
