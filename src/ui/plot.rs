use eframe::egui::{Color32, Ui};
use egui_plot::{Legend, Line, Plot, PlotPoints};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Spectrum plot (central panel)
// ---------------------------------------------------------------------------

/// Draw the last rendered plot.  Each successful request replaces it.
pub fn spectrum_plot(ui: &mut Ui, state: &AppState) {
    let rendered = match &state.plot {
        Some(p) => p,
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Select a FITS file to process  (File → Open…)");
            });
            return;
        }
    };

    let points: PlotPoints = rendered.points.iter().copied().collect();

    Plot::new("spectrum_plot")
        .legend(Legend::default())
        .x_axis_label(rendered.x_label)
        .y_axis_label(rendered.y_label)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            let line = Line::new(points)
                .name(&rendered.name)
                .color(Color32::LIGHT_BLUE)
                .width(1.5);
            plot_ui.line(line);
        });
}
