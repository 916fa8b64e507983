//! Surface-independent line plot of a filtered series.

pub const X_LABEL: &str = "Wavelength";
pub const Y_LABEL: &str = "Flux";

/// Everything a display surface needs to draw the series as one line.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPlot {
    /// Legend entry, usually the source file stem.
    pub name: String,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub points: Vec<[f64; 2]>,
}

impl RenderedPlot {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Map x to the horizontal and y to the vertical axis.
pub fn render(name: &str, x_data: &[f64], y_data: &[f64]) -> RenderedPlot {
    RenderedPlot {
        name: name.to_string(),
        x_label: X_LABEL,
        y_label: Y_LABEL,
        points: x_data
            .iter()
            .zip(y_data)
            .map(|(&x, &y)| [x, y])
            .collect(),
    }
}
