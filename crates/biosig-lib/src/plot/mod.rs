use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub dash: Option<[f32; 2]>,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Color(pub u32);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }
}

/// Build a figure from an analyzer's display series (already reduced by the
/// downsampler, so no further decimation happens here).
pub fn figure_from_display(title: &str, time: &[f64], values: &[f64], color: u32) -> Figure {
    let points: Vec<[f64; 2]> = time
        .iter()
        .zip(values.iter())
        .map(|(t, v)| [*t, *v])
        .collect();
    let mut fig = Figure::new(Some(title.into()));
    fig.x.label = Some("time (s)".into());
    fig.y.label = Some("voltage".into());
    fig.add_series(Series::Line(LineSeries {
        name: title.into(),
        points,
        style: Style {
            width: 1.4,
            dash: None,
            color: Color(color),
        },
    }));
    fig
}
