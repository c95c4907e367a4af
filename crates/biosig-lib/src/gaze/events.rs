use serde::{Deserialize, Serialize};

/// One closed run from a run-length scan over the gaze series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GazeEvent {
    /// Index of the first sample in the run.
    pub start: usize,
    /// Run length in samples.
    pub len: usize,
    /// `len` times the recording's fixed inter-sample interval.
    pub duration_ms: f64,
    /// Angular path length accumulated over the run, degrees.
    /// Meaningful for saccade scans; 0 for blink/fixation scans.
    pub amplitude_deg: f64,
}

impl GazeEvent {
    /// Mean angular velocity over the run, deg/s; `None` for an
    /// instantaneous run.
    pub fn velocity_deg_s(&self) -> Option<f64> {
        (self.duration_ms > 0.0).then(|| self.amplitude_deg / (self.duration_ms / 1000.0))
    }
}

#[derive(Debug, Clone, Copy)]
struct Run {
    start: usize,
    len: usize,
    amplitude: f64,
}

/// Run-length finite-state reducer: idle until the membership predicate
/// holds, in-run while it keeps holding, closing the run otherwise. The
/// final flush is an explicit transition so a run still open at the end of
/// the series is closed and counted like any other.
#[derive(Debug)]
pub struct RunSegmenter {
    dt_ms: f64,
    active: Option<Run>,
    events: Vec<GazeEvent>,
}

impl RunSegmenter {
    pub fn new(dt_ms: f64) -> Self {
        Self {
            dt_ms,
            active: None,
            events: Vec::new(),
        }
    }

    /// Feed one sample: whether it belongs to a run, and its amplitude
    /// contribution (0 for blink/fixation scans).
    pub fn step(&mut self, index: usize, in_run: bool, amplitude: f64) {
        match (&mut self.active, in_run) {
            (Some(run), true) => {
                run.len += 1;
                run.amplitude += amplitude;
            }
            (None, true) => {
                self.active = Some(Run {
                    start: index,
                    len: 1,
                    amplitude,
                });
            }
            (Some(_), false) => self.close(),
            (None, false) => {}
        }
    }

    /// Flush and return every closed run.
    pub fn finish(mut self) -> Vec<GazeEvent> {
        self.close();
        self.events
    }

    fn close(&mut self) {
        if let Some(run) = self.active.take() {
            self.events.push(GazeEvent {
                start: run.start,
                len: run.len,
                duration_ms: run.len as f64 * self.dt_ms,
                amplitude_deg: run.amplitude,
            });
        }
    }
}

/// Frame-to-frame angular displacements sqrt(Δyaw² + Δpitch²), one per
/// consecutive sample pair.
pub fn angular_displacements(yaw: &[f64], pitch: &[f64]) -> Vec<f64> {
    yaw.windows(2)
        .zip(pitch.windows(2))
        .map(|(wy, wp)| {
            let dy = wy[1] - wy[0];
            let dp = wp[1] - wp[0];
            (dy * dy + dp * dp).sqrt()
        })
        .collect()
}
