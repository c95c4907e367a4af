pub mod events;
pub mod header;
pub mod heatmap;

use crate::{
    error::{AnalysisError, Result},
    io::table::{read_text, split_tokens},
    signal::population_std,
};
use events::{angular_displacements, GazeEvent, RunSegmenter};
use header::ColumnMap;
use heatmap::{HeatmapData, HeatmapGrid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Configurable parameters for the eye-gaze pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeConfig {
    /// Assumed capture rate when no usable time column exists, Hz.
    pub fallback_rate_hz: f64,
    /// Explicit blink-column values above this flag a blink.
    pub blink_threshold: f64,
    /// Fallback: eyelid openness below this flags a blink.
    pub openness_threshold: f64,
    /// Fallback: eyelid squeeze above this flags a blink.
    pub squeeze_threshold: f64,
    /// Frame-to-frame displacement below this continues a fixation, degrees.
    pub fixation_max_deg: f64,
    /// Frame-to-frame displacement at or above this continues a saccade, degrees.
    pub saccade_min_deg: f64,
    /// Blinks no longer than this count as short, ms.
    pub short_blink_ms: f64,
    /// Gaussian sigma for heatmap smoothing, in one-degree bins.
    pub heatmap_sigma: f64,
    /// Smoothed bins above this density are exported.
    pub heatmap_threshold: f64,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            fallback_rate_hz: 120.0,
            blink_threshold: 0.2,
            openness_threshold: 0.7,
            squeeze_threshold: 0.3,
            fixation_max_deg: 1.0,
            saccade_min_deg: 2.0,
            short_blink_ms: 100.0,
            heatmap_sigma: 4.0,
            heatmap_threshold: 0.01,
        }
    }
}

/// Per-row gaze record; consumed during aggregation, not retained in results.
#[derive(Debug, Clone, Copy)]
pub struct GazeSample {
    pub yaw_deg: f64,
    pub pitch_deg: f64,
    /// Timestamp in the file's own units, when a time column exists.
    pub time_raw: Option<f64>,
    pub pupil_left: Option<f64>,
    pub pupil_right: Option<f64>,
    pub openness: Option<f64>,
    pub squeeze: Option<f64>,
    pub blink: bool,
}

/// Aggregate metrics for one recording. Rates are 0 and mean durations /
/// amplitudes absent when no events of that kind occurred; pupil and eyelid
/// means are absent when the file carries no such columns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GazeMetrics {
    pub duration_s: f64,
    pub sampling_rate_est_hz: Option<f64>,
    pub blink_count: usize,
    pub blink_rate_hz: f64,
    pub avg_blink_dur_ms: Option<f64>,
    pub short_blink_count: usize,
    pub fixation_count: usize,
    pub fixation_rate_hz: f64,
    pub avg_fixation_dur_ms: Option<f64>,
    pub saccade_count: usize,
    pub saccade_rate_hz: f64,
    pub avg_saccade_amp_deg: Option<f64>,
    pub avg_saccade_vel_deg_s: Option<f64>,
    pub avg_pupil_mm: Option<f64>,
    pub avg_pupil_left_mm: Option<f64>,
    pub avg_pupil_right_mm: Option<f64>,
    pub avg_openness: Option<f64>,
    pub avg_squeeze: Option<f64>,
    pub yaw_std_deg: f64,
    pub pitch_std_deg: f64,
}

impl GazeMetrics {
    /// Flat name → value view; absent optionals are omitted. Batch averaging
    /// and tabular export both go through this.
    pub fn pairs(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("duration_s", Some(self.duration_s)),
            ("sampling_rate_est_hz", self.sampling_rate_est_hz),
            ("blink_count", Some(self.blink_count as f64)),
            ("blink_rate_hz", Some(self.blink_rate_hz)),
            ("avg_blink_dur_ms", self.avg_blink_dur_ms),
            ("short_blink_count", Some(self.short_blink_count as f64)),
            ("fixation_count", Some(self.fixation_count as f64)),
            ("fixation_rate_hz", Some(self.fixation_rate_hz)),
            ("avg_fixation_dur_ms", self.avg_fixation_dur_ms),
            ("saccade_count", Some(self.saccade_count as f64)),
            ("saccade_rate_hz", Some(self.saccade_rate_hz)),
            ("avg_saccade_amp_deg", self.avg_saccade_amp_deg),
            ("avg_saccade_vel_deg_s", self.avg_saccade_vel_deg_s),
            ("avg_pupil_mm", self.avg_pupil_mm),
            ("avg_pupil_left_mm", self.avg_pupil_left_mm),
            ("avg_pupil_right_mm", self.avg_pupil_right_mm),
            ("avg_openness", self.avg_openness),
            ("avg_squeeze", self.avg_squeeze),
            ("yaw_std_deg", Some(self.yaw_std_deg)),
            ("pitch_std_deg", Some(self.pitch_std_deg)),
        ]
    }
}

/// Result of analyzing one eye-tracking recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GazeAnalysis {
    pub metrics: GazeMetrics,
    pub heatmap: HeatmapData,
}

/// Result of analyzing a batch of task recordings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GazeBatch {
    pub is_batch: bool,
    pub count: usize,
    /// Per-file results, including each file's own heatmap.
    pub results: Vec<GazeAnalysis>,
    /// Per-metric mean across files, skipping files where a metric is absent.
    pub metrics: BTreeMap<String, f64>,
}

/// Rotate the reference forward vector (0, 0, 1) by quaternion (x, y, z, w).
pub fn forward_vector(x: f64, y: f64, z: f64, w: f64) -> [f64; 3] {
    [
        2.0 * (x * z + w * y),
        2.0 * (y * z - w * x),
        1.0 - 2.0 * (x * x + y * y),
    ]
}

/// Average the two eyes' forward vectors and convert to yaw/pitch degrees.
/// `None` when the averaged vector is too short to carry a direction.
pub fn binocular_angles(left: [f64; 3], right: [f64; 3]) -> Option<(f64, f64)> {
    let mut v = [
        (left[0] + right[0]) / 2.0,
        (left[1] + right[1]) / 2.0,
        (left[2] + right[2]) / 2.0,
    ];
    let mag = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if mag < 1e-6 {
        return None;
    }
    for c in &mut v {
        *c /= mag;
    }
    let yaw = v[0].atan2(v[2]).to_degrees();
    let pitch = v[1].clamp(-1.0, 1.0).asin().to_degrees();
    Some((yaw, pitch))
}

/// Parse the recording into per-row gaze samples, discarding rows whose
/// averaged gaze vector is degenerate.
fn parse_samples(text: &str, cfg: &GazeConfig) -> Result<Vec<GazeSample>> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.len() < 2 {
        return Err(AnalysisError::NoValidData);
    }
    let columns = ColumnMap::resolve(lines[0])?;

    let mut samples = Vec::new();
    for line in &lines[1..] {
        let tokens: Vec<&str> = split_tokens(line).collect();
        let num = |idx: usize| -> f64 {
            tokens
                .get(idx)
                .and_then(|t| t.parse::<f64>().ok())
                .filter(|v| !v.is_nan())
                .unwrap_or(0.0)
        };
        let opt = |idx: Option<usize>| -> Option<f64> {
            idx.and_then(|i| tokens.get(i))
                .and_then(|t| t.parse::<f64>().ok())
                .filter(|v| !v.is_nan())
        };

        let [lx, ly, lz, lw] = columns.left_rot.map(num);
        let [rx, ry, rz, rw] = columns.right_rot.map(num);
        let (yaw_deg, pitch_deg) = match binocular_angles(
            forward_vector(lx, ly, lz, lw),
            forward_vector(rx, ry, rz, rw),
        ) {
            Some(angles) => angles,
            None => continue,
        };

        let openness = opt(columns.openness_left);
        let squeeze = opt(columns.squeeze_left);
        let blink = match columns.blink {
            Some(i) => num(i) > cfg.blink_threshold,
            None => {
                openness.is_some_and(|o| o < cfg.openness_threshold)
                    || squeeze.is_some_and(|s| s > cfg.squeeze_threshold)
            }
        };

        samples.push(GazeSample {
            yaw_deg,
            pitch_deg,
            time_raw: opt(columns.time),
            pupil_left: opt(columns.pupil_left),
            pupil_right: opt(columns.pupil_right),
            openness,
            squeeze,
            blink,
        });
    }

    if samples.is_empty() {
        return Err(AnalysisError::NoValidGaze);
    }
    Ok(samples)
}

/// Fixed inter-sample interval for the recording, in milliseconds.
///
/// With a usable time column, the span between the first and last valid
/// timestamps divided by the sample count; a span below 1e6 reads as
/// already-milliseconds, larger spans as seconds. Without one, the fallback
/// capture rate applies.
fn estimate_dt_ms(samples: &[GazeSample], cfg: &GazeConfig) -> f64 {
    if samples.len() > 1 {
        let mut valid = samples.iter().filter_map(|s| s.time_raw);
        let first = valid.next();
        let last = valid.last();
        if let (Some(first), Some(last)) = (first, last) {
            if last > first {
                let span = last - first;
                let dt = span / (samples.len() - 1) as f64;
                return if span < 1e6 { dt } else { dt * 1000.0 };
            }
        }
    }
    1000.0 / cfg.fallback_rate_hz
}

fn mean_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    (count > 0).then(|| sum / count as f64)
}

fn aggregate(
    samples: &[GazeSample],
    dt_ms: f64,
    blinks: &[GazeEvent],
    fixations: &[GazeEvent],
    saccades: &[GazeEvent],
    cfg: &GazeConfig,
) -> GazeMetrics {
    let n = samples.len();
    let duration_s = n as f64 * dt_ms / 1000.0;
    let sampling_rate_est_hz =
        (duration_s > 0.0 && n > 1).then(|| n as f64 / duration_s);

    let blink_count = blinks.len();
    let short_blink_count = blinks
        .iter()
        .filter(|e| e.duration_ms <= cfg.short_blink_ms)
        .count();
    let (blink_rate_hz, avg_blink_dur_ms) = if blink_count > 0 && duration_s > 0.0 {
        let total: f64 = blinks.iter().map(|e| e.duration_ms).sum();
        (
            blink_count as f64 / duration_s,
            Some(total / blink_count as f64),
        )
    } else {
        (0.0, None)
    };

    let fixation_count = fixations.len();
    let avg_fixation_dur_ms = (fixation_count > 0).then(|| {
        fixations.iter().map(|e| e.duration_ms).sum::<f64>() / fixation_count as f64
    });
    let fixation_rate_hz = if fixation_count > 0 && duration_s > 0.0 {
        fixation_count as f64 / duration_s
    } else {
        0.0
    };

    let saccade_count = saccades.len();
    let (avg_saccade_amp_deg, avg_saccade_vel_deg_s) = if saccade_count > 0 {
        let amp: f64 = saccades.iter().map(|e| e.amplitude_deg).sum();
        let vel: f64 = saccades.iter().filter_map(|e| e.velocity_deg_s()).sum();
        (
            Some(amp / saccade_count as f64),
            Some(vel / saccade_count as f64),
        )
    } else {
        (None, None)
    };
    let saccade_rate_hz = if saccade_count > 0 && duration_s > 0.0 {
        saccade_count as f64 / duration_s
    } else {
        0.0
    };

    let avg_pupil_left_mm = mean_of(samples.iter().filter_map(|s| s.pupil_left));
    let avg_pupil_right_mm = mean_of(samples.iter().filter_map(|s| s.pupil_right));
    let avg_pupil_mm = match (avg_pupil_left_mm, avg_pupil_right_mm) {
        (Some(l), Some(r)) => Some((l + r) / 2.0),
        (one, other) => one.or(other),
    };

    let yaw: Vec<f64> = samples.iter().map(|s| s.yaw_deg).collect();
    let pitch: Vec<f64> = samples.iter().map(|s| s.pitch_deg).collect();
    let (yaw_std_deg, pitch_std_deg) = if n > 1 {
        (population_std(&yaw), population_std(&pitch))
    } else {
        (0.0, 0.0)
    };

    GazeMetrics {
        duration_s,
        sampling_rate_est_hz,
        blink_count,
        blink_rate_hz,
        avg_blink_dur_ms,
        short_blink_count,
        fixation_count,
        fixation_rate_hz,
        avg_fixation_dur_ms,
        saccade_count,
        saccade_rate_hz,
        avg_saccade_amp_deg,
        avg_saccade_vel_deg_s,
        avg_pupil_mm,
        avg_pupil_left_mm,
        avg_pupil_right_mm,
        avg_openness: mean_of(samples.iter().filter_map(|s| s.openness)),
        avg_squeeze: mean_of(samples.iter().filter_map(|s| s.squeeze)),
        yaw_std_deg,
        pitch_std_deg,
    }
}

/// Analyze one eye-tracking recording already loaded as text.
pub fn analyze_gaze_text(text: &str, cfg: &GazeConfig) -> Result<GazeAnalysis> {
    let samples = parse_samples(text, cfg)?;
    let dt_ms = estimate_dt_ms(&samples, cfg);

    let mut grid = HeatmapGrid::new();
    for s in &samples {
        grid.record(s.yaw_deg, s.pitch_deg);
    }
    grid.blur(cfg.heatmap_sigma);
    let heatmap = HeatmapData::from_grid(&grid, cfg.heatmap_threshold);

    let mut blink_seg = RunSegmenter::new(dt_ms);
    for (i, s) in samples.iter().enumerate() {
        blink_seg.step(i, s.blink, 0.0);
    }
    let blinks = blink_seg.finish();

    let yaw: Vec<f64> = samples.iter().map(|s| s.yaw_deg).collect();
    let pitch: Vec<f64> = samples.iter().map(|s| s.pitch_deg).collect();
    let displacements = angular_displacements(&yaw, &pitch);
    // displacements in [fixation_max, saccade_min) belong to neither run
    let mut fixation_seg = RunSegmenter::new(dt_ms);
    let mut saccade_seg = RunSegmenter::new(dt_ms);
    for (i, &a) in displacements.iter().enumerate() {
        fixation_seg.step(i, a < cfg.fixation_max_deg, 0.0);
        saccade_seg.step(i, a >= cfg.saccade_min_deg, a);
    }
    let fixations = fixation_seg.finish();
    let saccades = saccade_seg.finish();

    let metrics = aggregate(&samples, dt_ms, &blinks, &fixations, &saccades, cfg);
    Ok(GazeAnalysis { metrics, heatmap })
}

/// Read and analyze one eye-tracking recording.
pub fn analyze_gaze(path: &Path, cfg: &GazeConfig) -> Result<GazeAnalysis> {
    let text = read_text(path)?;
    analyze_gaze_text(&text, cfg)
}

/// Analyze a batch of task recordings independently and average their
/// numeric metrics; a metric absent from some files is averaged over the
/// files that carry it.
pub fn analyze_gaze_batch<P: AsRef<Path>>(paths: &[P], cfg: &GazeConfig) -> Result<GazeBatch> {
    let mut results = Vec::with_capacity(paths.len());
    for path in paths {
        results.push(analyze_gaze(path.as_ref(), cfg)?);
    }
    let metrics = average_metrics(results.iter().map(|r| &r.metrics));
    Ok(GazeBatch {
        is_batch: true,
        count: results.len(),
        results,
        metrics,
    })
}

fn average_metrics<'a>(all: impl Iterator<Item = &'a GazeMetrics>) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<&'static str, (f64, usize)> = BTreeMap::new();
    for metrics in all {
        for (name, value) in metrics.pairs() {
            if let Some(v) = value {
                let entry = sums.entry(name).or_insert((0.0, 0));
                entry.0 += v;
                entry.1 += 1;
            }
        }
    }
    sums.into_iter()
        .map(|(name, (sum, count))| (name.to_string(), sum / count as f64))
        .collect()
}
