use crate::{
    error::Result,
    io::table::{self, ColumnRule},
    metrics::hrv::{hrv_summary, HrvSummary},
    signal::{downsample, mean, population_std, time_axis, Peaks, RrIntervals, SignalSeries},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configurable parameters for the ECG beat detection + HRV pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EcgConfig {
    /// Detection threshold offset above the series mean, in standard deviations.
    pub threshold_scale: f64,
    /// Refractory period between accepted peaks (seconds).
    pub refractory_s: f64,
    /// Target point count for the display series.
    pub display_points: usize,
}

impl Default for EcgConfig {
    fn default() -> Self {
        Self {
            threshold_scale: 0.5,
            refractory_s: 0.25,
            display_points: 20_000,
        }
    }
}

/// Combined result of the ECG pipeline: HRV metrics plus a plottable series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcgAnalysis {
    pub sample_rate: f64,
    pub metrics: HrvSummary,
    pub peaks: Peaks,
    /// Downsampled voltage for display.
    pub voltage: Vec<f64>,
    /// Time axis matching `voltage`, seconds, built from the effective rate.
    pub time: Vec<f64>,
}

/// Detect R-peaks with a global adaptive threshold and a refractory period.
///
/// Threshold = mean + `threshold_scale`·std over the whole series. A sample is
/// a peak iff it exceeds the threshold, is strictly greater than its left
/// neighbor, at least its right neighbor, and falls a full refractory period
/// after the previous accepted peak. Single forward pass; the first and last
/// samples are never peaks.
pub fn detect_r_peaks(series: &SignalSeries, cfg: &EcgConfig) -> Peaks {
    let data = &series.data;
    if data.len() < 3 {
        return Peaks::from_indices(Vec::new());
    }
    let threshold = mean(data) + cfg.threshold_scale * population_std(data);
    let refractory = ((series.rate * cfg.refractory_s).round() as usize).max(1);

    let mut peaks = Vec::new();
    let mut last_peak: Option<usize> = None;
    for i in 1..data.len() - 1 {
        let v = data[i];
        if v <= threshold || v <= data[i - 1] || v < data[i + 1] {
            continue;
        }
        if let Some(last) = last_peak {
            if i - last < refractory {
                continue;
            }
        }
        peaks.push(i);
        last_peak = Some(i);
    }
    Peaks::from_indices(peaks)
}

/// Run detection → RR intervals → HRV on an in-memory series.
pub fn run_ecg_pipeline(series: &SignalSeries, cfg: &EcgConfig) -> EcgAnalysis {
    let peaks = detect_r_peaks(series, cfg);
    let rr = RrIntervals::from_peaks(&peaks, series.rate);
    let metrics = hrv_summary(&peaks, &rr);
    let reduced = downsample(&series.data, cfg.display_points);
    let effective = reduced.effective_rate(series.rate);
    let time = time_axis(reduced.data.len(), effective);
    EcgAnalysis {
        sample_rate: series.rate,
        metrics,
        peaks,
        voltage: reduced.data,
        time,
    }
}

/// Parse one ECG export (first numeric token per line, optional header with
/// rate hint) and run the full pipeline.
pub fn analyze_ecg(path: &Path, cfg: &EcgConfig) -> Result<EcgAnalysis> {
    let parsed = table::read_table(path, ColumnRule::FirstNumeric)?;
    let series = SignalSeries {
        rate: parsed.sample_rate(),
        data: parsed.column(0),
    };
    Ok(run_ecg_pipeline(&series, cfg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    /// Unit impulses every `spacing` samples on a zero baseline.
    fn pulse_train(rate: f64, spacing: usize, beats: usize) -> SignalSeries {
        let mut data = vec![0.0; spacing * (beats + 1)];
        for b in 0..beats {
            data[(b + 1) * spacing] = 1.0;
        }
        SignalSeries { rate, data }
    }

    #[test]
    fn pulse_train_peaks_and_mean_rr() {
        let cfg = EcgConfig::default();
        let series = pulse_train(1000.0, 800, 10);
        let analysis = run_ecg_pipeline(&series, &cfg);
        assert_eq!(analysis.metrics.n_peaks, 10);
        assert!((analysis.metrics.mean_rr_ms - 800.0).abs() < 1e-9);
        assert!((analysis.metrics.sdnn_ms).abs() < 1e-9);
    }

    #[test]
    fn zero_series_yields_no_peaks_and_zero_metrics() {
        let cfg = EcgConfig::default();
        let series = SignalSeries {
            rate: 1000.0,
            data: vec![0.0; 5000],
        };
        let analysis = run_ecg_pipeline(&series, &cfg);
        assert!(analysis.peaks.is_empty());
        let m = analysis.metrics;
        assert_eq!(m.n_peaks, 0);
        assert_eq!(m.mean_rr_ms, 0.0);
        assert_eq!(m.sdnn_ms, 0.0);
        assert_eq!(m.rmssd_ms, 0.0);
        assert_eq!(m.pnn50_pct, 0.0);
        assert_eq!(m.hr_mean_bpm, 0.0);
        assert_eq!(m.hr_std_bpm, 0.0);
        assert_eq!(m.hr_change_rate_pct, 0.0);
    }

    #[test]
    fn refractory_suppresses_trailing_ripple() {
        // a second, smaller bump 50 samples after each beat sits inside the
        // 250-sample refractory window and must not be counted
        let rate = 1000.0;
        let mut data = vec![0.0; 6000];
        for b in 1..=5 {
            data[b * 1000] = 1.0;
            data[b * 1000 + 50] = 0.9;
        }
        let series = SignalSeries { rate, data };
        let peaks = detect_r_peaks(&series, &EcgConfig::default());
        assert_eq!(peaks.len(), 5);
        assert!(peaks.indices.iter().all(|i| i % 1000 == 0));
    }

    #[test]
    fn detection_survives_seeded_noise() {
        let rate = 500.0;
        let mut rng = StdRng::seed_from_u64(7);
        let mut data = vec![0.0; 5500];
        for v in data.iter_mut() {
            *v = rng.gen_range(-0.01..0.01);
        }
        for b in 1..=10 {
            data[b * 500] = 1.0;
        }
        let series = SignalSeries { rate, data };
        let peaks = detect_r_peaks(&series, &EcgConfig::default());
        assert_eq!(peaks.len(), 10);
    }

    #[test]
    fn series_shorter_than_three_samples_has_no_peaks() {
        let series = SignalSeries {
            rate: 1000.0,
            data: vec![5.0, 9.0],
        };
        assert!(detect_r_peaks(&series, &EcgConfig::default()).is_empty());
    }
}
