use crate::signal::{mean, population_std, Peaks, RrIntervals};
use serde::{Deserialize, Serialize};

/// Time-domain HRV summary for one recording.
///
/// Every field defaults to 0 when there are too few beats to compute it;
/// a recording with no detectable peaks reports an all-zero summary rather
/// than failing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HrvSummary {
    pub n_peaks: usize,
    pub mean_rr_ms: f64,
    /// Population standard deviation of the RR intervals (needs >= 2).
    pub sdnn_ms: f64,
    /// Root-mean-square of successive RR differences.
    pub rmssd_ms: f64,
    /// Percentage of successive differences larger than 50 ms.
    pub pnn50_pct: f64,
    pub hr_mean_bpm: f64,
    pub hr_std_bpm: f64,
    /// HR std as a percentage of HR mean.
    pub hr_change_rate_pct: f64,
}

pub fn hrv_summary(peaks: &Peaks, rr: &RrIntervals) -> HrvSummary {
    let ms = &rr.ms;
    let mean_rr_ms = if ms.is_empty() { 0.0 } else { mean(ms) };
    let sdnn_ms = if ms.len() > 1 { population_std(ms) } else { 0.0 };

    let diffs: Vec<f64> = ms.windows(2).map(|w| w[1] - w[0]).collect();
    let (rmssd_ms, pnn50_pct) = if diffs.is_empty() {
        (0.0, 0.0)
    } else {
        let rmssd = (diffs.iter().map(|d| d * d).sum::<f64>() / diffs.len() as f64).sqrt();
        let nn50 = diffs.iter().filter(|d| d.abs() > 50.0).count();
        (rmssd, nn50 as f64 * 100.0 / diffs.len() as f64)
    };

    // instantaneous heart rate from each positive interval
    let hr: Vec<f64> = ms.iter().filter(|v| **v > 0.0).map(|v| 60_000.0 / v).collect();
    let hr_mean_bpm = if hr.is_empty() { 0.0 } else { mean(&hr) };
    let hr_std_bpm = if hr.len() > 1 { population_std(&hr) } else { 0.0 };
    let hr_change_rate_pct = if hr_mean_bpm > 0.0 {
        hr_std_bpm * 100.0 / hr_mean_bpm
    } else {
        0.0
    };

    HrvSummary {
        n_peaks: peaks.len(),
        mean_rr_ms,
        sdnn_ms,
        rmssd_ms,
        pnn50_pct,
        hr_mean_bpm,
        hr_std_bpm,
        hr_change_rate_pct,
    }
}
