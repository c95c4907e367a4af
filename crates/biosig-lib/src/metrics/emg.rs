use crate::{
    error::Result,
    io::table::{self, ColumnRule},
    signal::{downsample, mean, time_axis},
};
use realfft::RealFftPlanner;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Longest window fed to the power spectrum, in samples.
pub const SPECTRUM_WINDOW: usize = 4096;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EmgConfig {
    /// Target point count for the display series.
    pub display_points: usize,
}

impl Default for EmgConfig {
    fn default() -> Self {
        Self {
            display_points: 20_000,
        }
    }
}

/// Scalar features for one EMG channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EmgChannelFeatures {
    /// Mean absolute value.
    pub mav: f64,
    pub rms: f64,
    /// Integrated EMG: sum of absolute amplitudes.
    pub iemg: f64,
    /// Largest absolute amplitude.
    pub max_amp: f64,
    /// Median frequency of the power spectrum, Hz.
    pub mdf: f64,
    /// Mean (power-weighted) frequency, Hz.
    pub mpf: f64,
}

/// Per-channel features; the neck channel is `None` when it is absent from
/// the file or carries no signal at all.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EmgMetrics {
    pub arm: EmgChannelFeatures,
    pub neck: Option<EmgChannelFeatures>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmgAnalysis {
    pub sample_rate: f64,
    pub metrics: EmgMetrics,
    /// Downsampled arm-channel voltage for display.
    pub voltage: Vec<f64>,
    /// Time axis matching `voltage`, seconds.
    pub time: Vec<f64>,
}

/// Time- and frequency-domain features for one channel.
pub fn channel_features(data: &[f64], rate: f64) -> EmgChannelFeatures {
    let (mav, rms, iemg, max_amp) = time_features(data);
    let (mdf, mpf) = frequency_features(data, rate);
    EmgChannelFeatures {
        mav,
        rms,
        iemg,
        max_amp,
        mdf,
        mpf,
    }
}

fn time_features(data: &[f64]) -> (f64, f64, f64, f64) {
    if data.is_empty() {
        return (0.0, 0.0, 0.0, 0.0);
    }
    let mut sum_abs = 0.0;
    let mut sum_sq = 0.0;
    let mut max_abs: f64 = 0.0;
    for &v in data {
        let a = v.abs();
        sum_abs += a;
        sum_sq += v * v;
        if a > max_abs {
            max_abs = a;
        }
    }
    let n = data.len() as f64;
    (sum_abs / n, (sum_sq / n).sqrt(), sum_abs, max_abs)
}

/// Median and mean power frequency over the first `SPECTRUM_WINDOW` samples,
/// mean-removed. Spectrum bins are k = 0..N/2-1 with power |X_k|^2 and bin
/// width rate/N; MDF is the first frequency where cumulative power reaches
/// half the total, MPF the power-weighted mean frequency. Both are 0 when the
/// window carries no power.
fn frequency_features(data: &[f64], rate: f64) -> (f64, f64) {
    let n = data.len().min(SPECTRUM_WINDOW);
    if n == 0 {
        return (0.0, 0.0);
    }
    let m = mean(&data[..n]);
    let mut window: Vec<f64> = data[..n].iter().map(|v| v - m).collect();

    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(n);
    let mut spectrum = r2c.make_output_vec();
    r2c.process(&mut window, &mut spectrum).unwrap();

    let mut total = 0.0;
    let powers: Vec<f64> = spectrum[..n / 2]
        .iter()
        .map(|c| {
            let p = c.norm_sqr();
            total += p;
            p
        })
        .collect();
    if total <= 0.0 {
        return (0.0, 0.0);
    }

    let df = rate / n as f64;
    let half = total * 0.5;
    let mut cum = 0.0;
    let mut mdf = 0.0;
    let mut weighted = 0.0;
    for (k, &p) in powers.iter().enumerate() {
        let f = k as f64 * df;
        cum += p;
        if mdf == 0.0 && cum >= half {
            mdf = f;
        }
        weighted += f * p;
    }
    (mdf, weighted / total)
}

/// Parse one EMG export (up to two leading tokens per line as arm, neck) and
/// compute per-channel features plus the arm display series.
pub fn analyze_emg(path: &Path, cfg: &EmgConfig) -> Result<EmgAnalysis> {
    let parsed = table::read_table(path, ColumnRule::Leading(2))?;
    let rate = parsed.sample_rate();
    let arm = parsed.column(0);
    let neck = parsed.column(1);

    let metrics = EmgMetrics {
        arm: channel_features(&arm, rate),
        neck: if neck.iter().any(|v| *v != 0.0) {
            Some(channel_features(&neck, rate))
        } else {
            None
        },
    };

    let reduced = downsample(&arm, cfg.display_points);
    let effective = reduced.effective_rate(rate);
    let time = time_axis(reduced.data.len(), effective);
    Ok(EmgAnalysis {
        sample_rate: rate,
        metrics,
        voltage: reduced.data,
        time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual} (diff {diff} > tol {tol})"
        );
    }

    #[test]
    fn constant_signal_time_features() {
        let data = vec![-3.0; 100];
        let f = channel_features(&data, 1000.0);
        assert_close(f.mav, 3.0, 1e-12);
        assert_close(f.rms, 3.0, 1e-12);
        assert_close(f.iemg, 300.0, 1e-12);
        assert_close(f.max_amp, 3.0, 1e-12);
        // mean removal leaves no power
        assert_eq!(f.mdf, 0.0);
        assert_eq!(f.mpf, 0.0);
    }

    #[test]
    fn pure_tone_concentrates_spectrum() {
        let rate = 1000.0;
        let n = 2048;
        let f0 = 125.0; // exactly bin 256 of a 2048-point window
        let data: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * f0 * i as f64 / rate).sin())
            .collect();
        let f = channel_features(&data, rate);
        assert_close(f.mdf, f0, 1e-6);
        assert_close(f.mpf, f0, 1e-6);
    }

    #[test]
    fn spectrum_uses_only_the_first_window() {
        let rate = 1000.0;
        let f0 = 125.0; // exactly bin 512 of the 4096-point window
        // a clean tone inside the 4096-sample window, junk far beyond it
        let mut data: Vec<f64> = (0..SPECTRUM_WINDOW)
            .map(|i| (2.0 * PI * f0 * i as f64 / rate).sin())
            .collect();
        data.extend(std::iter::repeat(1e6).take(1000));
        let (mdf, mpf) = frequency_features(&data, rate);
        assert_close(mdf, f0, 1e-6);
        assert_close(mpf, f0, 1e-6);
    }

    #[test]
    fn empty_channel_features_are_zero() {
        let f = channel_features(&[], 1000.0);
        assert_eq!(f.mav, 0.0);
        assert_eq!(f.rms, 0.0);
        assert_eq!(f.iemg, 0.0);
        assert_eq!(f.max_amp, 0.0);
        assert_eq!(f.mdf, 0.0);
        assert_eq!(f.mpf, 0.0);
    }

    #[test]
    fn silent_neck_channel_reports_null_features() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emg.txt");
        let mut body = String::from("arm neck\n");
        for i in 0..500 {
            body.push_str(&format!("{} 0\n", (i % 7) as f64 * 0.1 + 0.1));
        }
        std::fs::write(&path, body).unwrap();
        let analysis = analyze_emg(&path, &EmgConfig::default()).unwrap();
        assert!(analysis.metrics.neck.is_none());
        assert!(analysis.metrics.arm.mav > 0.0);
        assert_eq!(analysis.voltage.len(), 500);
    }

    #[test]
    fn active_neck_channel_is_analyzed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emg.txt");
        std::fs::write(&path, "1.0 0.0\n2.0 0.5\n1.5 0.0\n").unwrap();
        let analysis = analyze_emg(&path, &EmgConfig::default()).unwrap();
        let neck = analysis.metrics.neck.expect("neck has signal");
        assert_close(neck.max_amp, 0.5, 1e-12);
    }
}
