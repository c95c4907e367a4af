use serde::{Deserialize, Serialize};

/// Uniformly sampled signal as read from one recording file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalSeries {
    /// Sampling rate in Hz, always positive.
    pub rate: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl SignalSeries {
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.rate
    }
}

/// Detected R-peak sample indices, ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Peaks {
    pub indices: Vec<usize>,
}

impl Peaks {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }
    pub fn len(&self) -> usize {
        self.indices.len()
    }
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Inter-peak intervals in milliseconds; always one shorter than the peak set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RrIntervals {
    pub ms: Vec<f64>,
}

impl RrIntervals {
    pub fn from_peaks(peaks: &Peaks, rate: f64) -> Self {
        let ms = peaks
            .indices
            .windows(2)
            .map(|w| (w[1] - w[0]) as f64 * 1000.0 / rate)
            .collect();
        Self { ms }
    }
}

/// Result of integer-stride downsampling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Downsampled {
    pub data: Vec<f64>,
    /// Stride actually used; 1 means the input was returned unchanged.
    pub stride: usize,
}

impl Downsampled {
    /// Sampling rate of the reduced series, so a reconstructed time axis
    /// stays aligned with the original signal.
    pub fn effective_rate(&self, rate: f64) -> f64 {
        rate / self.stride as f64
    }
}

/// Reduce a series to at most ~`target` points by taking every stride-th
/// sample. Exact subsampling, no interpolation: retained samples must align
/// with the original signal for later overlay use.
pub fn downsample(data: &[f64], target: usize) -> Downsampled {
    let target = target.max(1);
    if data.len() <= target {
        return Downsampled {
            data: data.to_vec(),
            stride: 1,
        };
    }
    let stride = data.len().div_ceil(target);
    let data = data.iter().step_by(stride).copied().collect();
    Downsampled { data, stride }
}

/// Time axis in seconds for a display series at the given effective rate.
pub fn time_axis(len: usize, effective_rate: f64) -> Vec<f64> {
    (0..len).map(|i| i as f64 / effective_rate).collect()
}

pub(crate) fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation (divides by n, not n-1).
pub(crate) fn population_std(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    (data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_series_returned_unchanged() {
        let data: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let out = downsample(&data, 20_000);
        assert_eq!(out.stride, 1);
        assert_eq!(out.data, data);
        assert!((out.effective_rate(1000.0) - 1000.0).abs() < 1e-12);
    }

    #[test]
    fn stride_is_ceil_of_ratio() {
        let data = vec![0.0; 50_001];
        let out = downsample(&data, 20_000);
        assert_eq!(out.stride, 3);
        assert_eq!(out.data.len(), 16_667);
    }

    #[test]
    fn output_length_bounded_by_target_plus_one() {
        for len in [20_001usize, 40_000, 40_001, 123_457] {
            let data = vec![1.0; len];
            let out = downsample(&data, 20_000);
            assert_eq!(out.stride, len.div_ceil(20_000));
            assert_eq!(out.data.len(), len.div_ceil(out.stride));
            assert!(out.data.len() <= 20_001);
        }
    }

    #[test]
    fn effective_rate_scales_time_axis() {
        let data: Vec<f64> = (0..40_000).map(|i| i as f64).collect();
        let out = downsample(&data, 20_000);
        assert_eq!(out.stride, 2);
        let fs = out.effective_rate(1000.0);
        let t = time_axis(out.data.len(), fs);
        // retained sample i came from original index i*stride, at i*stride/rate seconds
        assert!((t[10] - 20.0 / 1000.0).abs() < 1e-12);
    }

    #[test]
    fn rr_one_shorter_than_peaks() {
        let peaks = Peaks::from_indices(vec![100, 350, 600]);
        let rr = RrIntervals::from_peaks(&peaks, 1000.0);
        assert_eq!(rr.ms.len(), peaks.len() - 1);
        assert!((rr.ms[0] - 250.0).abs() < 1e-9);
        assert!((rr.ms[1] - 250.0).abs() < 1e-9);
    }

    #[test]
    fn population_std_matches_hand_computation() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_std(&data) - 2.0).abs() < 1e-12);
    }
}
