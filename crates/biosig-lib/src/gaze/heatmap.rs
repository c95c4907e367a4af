use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// One-degree yaw bins over [-180, 180).
pub const YAW_BINS: usize = 360;
/// One-degree pitch bins over [-90, 90).
pub const PITCH_BINS: usize = 180;

/// Count grid over (yaw, pitch); bin indices are always clamped in range.
#[derive(Debug, Clone)]
pub struct HeatmapGrid {
    cells: Vec<f64>,
}

impl Default for HeatmapGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl HeatmapGrid {
    pub fn new() -> Self {
        Self {
            cells: vec![0.0; YAW_BINS * PITCH_BINS],
        }
    }

    /// Count one gaze sample.
    pub fn record(&mut self, yaw_deg: f64, pitch_deg: f64) {
        let x = ((yaw_deg + 180.0).floor() as isize).clamp(0, YAW_BINS as isize - 1) as usize;
        let y = ((pitch_deg + 90.0).floor() as isize).clamp(0, PITCH_BINS as isize - 1) as usize;
        self.cells[y * YAW_BINS + x] += 1.0;
    }

    /// Separable Gaussian blur, kernel radius 3·sigma, edges clamped.
    pub fn blur(&mut self, sigma: f64) {
        let kernel = gaussian_kernel(sigma);
        let radius = (kernel.len() / 2) as isize;

        let mut temp = vec![0.0; self.cells.len()];
        for y in 0..PITCH_BINS {
            for x in 0..YAW_BINS {
                let mut acc = 0.0;
                for (k, w) in kernel.iter().enumerate() {
                    let px =
                        (x as isize + k as isize - radius).clamp(0, YAW_BINS as isize - 1) as usize;
                    acc += self.cells[y * YAW_BINS + px] * w;
                }
                temp[y * YAW_BINS + x] = acc;
            }
        }
        for x in 0..YAW_BINS {
            for y in 0..PITCH_BINS {
                let mut acc = 0.0;
                for (k, w) in kernel.iter().enumerate() {
                    let py = (y as isize + k as isize - radius).clamp(0, PITCH_BINS as isize - 1)
                        as usize;
                    acc += temp[py * YAW_BINS + x] * w;
                }
                self.cells[y * YAW_BINS + x] = acc;
            }
        }
    }

    /// Export bins above `threshold` as sparse [yaw, pitch, density] triples,
    /// yaw/pitch at the bin's lower edge in degrees.
    pub fn sparse_points(&self, threshold: f64) -> Vec<[f64; 3]> {
        let mut points = Vec::new();
        for y in 0..PITCH_BINS {
            for x in 0..YAW_BINS {
                let v = self.cells[y * YAW_BINS + x];
                if v > threshold {
                    points.push([x as f64 - 180.0, y as f64 - 90.0, v]);
                }
            }
        }
        points
    }

    pub fn total(&self) -> f64 {
        self.cells.iter().sum()
    }

    #[cfg(test)]
    fn cell(&self, x: usize, y: usize) -> f64 {
        self.cells[y * YAW_BINS + x]
    }
}

/// Sparse smoothed heatmap as shipped to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatmapData {
    /// [yaw, pitch, density] triples above the display threshold.
    pub points: Vec<[f64; 3]>,
    pub yaw_min: f64,
    pub yaw_max: f64,
    pub pitch_min: f64,
    pub pitch_max: f64,
}

impl HeatmapData {
    pub fn from_grid(grid: &HeatmapGrid, threshold: f64) -> Self {
        Self {
            points: grid.sparse_points(threshold),
            yaw_min: -180.0,
            yaw_max: 180.0,
            pitch_min: -90.0,
            pitch_max: 90.0,
        }
    }
}

/// Normalized 1-D Gaussian kernel with radius ceil(3·sigma).
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (3.0 * sigma).ceil() as isize;
    let factor = 1.0 / ((2.0 * PI).sqrt() * sigma);
    let mut kernel = Vec::with_capacity((2 * radius + 1) as usize);
    let mut sum = 0.0;
    for i in -radius..=radius {
        let x = i as f64;
        let v = factor * (-(x * x) / (2.0 * sigma * sigma)).exp();
        kernel.push(v);
        sum += v;
    }
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}
