use anyhow::{Context, Result};
use biosig_lib::{
    detectors::ecg::{analyze_ecg, EcgConfig},
    gaze::{analyze_gaze, analyze_gaze_batch, heatmap::HeatmapData, GazeConfig},
    metrics::emg::{analyze_emg, EmgConfig},
    plot::{figure_from_display, Figure, Series},
};
use clap::{Parser, Subcommand};
use plotters::prelude::*;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "biosig",
    version,
    about = "Biosignal feature extraction for lab recordings"
)]
struct Cli {
    /// TOML file overriding analyzer parameters
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect R-peaks and compute HRV metrics from an ECG export
    Ecg {
        #[arg(long)]
        input: PathBuf,
        /// Render the display series to a PNG
        #[arg(long)]
        plot: Option<PathBuf>,
    },
    /// Compute time/frequency-domain EMG features (arm + optional neck channel)
    Emg {
        #[arg(long)]
        input: PathBuf,
        /// Render the arm display series to a PNG
        #[arg(long)]
        plot: Option<PathBuf>,
    },
    /// Analyze one eye-tracking recording
    Gaze {
        #[arg(long)]
        input: PathBuf,
        /// Write the smoothed heatmap triples to a CSV file
        #[arg(long)]
        heatmap_csv: Option<PathBuf>,
    },
    /// Analyze five task recordings and average their metrics
    GazeBatch {
        /// The five task files, in task order
        #[arg(num_args = 5, value_name = "FILE")]
        inputs: Vec<PathBuf>,
        /// Write the first recording's heatmap triples to a CSV file
        #[arg(long)]
        heatmap_csv: Option<PathBuf>,
    },
}

/// Analyzer parameters; every field falls back to the built-in defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Settings {
    ecg: EcgConfig,
    emg: EmgConfig,
    gaze: GazeConfig,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_deref())?;
    match cli.command {
        Commands::Ecg { input, plot } => cmd_ecg(&input, plot.as_deref(), &settings.ecg)?,
        Commands::Emg { input, plot } => cmd_emg(&input, plot.as_deref(), &settings.emg)?,
        Commands::Gaze { input, heatmap_csv } => {
            cmd_gaze(&input, heatmap_csv.as_deref(), &settings.gaze)?
        }
        Commands::GazeBatch {
            inputs,
            heatmap_csv,
        } => cmd_gaze_batch(&inputs, heatmap_csv.as_deref(), &settings.gaze)?,
    }
    Ok(())
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings {}", path.display()))?;
            let settings = toml::from_str(&text)
                .with_context(|| format!("parsing settings {}", path.display()))?;
            log::info!("loaded analyzer settings from {}", path.display());
            Ok(settings)
        }
        None => Ok(Settings::default()),
    }
}

fn cmd_ecg(input: &Path, plot: Option<&Path>, cfg: &EcgConfig) -> Result<()> {
    let analysis = analyze_ecg(input, cfg)?;
    log::info!("{}: {} R-peaks", input.display(), analysis.metrics.n_peaks);
    if let Some(out) = plot {
        let fig = figure_from_display("ECG", &analysis.time, &analysis.voltage, 0xC62828);
        render_figure(out, &fig)?;
    }
    println!("{}", serde_json::to_string(&analysis)?);
    Ok(())
}

fn cmd_emg(input: &Path, plot: Option<&Path>, cfg: &EmgConfig) -> Result<()> {
    let analysis = analyze_emg(input, cfg)?;
    if let Some(out) = plot {
        let fig = figure_from_display("EMG arm", &analysis.time, &analysis.voltage, 0x1565C0);
        render_figure(out, &fig)?;
    }
    println!("{}", serde_json::to_string(&analysis)?);
    Ok(())
}

fn cmd_gaze(input: &Path, heatmap_csv: Option<&Path>, cfg: &GazeConfig) -> Result<()> {
    let analysis = analyze_gaze(input, cfg)?;
    log::info!(
        "{}: {} blinks, {} fixations, {} saccades",
        input.display(),
        analysis.metrics.blink_count,
        analysis.metrics.fixation_count,
        analysis.metrics.saccade_count
    );
    if let Some(out) = heatmap_csv {
        write_heatmap_csv(out, &analysis.heatmap)?;
    }
    println!("{}", serde_json::to_string(&analysis)?);
    Ok(())
}

fn cmd_gaze_batch(inputs: &[PathBuf], heatmap_csv: Option<&Path>, cfg: &GazeConfig) -> Result<()> {
    let batch = analyze_gaze_batch(inputs, cfg)?;
    if let Some(out) = heatmap_csv {
        if let Some(first) = batch.results.first() {
            write_heatmap_csv(out, &first.heatmap)?;
        }
    }
    println!("{}", serde_json::to_string(&batch)?);
    Ok(())
}

fn write_heatmap_csv(path: &Path, heatmap: &HeatmapData) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["yaw_deg", "pitch_deg", "density"])?;
    for [yaw, pitch, density] in &heatmap.points {
        writer.write_record(&[yaw.to_string(), pitch.to_string(), density.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

fn render_figure(path: &Path, fig: &Figure) -> Result<()> {
    let root = BitMapBackend::new(path, (800, 480)).into_drawing_area();
    root.fill(&WHITE)?;
    let points: Vec<[f64; 2]> = fig
        .series
        .iter()
        .flat_map(|series| match series {
            Series::Line(line) => line.points.clone(),
        })
        .collect();
    let (mut x_min, mut x_max) = (0.0_f64, 1.0_f64);
    let (mut y_min, mut y_max) = (0.0_f64, 1.0_f64);
    if let Some(first) = points.first() {
        x_min = first[0];
        x_max = first[0];
        y_min = first[1];
        y_max = first[1];
        for p in &points {
            x_min = x_min.min(p[0]);
            x_max = x_max.max(p[0]);
            y_min = y_min.min(p[1]);
            y_max = y_max.max(p[1]);
        }
    }
    // plotters rejects empty ranges; pad flat signals
    if x_max <= x_min {
        x_max = x_min + 1.0;
    }
    if y_max <= y_min {
        y_max = y_min + 1.0;
    }
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "Plot".into()),
            ("sans-serif", 24),
        )
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    chart.configure_mesh().draw()?;
    for series in &fig.series {
        match series {
            Series::Line(line) => {
                chart.draw_series(LineSeries::new(
                    line.points.iter().map(|p| (p[0], p[1])),
                    &RGBColor(
                        ((line.style.color.0 >> 16) & 0xFF) as u8,
                        ((line.style.color.0 >> 8) & 0xFF) as u8,
                        (line.style.color.0 & 0xFF) as u8,
                    ),
                ))?;
            }
        }
    }
    root.present()?;
    Ok(())
}
