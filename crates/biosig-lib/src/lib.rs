pub mod detectors;
pub mod error;
pub mod gaze;
pub mod io;
pub mod metrics;
pub mod plot;
pub mod signal;

pub use detectors::*;
pub use error::*;
pub use gaze::*;
pub use metrics::*;
pub use signal::*;
