pub mod emg;
pub mod hrv;
