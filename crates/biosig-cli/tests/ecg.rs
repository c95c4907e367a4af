use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::error::Error;

#[test]
fn pulse_train_reports_peaks_and_mean_rr() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ecg.txt");
    let mut body = String::from("Sampling Rate: 1000 Hz\n");
    for i in 1..=10_000 {
        body.push_str(if i % 800 == 0 { "1.0\n" } else { "0.0\n" });
    }
    std::fs::write(&path, body)?;

    let mut cmd = cargo_bin_cmd!("biosig");
    cmd.args(["ecg", "--input", path.to_str().expect("utf8 path")]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let v: Value = serde_json::from_slice(&output)?;

    assert_eq!(v["sample_rate"].as_f64(), Some(1000.0));
    assert_eq!(v["metrics"]["n_peaks"].as_u64(), Some(12));
    let mean_rr = v["metrics"]["mean_rr_ms"].as_f64().unwrap();
    assert!((mean_rr - 800.0).abs() < 1e-6, "mean RR was {mean_rr}");
    // 10k samples fit under the 20k display target unchanged
    assert_eq!(v["voltage"].as_array().unwrap().len(), 10_000);
    Ok(())
}

#[test]
fn header_rate_hint_rescales_intervals() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ecg500.txt");
    let mut body = String::from("Sample rate 500\n");
    for i in 1..=4_000 {
        body.push_str(if i % 400 == 0 { "1.0\n" } else { "0.0\n" });
    }
    std::fs::write(&path, body)?;

    let mut cmd = cargo_bin_cmd!("biosig");
    cmd.args(["ecg", "--input", path.to_str().expect("utf8 path")]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let v: Value = serde_json::from_slice(&output)?;

    // 400 samples at 500 Hz is 800 ms
    assert_eq!(v["sample_rate"].as_f64(), Some(500.0));
    let mean_rr = v["metrics"]["mean_rr_ms"].as_f64().unwrap();
    assert!((mean_rr - 800.0).abs() < 1e-6, "mean RR was {mean_rr}");
    Ok(())
}

#[test]
fn missing_input_file_fails_descriptively() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("biosig");
    cmd.args(["ecg", "--input", "/no/such/recording.txt"]);
    let output = cmd.output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("file not found"), "stderr was: {stderr}");
    Ok(())
}

#[test]
fn empty_file_reports_no_valid_data() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("empty.txt");
    std::fs::write(&path, "header line only\n")?;

    let mut cmd = cargo_bin_cmd!("biosig");
    cmd.args(["ecg", "--input", path.to_str().expect("utf8 path")]);
    let output = cmd.output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no valid data"), "stderr was: {stderr}");
    Ok(())
}
