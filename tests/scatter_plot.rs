use diarize_eval::scatter::{plot_scores, ScatterPlotConfig, ScatterPlotInputs};
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const SCORES_ARK: &str = "reco1 [\n  1 1 -1\n  1 1 -1\n  -1 -1 1 ]\n";

fn config() -> ScatterPlotConfig {
    ScatterPlotConfig {
        panel_size: (64, 64),
        ..Default::default()
    }
}

fn write(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

/// Text archive plus an scp pointing at the matrix offset inside it.
fn write_scores(dir: &Path) -> String {
    let ark = write(dir, "scores.ark", SCORES_ARK);
    let offset = "reco1 ".len();
    write(dir, "scores.scp", &format!("reco1 {ark}:{offset}\n"))
}

fn inputs(dir: &Path, scores: String, reco2utt: &str, utt2spk: Option<&str>) -> ScatterPlotInputs {
    ScatterPlotInputs {
        scores,
        reco2utt: write(dir, "reco2utt", reco2utt).into(),
        utt2spk: utt2spk.map(|text| write(dir, "utt2spk", text).into()),
        out_pdf: dir.join("plot").to_string_lossy().into_owned(),
    }
}

#[test]
fn test_plot_with_reference() {
    let dir = TempDir::new().unwrap();
    let scores = write_scores(dir.path());
    let inputs = inputs(
        dir.path(),
        scores,
        "reco1 u1 u2 u3\n",
        Some("u1 alice\nu2 alice\nu3 bob\n"),
    );

    let report = plot_scores(&config(), &inputs).unwrap();
    assert_eq!(report.recording, "reco1");
    assert_eq!(report.output, dir.path().join("plot-reco.pdf"));
    let alignment = report.alignment.unwrap();
    assert!((alignment - 1.0).abs() < 1e-9, "alignment {alignment}");

    let pdf = fs::read(&report.output).unwrap();
    assert!(pdf.starts_with(b"%PDF-1.4"));
    // Two stacked 64px panels.
    assert!(pdf.windows(19).any(|w| w == b"/Width 64 /Height 1"));
    assert!(String::from_utf8_lossy(&pdf).contains("(Scatter plot of scores) Tj"));
}

#[test]
fn test_plot_without_reference_from_binary_archive() {
    let dir = TempDir::new().unwrap();
    let mut ark = b"reco1 \0BFM ".to_vec();
    for dim in [2i32, 2] {
        ark.push(4);
        ark.extend(dim.to_le_bytes());
    }
    for v in [0.9f32, 0.1, 0.2, 0.8] {
        ark.extend(v.to_le_bytes());
    }
    let ark_path = dir.path().join("scores.ark");
    fs::write(&ark_path, ark).unwrap();

    let mut inputs = inputs(
        dir.path(),
        format!("ark:{}", ark_path.display()),
        "reco1 u1 u2\n",
        None,
    );
    inputs.out_pdf = dir.path().join("single").to_string_lossy().into_owned();
    let config = ScatterPlotConfig {
        title: Some("Cosine scores".into()),
        ..config()
    };

    let report = plot_scores(&config, &inputs).unwrap();
    assert!(report.alignment.is_none());
    assert!(report.summary().is_none());
    let pdf = fs::read(dir.path().join("single-reco.pdf")).unwrap();
    assert!(pdf.windows(18).any(|w| w == b"/Width 64 /Height "));
    assert!(String::from_utf8_lossy(&pdf).contains("(Cosine scores) Tj"));
}

#[test]
fn test_two_recordings_fail_without_output() {
    let dir = TempDir::new().unwrap();
    let scores = write_scores(dir.path());
    let inputs = inputs(dir.path(), scores, "reco1 u1 u2 u3\nreco2 u4\n", None);

    let err = plot_scores(&config(), &inputs).unwrap_err();
    assert!(err.to_string().contains("exactly one"));
    assert!(!dir.path().join("plot-reco.pdf").exists());
}

#[test]
fn test_missing_speaker_fails_without_output() {
    let dir = TempDir::new().unwrap();
    let scores = write_scores(dir.path());
    let inputs = inputs(
        dir.path(),
        scores,
        "reco1 u1 u2 u3\n",
        Some("u1 alice\nu2 alice\n"),
    );

    let err = plot_scores(&config(), &inputs).unwrap_err();
    assert!(format!("{err:#}").contains("u3"));
    assert!(!dir.path().join("plot-reco.pdf").exists());
}

#[test]
fn test_unknown_recording_fails() {
    let dir = TempDir::new().unwrap();
    let scores = write_scores(dir.path());
    let inputs = inputs(dir.path(), scores, "other u1 u2 u3\n", None);
    let err = plot_scores(&config(), &inputs).unwrap_err();
    assert!(err.to_string().contains("reco1"));
}

#[test]
fn test_shape_mismatch_with_reference_fails() {
    let dir = TempDir::new().unwrap();
    let scores = write_scores(dir.path());
    let inputs = inputs(dir.path(), scores, "reco1 u1 u2\n", Some("u1 a\nu2 b\n"));
    let err = plot_scores(&config(), &inputs).unwrap_err();
    assert!(err.to_string().contains("2 utterances"));
    assert!(!dir.path().join("plot-reco.pdf").exists());
}

#[test]
fn test_shape_unchecked_without_reference() {
    let dir = TempDir::new().unwrap();
    let scores = write_scores(dir.path());
    let inputs = inputs(dir.path(), scores, "reco1 u1 u2\n", None);
    let report = plot_scores(&config(), &inputs).unwrap();
    assert!(report.alignment.is_none());
    assert!(dir.path().join("plot-reco.pdf").exists());
}

#[test]
fn test_cli_prints_alignment() {
    let dir = TempDir::new().unwrap();
    let scores = write_scores(dir.path());
    let reco2utt = write(dir.path(), "reco2utt", "reco1 u1 u2 u3\n");
    let utt2spk = write(dir.path(), "utt2spk", "u1 a\nu2 a\nu3 b\n");
    let out = dir.path().join("cli");

    let output = Command::new(env!("CARGO_BIN_EXE_plot_scores_scatter_plot"))
        .env_remove("RUST_LOG")
        .args(["--utt2spk-file", utt2spk.as_str(), "--plot-title", "", "--use-agg", "false"])
        .arg(&scores)
        .arg(&reco2utt)
        .arg(&out)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Normalized dot product for recording reco1 is "));
    assert!(dir.path().join("cli-reco.pdf").exists());
}

#[test]
fn test_cli_rejects_bad_use_agg() {
    let output = Command::new(env!("CARGO_BIN_EXE_plot_scores_scatter_plot"))
        .args(["--use-agg", "maybe", "a.scp", "reco2utt", "out"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}
