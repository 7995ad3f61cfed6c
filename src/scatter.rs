use eyre::{bail, eyre, Result, WrapErr};
use ndarray::Array2;
use std::path::{Path, PathBuf};

use crate::heatmap::render_panels;
use crate::kaldi_io::read_scores;
use crate::linalg::normalized_alignment;
use crate::pdf::render_pdf;
use crate::tables::{RecoToUtts, UttToSpeaker};

pub const DEFAULT_TITLE: &str = "Scatter plot of scores";

#[derive(Debug, Clone)]
pub struct ScatterPlotConfig {
    /// Figure title. `None` or an empty string selects [`DEFAULT_TITLE`].
    pub title: Option<String>,
    /// Pixel size of each heat-map panel.
    pub panel_size: (u32, u32),
    /// Render off-screen. Kept for command-line compatibility; rendering is
    /// always off-screen.
    pub use_agg: bool,
}

impl Default for ScatterPlotConfig {
    fn default() -> Self {
        Self {
            title: None,
            panel_size: (480, 480),
            use_agg: true,
        }
    }
}

impl ScatterPlotConfig {
    pub fn title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => DEFAULT_TITLE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScatterPlotInputs {
    /// Score matrices: `scp:<path>`, `ark:<path>` or a bare scp path.
    pub scores: String,
    pub reco2utt: PathBuf,
    pub utt2spk: Option<PathBuf>,
    /// Output prefix; the PDF goes to `<out_pdf>-reco.pdf`.
    pub out_pdf: String,
}

#[derive(Debug, Clone)]
pub struct ScoreReport {
    pub recording: String,
    pub output: PathBuf,
    /// Normalized dot product against the reference, when `utt2spk` was given.
    pub alignment: Option<f64>,
}

impl ScoreReport {
    pub fn summary(&self) -> Option<String> {
        self.alignment.map(|value| {
            format!(
                "Normalized dot product for recording {} is {}",
                self.recording, value
            )
        })
    }
}

pub fn output_path(prefix: &str) -> PathBuf {
    PathBuf::from(format!("{prefix}-reco.pdf"))
}

/// Same-speaker indicator for every utterance pair: +1 when both utterances
/// share a speaker, -1 otherwise. Row and column order follow `utts`.
pub fn reference_matrix(utts: &[String], utt2spk: &UttToSpeaker) -> Result<Array2<f64>> {
    let speakers = utts
        .iter()
        .map(|utt| {
            utt2spk
                .speaker_id(utt)
                .ok_or_else(|| eyre!("utterance {utt} has no speaker in utt2spk"))
        })
        .collect::<Result<Vec<_>>>()?;
    let n = speakers.len();
    Ok(Array2::from_shape_fn((n, n), |(i, j)| {
        if speakers[i] == speakers[j] {
            1.0
        } else {
            -1.0
        }
    }))
}

/// Plots the single recording's score matrix (and its reference matrix
/// when `utt2spk` is given) into one PDF.
///
/// Nothing is written unless every input checks out.
pub fn plot_scores(config: &ScatterPlotConfig, inputs: &ScatterPlotInputs) -> Result<ScoreReport> {
    if !config.use_agg {
        tracing::debug!("no interactive backend available, rendering off-screen");
    }

    let reco2utt = RecoToUtts::open(&inputs.reco2utt)?;
    let utt2spk = inputs
        .utt2spk
        .as_deref()
        .map(UttToSpeaker::open)
        .transpose()?;
    if reco2utt.len() != 1 {
        bail!(
            "{} lists {} recordings, exactly one is required",
            inputs.reco2utt.display(),
            reco2utt.len()
        );
    }

    let mut scores = read_scores(&inputs.scores)?;
    if scores.len() != 1 {
        bail!(
            "{} holds {} score matrices, exactly one is required",
            inputs.scores,
            scores.len()
        );
    }
    let Some((reco, scores_mat)) = scores.pop() else {
        bail!("no score matrix in {}", inputs.scores);
    };

    let utts = reco2utt
        .get(&reco)
        .ok_or_else(|| eyre!("recording {reco} not found in {}", inputs.reco2utt.display()))?;
    // Without speaker labels the matrix is plotted as is.
    if utt2spk.is_some() && scores_mat.dim() != (utts.len(), utts.len()) {
        bail!(
            "score matrix for {reco} is {:?} but the recording has {} utterances",
            scores_mat.dim(),
            utts.len()
        );
    }

    let reference = utt2spk
        .as_ref()
        .map(|utt2spk| reference_matrix(utts, utt2spk))
        .transpose()
        .wrap_err_with(|| format!("building reference matrix for {reco}"))?;
    let alignment = reference
        .as_ref()
        .map(|reference| normalized_alignment(reference, &scores_mat))
        .transpose()?;

    let mut panels = vec![&scores_mat];
    panels.extend(reference.as_ref());
    let raster = render_panels(&panels, config.panel_size)?;
    let pdf = render_pdf(&raster, config.title())?;

    let output = output_path(&inputs.out_pdf);
    write_output(&output, &pdf)?;
    tracing::info!("wrote {}", output.display());

    Ok(ScoreReport {
        recording: reco,
        output,
        alignment,
    })
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).wrap_err_with(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utt2spk(pairs: &[(&str, &str)]) -> UttToSpeaker {
        let mut map = UttToSpeaker::default();
        for (utt, spk) in pairs {
            map.insert(utt, spk);
        }
        map
    }

    fn utts(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_reference_matrix_properties() {
        let map = utt2spk(&[("u1", "a"), ("u2", "b"), ("u3", "a"), ("u4", "c"), ("u5", "b")]);
        let m = reference_matrix(&utts(&["u5", "u1", "u2", "u4", "u3"]), &map).unwrap();
        assert_eq!(m.dim(), (5, 5));
        for i in 0..5 {
            assert_eq!(m[[i, i]], 1.0);
            for j in 0..5 {
                assert_eq!(m[[i, j]], m[[j, i]]);
                assert!(m[[i, j]] == 1.0 || m[[i, j]] == -1.0);
            }
        }
        // u5 and u2 share speaker b, u1 and u3 share a.
        assert_eq!(m[[0, 2]], 1.0);
        assert_eq!(m[[1, 4]], 1.0);
        assert_eq!(m[[0, 1]], -1.0);
        assert_eq!(m[[3, 4]], -1.0);
    }

    #[test]
    fn test_reference_matrix_missing_utterance() {
        let map = utt2spk(&[("u1", "a")]);
        let err = reference_matrix(&utts(&["u1", "u2"]), &map).unwrap_err();
        assert!(err.to_string().contains("u2"));
    }

    #[test]
    fn test_title_defaults() {
        let mut config = ScatterPlotConfig::default();
        assert_eq!(config.title(), DEFAULT_TITLE);
        config.title = Some(String::new());
        assert_eq!(config.title(), DEFAULT_TITLE);
        config.title = Some("PLDA scores".into());
        assert_eq!(config.title(), "PLDA scores");
    }

    #[test]
    fn test_output_path() {
        assert_eq!(output_path("exp/plots/scores"), PathBuf::from("exp/plots/scores-reco.pdf"));
    }

    #[test]
    fn test_summary_line() {
        let report = ScoreReport {
            recording: "iaaa".into(),
            output: PathBuf::from("x-reco.pdf"),
            alignment: Some(0.5),
        };
        assert_eq!(
            report.summary().as_deref(),
            Some("Normalized dot product for recording iaaa is 0.5")
        );
        let report = ScoreReport {
            alignment: None,
            ..report
        };
        assert!(report.summary().is_none());
    }
}
