/*
Plot a recording's score matrix next to its same-speaker reference matrix.

cargo run --bin plot_scores_scatter_plot -- \
    --utt2spk-file data/dev/utt2spk --plot-title "PLDA scores" \
    exp/scores/scores.scp data/dev/reco2utt exp/plots/dev
*/

use clap::Parser;
use diarize_eval::scatter::{plot_scores, ScatterPlotConfig, ScatterPlotInputs};
use eyre::Result;
use std::path::PathBuf;

/// Plot scatter plot of scores
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Title of the plot
    #[arg(long)]
    plot_title: Option<String>,

    /// utt2spk file
    #[arg(long)]
    utt2spk_file: Option<PathBuf>,

    /// Render off-screen
    #[arg(long, default_value = "true", value_parser = ["true", "false"])]
    use_agg: String,

    /// Scp file of scores matrices
    scores_file: String,

    /// reco2utt file of scores matrices
    reco2utt_file: PathBuf,

    /// Output PDF file prefix
    out_pdf: String,
}

fn main() -> Result<()> {
    diarize_eval::init_logging();
    let args = Args::parse();

    let config = ScatterPlotConfig {
        title: args.plot_title,
        use_agg: args.use_agg == "true",
        ..Default::default()
    };
    let inputs = ScatterPlotInputs {
        scores: args.scores_file,
        reco2utt: args.reco2utt_file,
        utt2spk: args.utt2spk_file,
        out_pdf: args.out_pdf,
    };

    let report = plot_scores(&config, &inputs)?;
    if let Some(line) = report.summary() {
        eprintln!("{line}");
    }
    Ok(())
}
