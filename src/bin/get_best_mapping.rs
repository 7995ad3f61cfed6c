/*
Map each reference speaker to the system cluster it overlaps most.

cargo run --bin get_best_mapping -- --ref-speakers ref_speakers.txt mapping.csv
*/

use clap::Parser;
use diarize_eval::best_mapping::{parse_overlap_report, resolve, BestMappingConfig, OverlapTable};
use diarize_eval::{open_text, tables::read_id_list};
use eyre::{Result, WrapErr};
use std::io::Write;
use std::path::PathBuf;

/// Map each reference speaker to the system speaker it overlaps most
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Reference list of speakers.
    #[arg(long)]
    ref_speakers: Option<PathBuf>,

    /// Mapping file from md-eval.pl
    mapping: PathBuf,
}

fn main() -> Result<()> {
    diarize_eval::init_logging();
    let args = Args::parse();

    let records = parse_overlap_report(open_text(&args.mapping)?)
        .wrap_err_with(|| format!("parsing {}", args.mapping.display()))?;
    let table = OverlapTable::from_records(&records);
    tracing::debug!("{} overlap records", records.len());

    let ref_speakers = args
        .ref_speakers
        .as_ref()
        .map(|path| -> Result<Vec<String>> {
            read_id_list(open_text(path)?).wrap_err_with(|| format!("reading {}", path.display()))
        })
        .transpose()?;

    let mapping = resolve(&table, ref_speakers.as_deref(), &BestMappingConfig::default());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    mapping.write_to(&mut out)?;
    out.flush()?;
    Ok(())
}
