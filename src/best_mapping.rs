//! Best mapping between reference speakers and system clusters.
//!
//! The input is the comma separated speaker mapping report written by
//! md-eval: a header line, then one line per (reference, system) pair with
//! the reference speaker in column 2, the system speaker in column 3 and the
//! overlap time in seconds in column 5.

use eyre::{bail, Result, WrapErr};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, Write};

/// Mapped to reference speakers that never overlap any system speaker.
pub const SILENCE: &str = "Silence";

const REF_COLUMN: usize = 2;
const SYS_COLUMN: usize = 3;
const TIME_COLUMN: usize = 5;

#[derive(Debug, Clone)]
pub struct BestMappingConfig {
    pub silence_label: String,
}

impl Default for BestMappingConfig {
    fn default() -> Self {
        Self {
            silence_label: SILENCE.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlapRecord {
    pub ref_spk: String,
    pub sys_spk: String,
    pub time: f64,
}

impl OverlapRecord {
    pub fn parse_line(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.trim().split(',').collect();
        if parts.len() <= TIME_COLUMN {
            bail!(
                "expected at least {} comma separated fields, found {}",
                TIME_COLUMN + 1,
                parts.len()
            );
        }
        let time = parts[TIME_COLUMN]
            .trim()
            .parse::<f64>()
            .wrap_err_with(|| format!("invalid overlap time {:?}", parts[TIME_COLUMN]))?;
        Ok(Self {
            ref_spk: parts[REF_COLUMN].to_string(),
            sys_spk: parts[SYS_COLUMN].to_string(),
            time,
        })
    }
}

/// Parses a mapping report. The first line is always treated as the header
/// and dropped, whatever it contains.
pub fn parse_overlap_report<R: BufRead>(reader: R) -> Result<Vec<OverlapRecord>> {
    let mut records = Vec::new();
    for (lineno, line) in reader.lines().enumerate().skip(1) {
        let line = line?;
        let record =
            OverlapRecord::parse_line(&line).wrap_err_with(|| format!("line {}", lineno + 1))?;
        records.push(record);
    }
    Ok(records)
}

/// Overlap time totals accumulated from the report.
#[derive(Debug, Clone, Default)]
pub struct OverlapTable {
    ref_times: HashMap<String, f64>,
    sys_times: HashMap<String, f64>,
    pair_times: HashMap<String, HashMap<String, f64>>,
    ref_to_sys: BTreeMap<String, Vec<String>>,
}

impl OverlapTable {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a OverlapRecord>,
    {
        let mut table = Self::default();
        for record in records {
            table.record(record);
        }
        table
    }

    pub fn record(&mut self, record: &OverlapRecord) {
        let OverlapRecord {
            ref_spk,
            sys_spk,
            time,
        } = record;
        self.ref_to_sys
            .entry(ref_spk.clone())
            .or_default()
            .push(sys_spk.clone());
        *self.ref_times.entry(ref_spk.clone()).or_insert(0.0) += time;
        *self.sys_times.entry(sys_spk.clone()).or_insert(0.0) += time;
        *self
            .pair_times
            .entry(ref_spk.clone())
            .or_default()
            .entry(sys_spk.clone())
            .or_insert(0.0) += time;
    }

    pub fn ref_time(&self, ref_spk: &str) -> f64 {
        self.ref_times.get(ref_spk).copied().unwrap_or(0.0)
    }

    pub fn sys_time(&self, sys_spk: &str) -> f64 {
        self.sys_times.get(sys_spk).copied().unwrap_or(0.0)
    }

    pub fn pair_time(&self, ref_spk: &str, sys_spk: &str) -> f64 {
        self.pair_times
            .get(ref_spk)
            .and_then(|times| times.get(sys_spk))
            .copied()
            .unwrap_or(0.0)
    }

    /// System speakers paired with `ref_spk`, in report order, repeats kept.
    pub fn system_speakers(&self, ref_spk: &str) -> &[String] {
        self.ref_to_sys
            .get(ref_spk)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn reference_speakers(&self) -> impl Iterator<Item = &str> {
        self.ref_to_sys.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.ref_to_sys.is_empty()
    }

    /// System speaker with the largest overlap with `ref_spk`.
    ///
    /// Candidates compare as `(time, label)` pairs, so on equal time the
    /// larger label wins.
    pub fn best_system_speaker(&self, ref_spk: &str) -> Option<&str> {
        self.system_speakers(ref_spk)
            .iter()
            .map(|sys_spk| (self.pair_time(ref_spk, sys_spk), sys_spk.as_str()))
            .max_by(|a, b| compare_times(a.0, b.0).then_with(|| a.1.cmp(b.1)))
            .map(|(_, sys_spk)| sys_spk)
    }
}

// -0.0 and 0.0 compare equal. The total_cmp fallback only orders NaN pairs,
// so the result is not a total order when NaN times are present.
fn compare_times(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
}

/// Reference speaker to best system speaker, ordered by reference label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BestMapping {
    map: BTreeMap<String, String>,
}

impl BestMapping {
    pub fn get(&self, ref_spk: &str) -> Option<&str> {
        self.map.get(ref_spk).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(r, s)| (r.as_str(), s.as_str()))
    }

    /// Writes `<ref> <sys>` lines.
    pub fn write_to<W: Write>(&self, mut out: W) -> Result<()> {
        for (ref_spk, sys_spk) in self.iter() {
            writeln!(out, "{ref_spk} {sys_spk}")?;
        }
        Ok(())
    }
}

/// Resolves the best system speaker for every reference speaker in `table`.
///
/// Speakers in `ref_speakers` start out mapped to the silence label, so
/// those without any overlap still appear in the result.
pub fn resolve(
    table: &OverlapTable,
    ref_speakers: Option<&[String]>,
    config: &BestMappingConfig,
) -> BestMapping {
    let mut map = BTreeMap::new();
    for ref_spk in ref_speakers.unwrap_or_default() {
        map.insert(ref_spk.clone(), config.silence_label.clone());
    }
    for ref_spk in table.reference_speakers() {
        if let Some(best) = table.best_system_speaker(ref_spk) {
            tracing::debug!(
                "{ref_spk}: {best} covers {:.2}s of {:.2}s",
                table.pair_time(ref_spk, best),
                table.ref_time(ref_spk)
            );
            map.insert(ref_spk.to_string(), best.to_string());
        }
    }
    BestMapping { map }
}
