use eyre::{bail, Result, WrapErr};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use crate::open_text;

/// Recording id to its ordered utterance ids, as found in a `reco2utt` file.
#[derive(Debug, Clone, Default)]
pub struct RecoToUtts {
    entries: Vec<(String, Vec<String>)>,
}

impl RecoToUtts {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        Self::read(open_text(path)?).wrap_err_with(|| format!("reading {}", path.display()))
    }

    /// Parses `reco-id utt1 utt2 ...` lines. A recording listed twice keeps
    /// its position and takes the utterances of the later line.
    pub fn read<R: BufRead>(reader: R) -> Result<Self> {
        let mut entries: Vec<(String, Vec<String>)> = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let mut parts = line.split_whitespace();
            let Some(reco) = parts.next() else {
                bail!("line {}: expected a recording id", lineno + 1);
            };
            let utts: Vec<String> = parts.map(String::from).collect();
            match entries.iter_mut().find(|(r, _)| r == reco) {
                Some(entry) => entry.1 = utts,
                None => entries.push((reco.to_string(), utts)),
            }
        }
        tracing::debug!("read {} recordings", entries.len());
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, reco: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(r, _)| r == reco)
            .map(|(_, utts)| utts.as_slice())
    }

    pub fn recordings(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(r, _)| r.as_str())
    }
}

/// Utterance to speaker map. Speaker labels get dense integer ids in the
/// order they are first seen.
#[derive(Debug, Clone, Default)]
pub struct UttToSpeaker {
    speakers: Vec<String>,
    speaker_ids: HashMap<String, usize>,
    utt2spk: HashMap<String, usize>,
}

impl UttToSpeaker {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        Self::read(open_text(path)?).wrap_err_with(|| format!("reading {}", path.display()))
    }

    pub fn read<R: BufRead>(reader: R) -> Result<Self> {
        let mut map = Self::default();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let mut parts = line.split_whitespace();
            let (Some(utt), Some(spk)) = (parts.next(), parts.next()) else {
                bail!("line {}: expected `<utt-id> <spk-id>`", lineno + 1);
            };
            map.insert(utt, spk);
        }
        tracing::debug!(
            "read {} utterances from {} speakers",
            map.utt2spk.len(),
            map.speakers.len()
        );
        Ok(map)
    }

    pub fn insert(&mut self, utt: &str, spk: &str) {
        let id = match self.speaker_ids.get(spk) {
            Some(&id) => id,
            None => {
                let id = self.speakers.len();
                self.speakers.push(spk.to_string());
                self.speaker_ids.insert(spk.to_string(), id);
                id
            }
        };
        self.utt2spk.insert(utt.to_string(), id);
    }

    pub fn speaker_id(&self, utt: &str) -> Option<usize> {
        self.utt2spk.get(utt).copied()
    }

    pub fn speaker_label(&self, id: usize) -> Option<&str> {
        self.speakers.get(id).map(String::as_str)
    }

    pub fn num_speakers(&self) -> usize {
        self.speakers.len()
    }

    pub fn len(&self) -> usize {
        self.utt2spk.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utt2spk.is_empty()
    }
}

/// Reads one id per line, keeping the first whitespace-delimited token.
pub fn read_id_list<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        match line.split_whitespace().next() {
            Some(id) => ids.push(id.to_string()),
            None => bail!("line {}: expected an id", lineno + 1),
        }
    }
    Ok(ids)
}
