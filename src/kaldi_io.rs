//! Reading Kaldi matrix tables.
//!
//! Supports `scp` files pointing into archives (with or without a byte
//! offset) and `ark` archives directly. Matrices may be stored in binary
//! (`FM` / `DM`) or text form. Compressed matrices and piped commands are
//! not supported.

use eyre::{bail, eyre, Result, WrapErr};
use ndarray::Array2;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::open_text;

const MAX_PREALLOC: usize = 1 << 20;

/// A keyed matrix as stored in a Kaldi table.
pub type KeyedMatrix = (String, Array2<f64>);

/// Reads every matrix named by an rspecifier: `scp:<path>`, `ark:<path>` or
/// a bare path, which is treated as an scp file.
pub fn read_scores(rspecifier: &str) -> Result<Vec<KeyedMatrix>> {
    match split_rspecifier(rspecifier)? {
        (TableKind::Archive, path) => read_mat_ark(path),
        (TableKind::Script, path) => read_mat_scp(path),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableKind {
    Archive,
    Script,
}

fn split_rspecifier(rspecifier: &str) -> Result<(TableKind, &str)> {
    let (kind, path) = match rspecifier.split_once(':') {
        Some((prefix, rest)) => match prefix.split(',').next() {
            Some("ark") => (TableKind::Archive, rest),
            Some("scp") => (TableKind::Script, rest),
            _ => (TableKind::Script, rspecifier),
        },
        None => (TableKind::Script, rspecifier),
    };
    if path == "-" || path.trim_end().ends_with('|') || path.trim_start().starts_with('|') {
        bail!("unsupported rspecifier {rspecifier:?}: pipes and stdin cannot be read");
    }
    Ok((kind, path))
}

/// Reads an scp file of `key rxfilename[:offset]` lines.
pub fn read_mat_scp<P: AsRef<Path>>(path: P) -> Result<Vec<KeyedMatrix>> {
    let path = path.as_ref();
    let reader = open_text(path)?;
    let mut matrices = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, rxfilename)) = line.split_once(char::is_whitespace) else {
            bail!("{}:{}: expected `<key> <rxfilename>`", path.display(), lineno + 1);
        };
        let matrix = read_rxfilename(rxfilename.trim())
            .wrap_err_with(|| format!("{}:{}: reading matrix {key}", path.display(), lineno + 1))?;
        matrices.push((key.to_string(), matrix));
    }
    tracing::debug!("read {} matrices from {}", matrices.len(), path.display());
    Ok(matrices)
}

fn read_rxfilename(rxfilename: &str) -> Result<Array2<f64>> {
    if rxfilename.ends_with('|') {
        bail!("piped rxfilename {rxfilename:?} is not supported");
    }
    let (file, offset) = match rxfilename.rsplit_once(':') {
        Some((file, offset)) if !offset.is_empty() && offset.bytes().all(|b| b.is_ascii_digit()) => {
            (file, Some(offset.parse::<u64>()?))
        }
        _ => (rxfilename, None),
    };
    let mut handle = File::open(file).wrap_err_with(|| format!("opening {file}"))?;
    if let Some(offset) = offset {
        handle.seek(SeekFrom::Start(offset))?;
    }
    read_matrix(&mut BufReader::new(handle))
}

/// Reads every `key matrix` entry of an archive.
pub fn read_mat_ark<P: AsRef<Path>>(path: P) -> Result<Vec<KeyedMatrix>> {
    let path = path.as_ref();
    let file = File::open(path).wrap_err_with(|| format!("opening {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut matrices = Vec::new();
    while let Some(key) = read_key(&mut reader)? {
        let matrix = read_matrix(&mut reader)
            .wrap_err_with(|| format!("{}: reading matrix {key}", path.display()))?;
        matrices.push((key, matrix));
    }
    tracing::debug!("read {} matrices from {}", matrices.len(), path.display());
    Ok(matrices)
}

fn read_key<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    skip_whitespace(reader)?;
    let mut key = Vec::new();
    loop {
        let buf = reader.fill_buf()?;
        let Some(&byte) = buf.first() else { break };
        reader.consume(1);
        if byte == b' ' {
            break;
        }
        if byte.is_ascii_whitespace() {
            bail!("archive key {:?} is not followed by a space", String::from_utf8_lossy(&key));
        }
        key.push(byte);
    }
    if key.is_empty() {
        return Ok(None);
    }
    Ok(Some(String::from_utf8(key)?))
}

/// Reads one matrix, binary or text, from the current position.
pub fn read_matrix<R: BufRead>(reader: &mut R) -> Result<Array2<f64>> {
    // Text matrices never start with NUL, so one byte of lookahead is enough.
    let binary = reader.fill_buf()?.first() == Some(&0);
    if !binary {
        return read_text_matrix(reader);
    }
    let mut header = [0u8; 2];
    reader.read_exact(&mut header)?;
    if header[1] != b'B' {
        bail!("expected binary marker \\0B, found {header:?}");
    }
    read_binary_matrix(reader)
}

fn read_binary_matrix<R: BufRead>(reader: &mut R) -> Result<Array2<f64>> {
    let token = read_token(reader)?;
    let double = match token.as_str() {
        "FM" => false,
        "DM" => true,
        "CM" | "CM2" | "CM3" => bail!("compressed matrices are not supported"),
        other => bail!("unexpected matrix token {other:?}"),
    };
    let rows = read_dim(reader)?;
    let cols = read_dim(reader)?;
    let Some(len) = rows.checked_mul(cols) else {
        bail!("matrix dimensions {rows}x{cols} overflow");
    };
    // Dimensions come from the stream; a short stream fails in read_exact.
    let mut data = Vec::with_capacity(len.min(MAX_PREALLOC));
    if double {
        let mut bytes = [0u8; 8];
        for _ in 0..len {
            reader.read_exact(&mut bytes)?;
            data.push(f64::from_le_bytes(bytes));
        }
    } else {
        let mut bytes = [0u8; 4];
        for _ in 0..len {
            reader.read_exact(&mut bytes)?;
            data.push(f32::from_le_bytes(bytes) as f64);
        }
    }
    Ok(Array2::from_shape_vec((rows, cols), data)?)
}

fn read_token<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut token = Vec::new();
    reader.read_until(b' ', &mut token)?;
    if token.pop() != Some(b' ') {
        bail!("unexpected end of input while reading a token");
    }
    Ok(String::from_utf8(token)?)
}

fn read_dim<R: Read>(reader: &mut R) -> Result<usize> {
    let mut size = [0u8; 1];
    reader.read_exact(&mut size)?;
    if size[0] != 4 {
        bail!("expected a 4-byte integer, found size marker {}", size[0]);
    }
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    let value = i32::from_le_bytes(bytes);
    usize::try_from(value).map_err(|_| eyre!("negative matrix dimension {value}"))
}

fn read_text_matrix<R: BufRead>(reader: &mut R) -> Result<Array2<f64>> {
    skip_whitespace(reader)?;
    let mut open = [0u8; 1];
    reader.read_exact(&mut open)?;
    if open[0] != b'[' {
        bail!("expected '[' at the start of a text matrix, found {:?}", open[0] as char);
    }
    let mut body = Vec::new();
    reader.read_until(b']', &mut body)?;
    if body.pop() != Some(b']') {
        bail!("text matrix is missing its closing ']'");
    }
    let body = String::from_utf8(body)?;

    let mut cols = None;
    let mut rows = 0;
    let mut data = Vec::new();
    for line in body.lines().filter(|l| !l.trim().is_empty()) {
        let row = line
            .split_whitespace()
            .map(|v| v.parse::<f64>().wrap_err_with(|| format!("bad matrix value {v:?}")))
            .collect::<Result<Vec<_>>>()?;
        match cols {
            None => cols = Some(row.len()),
            Some(n) if n != row.len() => {
                bail!("ragged text matrix: row {rows} has {} columns, expected {n}", row.len())
            }
            Some(_) => {}
        }
        data.extend(row);
        rows += 1;
    }
    Ok(Array2::from_shape_vec((rows, cols.unwrap_or(0)), data)?)
}

fn skip_whitespace<R: BufRead>(reader: &mut R) -> Result<()> {
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(());
        }
        let n = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
        let done = n < buf.len();
        reader.consume(n);
        if done {
            return Ok(());
        }
    }
}
