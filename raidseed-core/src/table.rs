use flate2::read::GzDecoder;
use serde::Serialize;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::encounter::{decode_all, decode_lenient, DecodeError, EncounterRecord};
use crate::{RaidSeedError, Result};

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];
const TABLE_EXTENSIONS: &[&str] = &["bin", "pkl", "gz"];

/// One decoded encounter file.
#[derive(Debug, Clone, Serialize)]
pub struct EncounterTable {
    pub source: PathBuf,
    pub records: Vec<EncounterRecord>,
    /// Buffer index of each entry in `records`.
    #[serde(skip)]
    pub indices: Vec<usize>,
    #[serde(skip)]
    pub skipped: Vec<DecodeError>,
}

/// Read a table file, inflating it first if it is gzip-compressed.
pub fn read_table_bytes(path: &Path) -> Result<Vec<u8>> {
    let raw = fs::read(path)?;
    if !raw.starts_with(&GZIP_MAGIC) {
        return Ok(raw);
    }

    let mut decoder = GzDecoder::new(raw.as_slice());
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    tracing::debug!(
        "inflated {} ({} -> {} bytes)",
        path.display(),
        raw.len(),
        out.len()
    );
    Ok(out)
}

pub fn load_table(path: &Path, skip_malformed: bool) -> Result<EncounterTable> {
    let data = read_table_bytes(path)?;
    let wrap = |source| RaidSeedError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let (indices, records, skipped) = if skip_malformed {
        let (kept, skipped) = decode_lenient(&data).map_err(wrap)?;
        let (indices, records): (Vec<usize>, Vec<EncounterRecord>) = kept.into_iter().unzip();
        (indices, records, skipped)
    } else {
        let records = decode_all(&data).map_err(wrap)?;
        ((0..records.len()).collect(), records, Vec::new())
    };

    Ok(EncounterTable {
        source: path.to_path_buf(),
        records,
        indices,
        skipped,
    })
}

fn is_table_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            TABLE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Load a single table file, or every table file under a directory in
/// file-name order.
pub fn load_tables(path: &Path, skip_malformed: bool) -> Result<Vec<EncounterTable>> {
    if !path.exists() {
        return Err(RaidSeedError::Config(format!(
            "Input path does not exist: {}",
            path.display()
        )));
    }

    if path.is_file() {
        return Ok(vec![load_table(path, skip_malformed)?]);
    }

    let mut tables = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(|e| RaidSeedError::Config(e.to_string()))?;
        if entry.file_type().is_file() && is_table_file(entry.path()) {
            tables.push(load_table(entry.path(), skip_malformed)?);
        }
    }

    if tables.is_empty() {
        return Err(RaidSeedError::Config(format!(
            "No encounter tables found under {}",
            path.display()
        )));
    }

    Ok(tables)
}
