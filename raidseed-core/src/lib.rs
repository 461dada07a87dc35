use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod encounter;
pub mod generate;
pub mod scan;
pub mod stage;
pub mod table;
pub mod xoroshiro;

pub use encounter::{
    decode_all, decode_lenient, DecodeError, EncounterRecord, GameVersion, RECORD_SIZE,
    STAGE_COUNT,
};
pub use scan::{find_encounters, scan_seeds, EncounterHit, HitFilter};
pub use stage::{
    can_be_encountered, max_active_stage, min_active_stage, resolve_stage, resolve_stage_for,
};
pub use table::{load_tables, EncounterTable};
pub use xoroshiro::{InvalidBound, Xoroshiro128Plus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinderSettings {
    pub input_path: PathBuf,
    pub seed_start: u32,
    pub seed_count: u64,
    #[serde(default)]
    pub game: Option<GameVersion>,
    #[serde(default)]
    pub stars: Option<u8>,
    #[serde(default)]
    pub stage: Option<usize>,
    #[serde(default)]
    pub skip_malformed: bool,
    #[serde(default)]
    pub debug: bool,
}

impl FinderSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn filter(&self) -> HitFilter {
        HitFilter {
            game: self.game,
            stars: self.stars,
            stage: self.stage,
        }
    }
}

#[derive(Debug, Error)]
pub enum RaidSeedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
    #[error("settings error: {0}")]
    Settings(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RaidSeedError>;

#[derive(Debug, Clone, Serialize)]
pub struct TableHits {
    pub source: PathBuf,
    pub record_count: usize,
    pub skipped_records: Vec<usize>,
    pub hits: Vec<ReportedHit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportedHit {
    pub seed: u32,
    pub stage: usize,
    /// Position of the record in the table file, counting skipped records.
    pub record: usize,
    pub species: u16,
    pub form: u8,
    pub stars: u8,
    pub identifier: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinderReport {
    pub seed_start: u32,
    pub seed_count: u64,
    pub tables: Vec<TableHits>,
}

impl FinderReport {
    pub fn total_hits(&self) -> usize {
        self.tables.iter().map(|t| t.hits.len()).sum()
    }
}

fn skipped_indices(table: &EncounterTable) -> Vec<usize> {
    table
        .skipped
        .iter()
        .filter_map(|err| match err {
            DecodeError::MalformedRecord { index, .. } => Some(*index),
            DecodeError::TruncatedInput { .. } => None,
        })
        .collect()
}

pub fn run(settings: &FinderSettings) -> Result<FinderReport> {
    if settings.seed_count == 0 {
        return Err(RaidSeedError::Config(
            "seed count must be at least 1".to_string(),
        ));
    }
    if settings.stage.is_some_and(|stage| stage >= STAGE_COUNT) {
        return Err(RaidSeedError::Config(format!(
            "stage must be below {STAGE_COUNT}"
        )));
    }

    let tables = load_tables(&settings.input_path, settings.skip_malformed)?;
    tracing::info!(
        "loaded {} encounter table(s) from {}",
        tables.len(),
        settings.input_path.display()
    );

    let filter = settings.filter();
    let mut report = FinderReport {
        seed_start: settings.seed_start,
        seed_count: settings.seed_count,
        tables: Vec::with_capacity(tables.len()),
    };

    for table in &tables {
        let hits = scan_seeds(
            &table.records,
            settings.seed_start,
            settings.seed_count,
            &filter,
        );
        tracing::info!(
            "{}: {} record(s), {} hit(s)",
            table.source.display(),
            table.records.len(),
            hits.len()
        );

        let hits = hits
            .into_iter()
            .map(|hit| {
                let record = &table.records[hit.record];
                ReportedHit {
                    seed: hit.seed,
                    stage: hit.stage,
                    record: table.indices[hit.record],
                    species: record.species,
                    form: record.form,
                    stars: record.stars,
                    identifier: record.identifier,
                }
            })
            .collect();

        report.tables.push(TableHits {
            source: table.source.clone(),
            record_count: table.records.len(),
            skipped_records: skipped_indices(table),
            hits,
        });
    }

    Ok(report)
}
