use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::encounter::{EncounterRecord, GameVersion};
use crate::stage::resolve_stage_for;

/// Narrows which records and stages count as a hit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HitFilter {
    pub game: Option<GameVersion>,
    pub stars: Option<u8>,
    pub stage: Option<usize>,
}

impl HitFilter {
    fn versions(&self) -> &[GameVersion] {
        match self.game {
            Some(GameVersion::Scarlet) => &[GameVersion::Scarlet],
            Some(GameVersion::Violet) => &[GameVersion::Violet],
            None => &GameVersion::ALL,
        }
    }

    fn accepts_record(&self, record: &EncounterRecord) -> bool {
        self.stars.map_or(true, |stars| record.stars == stars)
    }

    fn accepts_stage(&self, stage: usize) -> bool {
        self.stage.map_or(true, |wanted| wanted == stage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterHit {
    pub seed: u32,
    pub record: usize,
    pub stage: usize,
}

/// Every record in `records` that can appear for `seed`, in table order.
pub fn find_encounters(
    records: &[EncounterRecord],
    seed: u32,
    filter: &HitFilter,
) -> Vec<EncounterHit> {
    let versions = filter.versions();
    records
        .iter()
        .enumerate()
        .filter(|(_, record)| filter.accepts_record(record))
        .filter_map(|(index, record)| {
            let stage = resolve_stage_for(record, seed, versions)?;
            filter.accepts_stage(stage).then_some(EncounterHit {
                seed,
                record: index,
                stage,
            })
        })
        .collect()
}

/// Scan `count` consecutive seeds from `start` in parallel. The range is
/// clipped at the top of the 32-bit seed space. Hits come back ordered by
/// seed, then record index.
pub fn scan_seeds(
    records: &[EncounterRecord],
    start: u32,
    count: u64,
    filter: &HitFilter,
) -> Vec<EncounterHit> {
    let end = u64::from(start)
        .saturating_add(count)
        .min(u64::from(u32::MAX) + 1);

    (u64::from(start)..end)
        .into_par_iter()
        .flat_map_iter(|seed| find_encounters(records, seed as u32, filter))
        .collect()
}
