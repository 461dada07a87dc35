use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Size in bytes of one serialized encounter record.
pub const RECORD_SIZE: usize = 0x56;

pub const STAGE_COUNT: usize = 4;

// Stage weights start here: per stage, min scarlet/violet then total scarlet/violet.
const WEIGHT_START: usize = 0x14;
const STAGE_STRIDE: usize = 8;

pub const RATIO_MAGIC_MALE: u8 = 0;
pub const RATIO_MAGIC_FEMALE: u8 = 254;
pub const RATIO_MAGIC_GENDERLESS: u8 = 255;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("encounter table is {len} bytes, not a multiple of the 0x56-byte record size")]
    TruncatedInput { len: usize },

    #[error("record {index}: unknown {field} value {value}")]
    MalformedRecord {
        index: usize,
        field: &'static str,
        value: u8,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum GameVersion {
    Scarlet,
    Violet,
}

impl GameVersion {
    /// Order in which a stage checks the two versions.
    pub const ALL: [GameVersion; 2] = [GameVersion::Scarlet, GameVersion::Violet];
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum AbilityPermission {
    Any12,
    Any12H,
    OnlyFirst,
    OnlySecond,
    OnlyHidden,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ShinyPolicy {
    Random,
    Never,
    Always,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum IvSetType {
    Unspecified,
    Specified,
}

/// How the explicit size byte is applied, if at all.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SizeType {
    Random,
    XS,
    S,
    M,
    L,
    XL,
    Value,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct IvSet {
    /// HP, Atk, Def, SpA, SpD, Spe. Negative entries are left to the roll.
    pub values: [i8; 6],
    pub kind: IvSetType,
}

impl IvSet {
    pub fn is_specified(&self) -> bool {
        self.kind == IvSetType::Specified
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct StageWeight {
    pub min: u16,
    pub total: u16,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct StageRates {
    pub scarlet: StageWeight,
    pub violet: StageWeight,
}

impl StageRates {
    pub fn get(&self, version: GameVersion) -> StageWeight {
        match version {
            GameVersion::Scarlet => self.scarlet,
            GameVersion::Violet => self.violet,
        }
    }

    /// A stage with both totals at zero is absent from the pool.
    pub fn is_active(&self) -> bool {
        self.scarlet.total != 0 || self.violet.total != 0
    }
}

/// One entry of the raid encounter pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterRecord {
    pub species: u16,
    pub form: u8,
    /// Stored byte minus one: 0 male, 1 female, 2 genderless, anything else
    /// defers to the species table.
    pub gender: i8,
    pub ability: AbilityPermission,
    pub flawless_iv_count: u8,
    pub shiny: ShinyPolicy,
    pub level: u8,
    pub moves: [u16; 4],
    pub tera_type: u8,
    pub index: u8,
    pub stars: u8,
    pub rand_rate: u8,
    pub stages: [StageRates; STAGE_COUNT],
    pub nature: u8,
    pub ivs: IvSet,
    pub scale_type: SizeType,
    /// Only meaningful when `scale_type` is [`SizeType::Value`].
    pub scale: u8,

    pub identifier: u32,
    pub fixed_reward_hash: u64,
    pub lottery_reward_hash: u64,
    pub item: i32,
}

impl EncounterRecord {
    pub fn stage(&self, stage: usize) -> Option<&StageRates> {
        self.stages.get(stage)
    }

    pub fn has_stage(&self, stage: usize) -> bool {
        self.stage(stage).is_some_and(StageRates::is_active)
    }

    pub fn is_distribution(&self) -> bool {
        self.index != 0
    }

    pub fn is_shiny(&self) -> bool {
        self.shiny == ShinyPolicy::Always
    }

    /// Gender ratio fixed by the record, or `None` when the species table decides.
    pub fn fixed_gender_ratio(&self) -> Option<u8> {
        match self.gender {
            0 => Some(RATIO_MAGIC_MALE),
            1 => Some(RATIO_MAGIC_FEMALE),
            2 => Some(RATIO_MAGIC_GENDERLESS),
            _ => None,
        }
    }
}

/// Decode every record in `data`. Any malformed record fails the whole buffer.
pub fn decode_all(data: &[u8]) -> Result<Vec<EncounterRecord>, DecodeError> {
    let chunks = record_chunks(data)?;
    let records = chunks
        .enumerate()
        .map(|(index, chunk)| read_encounter(index, chunk))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!("decoded {} encounter records", records.len());
    Ok(records)
}

/// Records kept by [`decode_lenient`], each paired with its index in the buffer.
pub type IndexedRecords = Vec<(usize, EncounterRecord)>;

/// Decode what can be decoded, handing back the malformed records' errors
/// alongside the good ones. A truncated buffer still fails outright.
pub fn decode_lenient(data: &[u8]) -> Result<(IndexedRecords, Vec<DecodeError>), DecodeError> {
    let mut records = Vec::with_capacity(data.len() / RECORD_SIZE);
    let mut skipped = Vec::new();

    for (index, chunk) in record_chunks(data)?.enumerate() {
        match read_encounter(index, chunk) {
            Ok(record) => records.push((index, record)),
            Err(err) => {
                tracing::warn!("skipping encounter: {err}");
                skipped.push(err);
            }
        }
    }

    tracing::debug!(
        "decoded {} encounter records, skipped {}",
        records.len(),
        skipped.len()
    );
    Ok((records, skipped))
}

fn record_chunks(data: &[u8]) -> Result<std::slice::ChunksExact<'_, u8>, DecodeError> {
    if data.len() % RECORD_SIZE != 0 {
        return Err(DecodeError::TruncatedInput { len: data.len() });
    }
    Ok(data.chunks_exact(RECORD_SIZE))
}

fn read_u16(data: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([data[off], data[off + 1]])
}

fn read_u32(data: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]])
}

fn read_u64(data: &[u8], off: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[off..off + 8]);
    u64::from_le_bytes(bytes)
}

fn read_stage(data: &[u8], stage: usize) -> StageRates {
    let base = WEIGHT_START + stage * STAGE_STRIDE;
    StageRates {
        scarlet: StageWeight {
            min: read_u16(data, base),
            total: read_u16(data, base + 4),
        },
        violet: StageWeight {
            min: read_u16(data, base + 2),
            total: read_u16(data, base + 6),
        },
    }
}

fn read_encounter(index: usize, data: &[u8]) -> Result<EncounterRecord, DecodeError> {
    let malformed = |field: &'static str, value: u8| DecodeError::MalformedRecord {
        index,
        field,
        value,
    };

    let ability = match data[0x04] {
        0 => AbilityPermission::Any12,
        1 => AbilityPermission::Any12H,
        2 => AbilityPermission::OnlyFirst,
        3 => AbilityPermission::OnlySecond,
        4 => AbilityPermission::OnlyHidden,
        other => return Err(malformed("ability", other)),
    };

    let shiny = match data[0x06] {
        0 => ShinyPolicy::Random,
        1 => ShinyPolicy::Never,
        2 => ShinyPolicy::Always,
        other => return Err(malformed("shiny", other)),
    };

    let iv_kind = match data[0x3B] {
        0 => IvSetType::Unspecified,
        1 => IvSetType::Specified,
        other => return Err(malformed("iv set type", other)),
    };

    let scale_type = match data[0x3C] {
        0 => SizeType::Random,
        1 => SizeType::XS,
        2 => SizeType::S,
        3 => SizeType::M,
        4 => SizeType::L,
        5 => SizeType::XL,
        6 => SizeType::Value,
        other => return Err(malformed("size type", other)),
    };

    let mut ivs = [0i8; 6];
    for (i, iv) in ivs.iter_mut().enumerate() {
        *iv = data[0x35 + i] as i8;
    }

    Ok(EncounterRecord {
        species: read_u16(data, 0x00),
        form: data[0x02],
        gender: data[0x03].wrapping_sub(1) as i8,
        ability,
        flawless_iv_count: data[0x05],
        shiny,
        level: data[0x07],
        moves: [
            read_u16(data, 0x08),
            read_u16(data, 0x0A),
            read_u16(data, 0x0C),
            read_u16(data, 0x0E),
        ],
        tera_type: data[0x10],
        index: data[0x11],
        stars: data[0x12],
        rand_rate: data[0x13],
        stages: std::array::from_fn(|stage| read_stage(data, stage)),
        nature: data[0x34],
        ivs: IvSet {
            values: ivs,
            kind: iv_kind,
        },
        scale_type,
        scale: data[0x3D],
        identifier: read_u32(data, 0x3E),
        fixed_reward_hash: read_u64(data, 0x42),
        lottery_reward_hash: read_u64(data, 0x4A),
        item: read_u32(data, 0x52) as i32,
    })
}
