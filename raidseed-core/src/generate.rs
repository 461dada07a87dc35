//! Hand-off from a decoded encounter to whatever builds the actual entity.
//!
//! Stat rolls, nicknames and move assignment live behind [`EntityFactory`];
//! this module only assembles the request and applies the retry rule.

use rand::Rng;

use crate::encounter::{AbilityPermission, EncounterRecord, IvSet, ShinyPolicy, SizeType};

/// Point lookups into the species metadata table.
pub trait PersonalTable {
    fn gender_ratio(&self, species: u16, form: u8) -> u8;
    fn base_friendship(&self, species: u16, form: u8) -> u8;
}

/// Builds a playable entity from an [`EntityRequest`].
pub trait EntityFactory {
    type Trainer;
    type Criteria;
    type Entity;

    /// Criteria that every request can satisfy.
    fn unrestricted(&self) -> Self::Criteria;

    /// `None` when `criteria` cannot be met for this request and `init` seed.
    fn try_generate(
        &self,
        trainer: &Self::Trainer,
        request: &EntityRequest,
        init: u64,
        criteria: &Self::Criteria,
    ) -> Option<Self::Entity>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityRequest {
    pub species: u16,
    pub form: u8,
    pub level: u8,
    pub gender_ratio: u8,
    pub flawless_iv_count: u8,
    pub roll_count: u8,
    /// Zero leaves the scalar to the roll.
    pub height: u8,
    pub weight: u8,
    pub scale_type: SizeType,
    pub scale: u8,
    pub ability: AbilityPermission,
    pub shiny: ShinyPolicy,
    pub nature: u8,
    pub ivs: IvSet,
    pub moves: [u16; 4],
    pub tera_type: u8,
    pub base_friendship: u8,
}

const ROLL_COUNT: u8 = 1;
const UNDEFINED_SIZE: u8 = 0;

impl EntityRequest {
    pub fn from_record(record: &EncounterRecord, personal: &impl PersonalTable) -> Self {
        let gender_ratio = record
            .fixed_gender_ratio()
            .unwrap_or_else(|| personal.gender_ratio(record.species, record.form));

        Self {
            species: record.species,
            form: record.form,
            level: record.level,
            gender_ratio,
            flawless_iv_count: record.flawless_iv_count,
            roll_count: ROLL_COUNT,
            height: UNDEFINED_SIZE,
            weight: UNDEFINED_SIZE,
            scale_type: record.scale_type,
            scale: record.scale,
            ability: record.ability,
            shiny: record.shiny,
            nature: record.nature,
            ivs: record.ivs,
            moves: record.moves,
            tera_type: record.tera_type,
            base_friendship: personal.base_friendship(record.species, record.form),
        }
    }
}

/// Build an entity for `record`, falling back to unrestricted criteria with
/// the same `init` when the caller's criteria are rejected.
pub fn convert<F, P>(
    record: &EncounterRecord,
    personal: &P,
    factory: &F,
    trainer: &F::Trainer,
    criteria: &F::Criteria,
    init: u64,
) -> Option<F::Entity>
where
    F: EntityFactory,
    P: PersonalTable,
{
    let request = EntityRequest::from_record(record, personal);

    if let Some(entity) = factory.try_generate(trainer, &request, init, criteria) {
        return Some(entity);
    }

    tracing::debug!(
        species = record.species,
        "criteria rejected, retrying unrestricted"
    );
    factory.try_generate(trainer, &request, init, &factory.unrestricted())
}

pub fn convert_with_rng<F, P, R>(
    record: &EncounterRecord,
    personal: &P,
    factory: &F,
    trainer: &F::Trainer,
    criteria: &F::Criteria,
    rng: &mut R,
) -> Option<F::Entity>
where
    F: EntityFactory,
    P: PersonalTable,
    R: Rng + ?Sized,
{
    let init: u64 = rng.gen();
    convert(record, personal, factory, trainer, criteria, init)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::encounter::fixture::{blank_record, record_with};
    use crate::encounter::{decode_all, GameVersion, RATIO_MAGIC_FEMALE};
    use crate::xoroshiro::Xoroshiro128Plus;

    struct FlatTable;

    impl PersonalTable for FlatTable {
        fn gender_ratio(&self, _species: u16, _form: u8) -> u8 {
            127
        }

        fn base_friendship(&self, _species: u16, form: u8) -> u8 {
            50 + form
        }
    }

    /// Accepts only requests whose init seed is even, unless unrestricted.
    struct EvenInitFactory {
        calls: RefCell<Vec<(u64, bool)>>,
    }

    impl EvenInitFactory {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl EntityFactory for EvenInitFactory {
        type Trainer = &'static str;
        type Criteria = bool;
        type Entity = (String, u16, u64);

        fn unrestricted(&self) -> bool {
            false
        }

        fn try_generate(
            &self,
            trainer: &&'static str,
            request: &EntityRequest,
            init: u64,
            require_even: &bool,
        ) -> Option<Self::Entity> {
            self.calls.borrow_mut().push((init, *require_even));
            if *require_even && init % 2 != 0 {
                return None;
            }
            Some((trainer.to_string(), request.species, init))
        }
    }

    #[test]
    fn request_defers_gender_to_species_table() {
        let rec = record_with(10, &[(0, GameVersion::Scarlet, 0, 10)]);
        let request = EntityRequest::from_record(&rec, &FlatTable);
        assert_eq!(rec.gender, -1);
        assert_eq!(request.gender_ratio, 127);
        assert_eq!(request.roll_count, 1);
        assert_eq!(request.height, 0);
        assert_eq!(request.weight, 0);
        assert_eq!(request.base_friendship, 50);
        assert_eq!(request.level, 100);
    }

    #[test]
    fn request_uses_fixed_gender() {
        let mut raw = blank_record();
        raw[0x03] = 2;
        raw[0x02] = 3;
        let rec = decode_all(&raw).unwrap().remove(0);
        let request = EntityRequest::from_record(&rec, &FlatTable);
        assert_eq!(request.gender_ratio, RATIO_MAGIC_FEMALE);
        assert_eq!(request.base_friendship, 53);
    }

    #[test]
    fn accepted_criteria_skip_the_retry() {
        let rec = record_with(10, &[]);
        let factory = EvenInitFactory::new();
        let entity = convert(&rec, &FlatTable, &factory, &"ash", &true, 42);
        assert_eq!(entity, Some(("ash".to_string(), 1000, 42)));
        assert_eq!(*factory.calls.borrow(), vec![(42, true)]);
    }

    #[test]
    fn rejected_criteria_retry_unrestricted_with_same_init() {
        let rec = record_with(10, &[]);
        let factory = EvenInitFactory::new();
        let entity = convert(&rec, &FlatTable, &factory, &"ash", &true, 41);
        assert_eq!(entity, Some(("ash".to_string(), 1000, 41)));
        assert_eq!(*factory.calls.borrow(), vec![(41, true), (41, false)]);
    }

    #[test]
    fn rng_supplies_the_init_seed() {
        let rec = record_with(10, &[]);
        let factory = EvenInitFactory::new();
        let mut rng = Xoroshiro128Plus::new(0);
        let entity = convert_with_rng(&rec, &FlatTable, &factory, &"ash", &false, &mut rng);
        assert_eq!(entity.map(|(_, _, init)| init), Some(0x82A2_B175_229D_6A5B));
    }
}
