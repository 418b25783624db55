//! The sealed catalog of non-damaging move effects.
//!
//! Every entry belongs to exactly one of four families. Each family is a variant
//! carrying only the parameters it needs, so the resolver matches exhaustively
//! instead of probing optional fields.

use crate::errors::{ConfigError, ConfigResult, LookupError};
use crate::status::StatusRegistry;
use schema::{Hazard, MonsterType, SideCondition, StatKind, StatusKind, Terrain, Weather};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;
use tracing::debug;

const STANDARD_CATALOG: &str = include_str!("../data/move_effects.ron");

/// Who an effect lands on, relative to the move's user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EffectTarget {
    #[default]
    User,
    Opponent,
    /// The user and the opposing active combatant.
    Both,
}

/// A status applied alongside a family's main effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRider {
    pub status: StatusKind,
    #[serde(default)]
    pub duration: Option<u8>,
    #[serde(default)]
    pub target: EffectTarget,
}

/// Gate checked before an effect resolves. A failed gate makes the move fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EffectCondition {
    TargetPoisoned,
    TargetAsleep,
    TargetHasStatus,
    UserHasStatus,
    OppositeGender,
    UserHasStockpile,
    WeatherIn(Vec<Weather>),
}

/// Stat-stage manipulations that are not plain deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatSpecial {
    /// Every active combatant's stages return to 0.
    ResetAll,
    /// Exchange the listed stages between user and opponent.
    SwapStages(Vec<StatKind>),
    /// The user copies all of the opponent's stages.
    CopyStages,
    /// The opponent's stages flip sign.
    InvertStages,
    /// One random stat that is not yet maxed rises by `stages`.
    RandomBoost { stages: i8 },
    /// The user's negative stages return to 0.
    ClearNegative,
    /// The stat jumps straight to +6.
    Maximize(StatKind),
    /// User and opponent average their raw values of the listed stats.
    AverageRaw(Vec<StatKind>),
    /// The user exchanges two of its own raw stats.
    SwapRaw(StatKind, StatKind),
    /// The user heals by the opponent's effective attack.
    StrengthSap,
}

/// How much a healing move restores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HealAmount {
    Fraction(f64),
    Full,
    /// Weather-dependent fraction with a default for unlisted weather.
    ByWeather {
        default: f64,
        weather: BTreeMap<Weather, f64>,
    },
    ByTerrain {
        default: f64,
        terrain: BTreeMap<Terrain, f64>,
    },
    /// Indexed by stockpile count minus one; consumes the stockpile.
    ByStockpile(Vec<f64>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CureScope {
    User,
    Target,
    /// Every combatant on the user's side, active or benched.
    Team,
}

/// Applied to an attacker that runs into a protection effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContactEffect {
    LowerStat { stat: StatKind, stages: i8 },
    Inflict(StatusKind),
    Damage(f64),
}

/// Field, protection and one-off mechanics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldEffect {
    SetWeather {
        weather: Weather,
    },
    SetTerrain {
        terrain: Terrain,
    },
    /// Lays one layer on the opposing side.
    LayHazard {
        hazard: Hazard,
    },
    ClearHazards {
        #[serde(default)]
        both_sides: bool,
        #[serde(default)]
        user_stats: BTreeMap<StatKind, i8>,
        #[serde(default)]
        target_stats: BTreeMap<StatKind, i8>,
    },
    /// A timed condition on the user's side.
    SideCondition {
        condition: SideCondition,
        #[serde(default)]
        turns: Option<u8>,
        #[serde(default)]
        requires_weather: Vec<Weather>,
    },
    Protect {
        #[serde(default)]
        contact: Option<ContactEffect>,
    },
    Endure,
    /// Spends a quarter of max HP on a decoy that absorbs damage.
    Substitute,
    InflictVolatile {
        status: StatusKind,
        #[serde(default)]
        target: EffectTarget,
        #[serde(default)]
        duration: Option<u8>,
        #[serde(default)]
        hp_cost: Option<f64>,
    },
    /// Moves the user's primary status onto the opponent.
    TransferStatus,
    /// User and opponent share their combined HP evenly.
    PainSplit,
    /// The opponent is dragged out for a random healthy benched combatant.
    ForceSwitch,
    /// Branches on whether the user has `user_type`.
    TypeConditional {
        user_type: MonsterType,
        matching: Box<MoveEffectDescriptor>,
        otherwise: Box<MoveEffectDescriptor>,
    },
    Nothing,
}

/// Tagged descriptor for one move, one variant per effect family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MoveEffectDescriptor {
    StatModification {
        #[serde(default)]
        stats: BTreeMap<StatKind, i8>,
        #[serde(default)]
        target: EffectTarget,
        #[serde(default)]
        side_effect: Option<StatusRider>,
        #[serde(default)]
        switch_out: bool,
        #[serde(default)]
        hp_cost: Option<f64>,
        #[serde(default)]
        special: Option<StatSpecial>,
        #[serde(default)]
        condition: Option<EffectCondition>,
        #[serde(default)]
        user_faints: bool,
    },
    StatusAffliction {
        status: StatusKind,
        #[serde(default)]
        duration: Option<u8>,
        #[serde(default)]
        accuracy: Option<u8>,
        /// Turns before the status takes hold.
        #[serde(default)]
        delay: Option<u8>,
        #[serde(default)]
        condition: Option<EffectCondition>,
        #[serde(default)]
        includes_user: bool,
    },
    Healing {
        amount: HealAmount,
        #[serde(default)]
        recipient: EffectTarget,
        #[serde(default)]
        cure: Option<CureScope>,
        /// The user faints and its replacement is fully restored on entry.
        #[serde(default)]
        sacrifice: bool,
        /// Turns before the heal lands.
        #[serde(default)]
        delay: Option<u8>,
        #[serde(default)]
        user_status: Option<StatusRider>,
        #[serde(default)]
        condition: Option<EffectCondition>,
    },
    Field(FieldEffect),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectFamily {
    StatModification,
    StatusAffliction,
    Healing,
    Field,
}

impl MoveEffectDescriptor {
    pub fn family(&self) -> EffectFamily {
        match self {
            MoveEffectDescriptor::StatModification { .. } => EffectFamily::StatModification,
            MoveEffectDescriptor::StatusAffliction { .. } => EffectFamily::StatusAffliction,
            MoveEffectDescriptor::Healing { .. } => EffectFamily::Healing,
            MoveEffectDescriptor::Field(_) => EffectFamily::Field,
        }
    }

    /// Every status this descriptor can place, for load-time validation.
    fn referenced_statuses(&self) -> Vec<StatusKind> {
        match self {
            MoveEffectDescriptor::StatModification { side_effect, .. } => {
                side_effect.iter().map(|rider| rider.status).collect()
            }
            MoveEffectDescriptor::StatusAffliction { status, delay, .. } => {
                let mut statuses = vec![*status];
                if delay.is_some() {
                    statuses.push(StatusKind::Drowsy);
                }
                statuses
            }
            MoveEffectDescriptor::Healing {
                user_status, delay, ..
            } => {
                let mut statuses: Vec<StatusKind> =
                    user_status.iter().map(|rider| rider.status).collect();
                if delay.is_some() {
                    statuses.push(StatusKind::Wish);
                }
                statuses
            }
            MoveEffectDescriptor::Field(effect) => match effect {
                FieldEffect::InflictVolatile { status, .. } => vec![*status],
                FieldEffect::Protect { contact } => {
                    let mut statuses = vec![StatusKind::Protected];
                    if let Some(ContactEffect::Inflict(status)) = contact {
                        statuses.push(*status);
                    }
                    statuses
                }
                FieldEffect::Endure => vec![StatusKind::Enduring],
                FieldEffect::Substitute => vec![StatusKind::Substitute],
                FieldEffect::TypeConditional {
                    matching,
                    otherwise,
                    ..
                } => {
                    let mut statuses = matching.referenced_statuses();
                    statuses.extend(otherwise.referenced_statuses());
                    statuses
                }
                _ => Vec::new(),
            },
        }
    }

    fn validate(&self, name: &str) -> ConfigResult<()> {
        let invalid = |field: &str, reason: String| ConfigError::InvalidValue {
            field: format!("{}.{}", name, field),
            reason,
        };
        let fraction = |field: &str, value: f64| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::InvalidProbability {
                    field: format!("{}.{}", name, field),
                    value,
                })
            }
        };

        match self {
            MoveEffectDescriptor::StatModification {
                stats,
                hp_cost,
                special,
                ..
            } => {
                if stats.is_empty() && special.is_none() {
                    return Err(invalid("stats", "no stat change or special".to_string()));
                }
                if let Some((stat, delta)) = stats.iter().find(|(_, d)| d.abs() > 12) {
                    return Err(invalid("stats", format!("{} delta {} out of range", stat, delta)));
                }
                if let Some(cost) = hp_cost {
                    fraction("hp_cost", *cost)?;
                }
            }
            MoveEffectDescriptor::StatusAffliction { accuracy, .. } => {
                if let Some(accuracy) = accuracy {
                    if *accuracy > 100 {
                        return Err(invalid("accuracy", format!("{} is above 100", accuracy)));
                    }
                }
            }
            MoveEffectDescriptor::Healing { amount, .. } => match amount {
                HealAmount::Fraction(value) => fraction("amount", *value)?,
                HealAmount::Full => {}
                HealAmount::ByWeather { default, weather } => {
                    fraction("amount", *default)?;
                    for value in weather.values() {
                        fraction("amount", *value)?;
                    }
                }
                HealAmount::ByTerrain { default, terrain } => {
                    fraction("amount", *default)?;
                    for value in terrain.values() {
                        fraction("amount", *value)?;
                    }
                }
                HealAmount::ByStockpile(steps) => {
                    if steps.is_empty() {
                        return Err(invalid("amount", "stockpile table is empty".to_string()));
                    }
                    for value in steps {
                        fraction("amount", *value)?;
                    }
                }
            },
            MoveEffectDescriptor::Field(effect) => match effect {
                FieldEffect::Protect {
                    contact: Some(ContactEffect::Damage(value)),
                } => fraction("contact", *value)?,
                FieldEffect::InflictVolatile {
                    hp_cost: Some(cost),
                    ..
                } => fraction("hp_cost", *cost)?,
                FieldEffect::TypeConditional {
                    matching,
                    otherwise,
                    ..
                } => {
                    matching.validate(name)?;
                    otherwise.validate(name)?;
                }
                _ => {}
            },
        }
        Ok(())
    }
}

/// One catalog row: the move's name, its turn-order priority and its effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveEffectEntry {
    pub name: String,
    #[serde(default)]
    pub priority: i8,
    pub effect: MoveEffectDescriptor,
}

static STANDARD: LazyLock<ConfigResult<MoveEffectCatalog>> = LazyLock::new(|| {
    let registry = StatusRegistry::standard()?;
    MoveEffectCatalog::from_ron_str(STANDARD_CATALOG, registry)
});

/// Name-keyed registry of every non-damaging move effect.
#[derive(Debug, Clone)]
pub struct MoveEffectCatalog {
    entries: Vec<MoveEffectEntry>,
    index: HashMap<String, usize>,
}

impl MoveEffectCatalog {
    /// Build and validate a catalog. Every referenced status must be registered.
    pub fn new(entries: Vec<MoveEffectEntry>, registry: &StatusRegistry) -> ConfigResult<Self> {
        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            if !(-7..=7).contains(&entry.priority) {
                return Err(ConfigError::InvalidValue {
                    field: format!("{}.priority", entry.name),
                    reason: format!("{} is outside -7..=7", entry.priority),
                });
            }
            entry.effect.validate(&entry.name)?;
            for status in entry.effect.referenced_statuses() {
                registry.get(status)?;
            }
            if index.insert(normalize(&entry.name), position).is_some() {
                return Err(ConfigError::DuplicateEntry(entry.name.clone()));
            }
        }
        debug!(moves = entries.len(), "move effect catalog loaded");
        Ok(Self { entries, index })
    }

    /// Parse a RON list of entries.
    pub fn from_ron_str(source: &str, registry: &StatusRegistry) -> ConfigResult<Self> {
        let entries: Vec<MoveEffectEntry> = ron::from_str(source)?;
        Self::new(entries, registry)
    }

    /// The catalog shipped in `data/move_effects.ron`, shared by every battle.
    pub fn standard() -> ConfigResult<&'static MoveEffectCatalog> {
        STANDARD.as_ref().map_err(Clone::clone)
    }

    /// Look up a move by name, ignoring case, spaces and hyphens.
    pub fn get(&self, name: &str) -> Option<&MoveEffectEntry> {
        self.index
            .get(&normalize(name))
            .and_then(|&position| self.entries.get(position))
    }

    /// Like [`get`](Self::get), but with an explicit not-found error.
    pub fn lookup(&self, name: &str) -> Result<&MoveEffectEntry, LookupError> {
        self.get(name)
            .ok_or_else(|| LookupError::MoveNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&normalize(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MoveEffectEntry> {
        self.entries.iter()
    }

    pub fn by_family(&self, family: EffectFamily) -> impl Iterator<Item = &MoveEffectEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.effect.family() == family)
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '\'')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn catalog() -> &'static MoveEffectCatalog {
        MoveEffectCatalog::standard().expect("standard catalog should load")
    }

    fn registry() -> &'static StatusRegistry {
        StatusRegistry::standard().expect("standard registry should load")
    }

    #[test]
    fn test_standard_catalog_loads_every_family() {
        assert!(catalog().len() > 100);
        for family in [
            EffectFamily::StatModification,
            EffectFamily::StatusAffliction,
            EffectFamily::Healing,
            EffectFamily::Field,
        ] {
            assert!(catalog().by_family(family).count() > 5, "{:?} is thin", family);
        }
    }

    #[test]
    fn test_swords_dance_descriptor() {
        let entry = catalog().get("Swords Dance").unwrap();
        match &entry.effect {
            MoveEffectDescriptor::StatModification { stats, target, .. } => {
                assert_eq!(stats.get(&StatKind::Attack), Some(&2));
                assert_eq!(*target, EffectTarget::User);
            }
            other => panic!("unexpected descriptor {:?}", other),
        }
    }

    #[rstest]
    #[case("swords dance")]
    #[case("SWORDS-DANCE")]
    #[case("SwordsDance")]
    fn test_lookup_normalizes_names(#[case] name: &str) {
        assert_eq!(catalog().get(name).unwrap().name, "Swords Dance");
    }

    #[test]
    fn test_missing_move_is_explicit() {
        assert_eq!(catalog().get("Hyper Splash"), None);
        assert_eq!(
            catalog().lookup("Hyper Splash").unwrap_err(),
            LookupError::MoveNotFound("Hyper Splash".to_string())
        );
    }

    #[rstest]
    #[case("Protect", 4)]
    #[case("Baby-Doll Eyes", 1)]
    #[case("Roar", -6)]
    #[case("Growl", 0)]
    fn test_priorities(#[case] name: &str, #[case] priority: i8) {
        assert_eq!(catalog().get(name).unwrap().priority, priority);
    }

    #[test]
    fn test_curse_branches_on_ghost_type() {
        let entry = catalog().get("Curse").unwrap();
        assert!(matches!(
            &entry.effect,
            MoveEffectDescriptor::Field(FieldEffect::TypeConditional {
                user_type: MonsterType::Ghost,
                ..
            })
        ));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let source = r#"[
            (name: "Growl", effect: StatModification(stats: {Attack: -1}, target: Opponent)),
            (name: "growl", effect: StatModification(stats: {Attack: -1}, target: Opponent)),
        ]"#;
        assert_eq!(
            MoveEffectCatalog::from_ron_str(source, registry()).unwrap_err(),
            ConfigError::DuplicateEntry("growl".to_string())
        );
    }

    #[test]
    fn test_invalid_entries_rejected() {
        let bad_fraction = r#"[
            (name: "Overheal", effect: Healing(amount: Fraction(1.5))),
        ]"#;
        assert!(matches!(
            MoveEffectCatalog::from_ron_str(bad_fraction, registry()),
            Err(ConfigError::InvalidProbability { .. })
        ));

        let bad_priority = r#"[
            (name: "Rush", priority: 9, effect: Field(Nothing)),
        ]"#;
        assert!(matches!(
            MoveEffectCatalog::from_ron_str(bad_priority, registry()),
            Err(ConfigError::InvalidValue { .. })
        ));

        let unknown_family = r#"[
            (name: "Odd", effect: Teleportation(range: 3)),
        ]"#;
        assert!(matches!(
            MoveEffectCatalog::from_ron_str(unknown_family, registry()),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn test_unregistered_status_reference_rejected() {
        let partial = StatusRegistry::new(Vec::new()).unwrap();
        let source = r#"[
            (name: "Toxic", effect: StatusAffliction(status: Toxic)),
        ]"#;
        assert_eq!(
            MoveEffectCatalog::from_ron_str(source, &partial).unwrap_err(),
            ConfigError::UnregisteredStatus(StatusKind::Toxic)
        );
    }
}
