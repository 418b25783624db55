//! Sealed registry of status condition definitions.
//!
//! Definitions live in an arena with a kind-to-index map, built and validated
//! once. Lookups of a kind that was never registered are configuration errors.

use crate::battle::rng::BattleRng;
use crate::errors::{ConfigError, ConfigResult};
use schema::StatusKind;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// At most one per combatant.
    Primary,
    /// Independent per kind, coexisting with a primary status.
    Volatile,
}

/// What a status does to its holder during the end-of-turn residual phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResidualRule {
    /// Nothing happens at end of turn beyond the duration tick.
    Inert,
    /// `per_turn_fraction` of max HP as damage every turn.
    Fixed,
    /// Damage grows by one `per_turn_fraction` step for every turn the status
    /// has been active: 1/16, 2/16, 3/16...
    Escalating,
    /// Damage to the holder, healed to the opposing active combatant.
    DrainToOpponent,
    /// Damage only while the holder is asleep; removed once it wakes.
    OnlyWhileAsleep,
    /// Heals the holder by `per_turn_fraction` of max HP.
    HealHolder,
    /// Lowers Defense and Special Defense by one stage each turn.
    LowerDefenses,
}

/// What happens when the duration runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryRule {
    Remove,
    /// The holder faints (perish count).
    Faint,
    /// The pending effect stored on the instance resolves (drowsiness, wish).
    Onset,
}

/// Immutable description of one status kind.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEffectDefinition {
    pub kind: StatusKind,
    pub class: StatusClass,
    /// Fraction of max HP used by the residual rule. `None` means no residual.
    pub per_turn_fraction: Option<f64>,
    /// Inclusive duration range in turns. `None` is indefinite, cleared only by a cure.
    pub duration: Option<(u8, u8)>,
    pub prevents_action: bool,
    /// Probability that the holder still acts. Ignored unless `prevents_action`.
    pub action_chance: f64,
    pub curable: bool,
    /// Cap for stackable kinds. `None` means the kind does not stack.
    pub max_stacks: Option<u8>,
    /// Fraction of max HP dealt to the holder when it fails to act.
    pub self_harm: Option<f64>,
    /// Per-turn chance to end early, rolled before the action gate.
    pub early_end_chance: Option<f64>,
    pub residual: ResidualRule,
    pub expiry: ExpiryRule,
}

impl StatusEffectDefinition {
    fn new(kind: StatusKind, class: StatusClass) -> Self {
        Self {
            kind,
            class,
            per_turn_fraction: None,
            duration: None,
            prevents_action: false,
            action_chance: 1.0,
            curable: true,
            max_stacks: None,
            self_harm: None,
            early_end_chance: None,
            residual: ResidualRule::Inert,
            expiry: ExpiryRule::Remove,
        }
    }

    fn primary(kind: StatusKind) -> Self {
        Self::new(kind, StatusClass::Primary)
    }

    fn volatile(kind: StatusKind) -> Self {
        Self::new(kind, StatusClass::Volatile)
    }

    fn lasting(mut self, min: u8, max: u8) -> Self {
        self.duration = Some((min, max));
        self
    }

    fn residual(mut self, rule: ResidualRule, fraction: f64) -> Self {
        self.residual = rule;
        self.per_turn_fraction = Some(fraction);
        self
    }

    fn preventing(mut self, action_chance: f64) -> Self {
        self.prevents_action = true;
        self.action_chance = action_chance;
        self
    }

    fn incurable(mut self) -> Self {
        self.curable = false;
        self
    }

    fn on_expiry(mut self, rule: ExpiryRule) -> Self {
        self.expiry = rule;
        self
    }

    pub fn is_primary(&self) -> bool {
        self.class == StatusClass::Primary
    }

    /// The chance to act used by the action gate; 1.0 for statuses that never prevent.
    pub fn effective_action_chance(&self) -> f64 {
        if self.prevents_action {
            self.action_chance
        } else {
            1.0
        }
    }

    /// Roll a fresh duration. Fixed ranges never consume a draw.
    pub fn sample_duration(&self, rng: &mut dyn BattleRng) -> Option<u8> {
        self.duration
            .map(|(min, max)| rng.range_inclusive(min, max, self.kind.display_name()))
    }

    fn validate(&self) -> ConfigResult<()> {
        if let Some((min, max)) = self.duration {
            if min == 0 || min > max {
                return Err(ConfigError::InvalidDuration {
                    kind: self.kind.to_string(),
                    min,
                    max,
                });
            }
        }
        let probabilities = [
            ("action_chance", Some(self.action_chance)),
            ("per_turn_fraction", self.per_turn_fraction),
            ("self_harm", self.self_harm),
            ("early_end_chance", self.early_end_chance),
        ];
        for (field, value) in probabilities {
            if let Some(value) = value {
                if !(0.0..=1.0).contains(&value) {
                    return Err(ConfigError::InvalidProbability {
                        field: format!("{}.{}", self.kind, field),
                        value,
                    });
                }
            }
        }
        if self.max_stacks == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.max_stacks", self.kind),
                reason: "a stackable status needs a cap of at least 1".to_string(),
            });
        }
        if self.max_stacks.is_some() && self.is_primary() {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.max_stacks", self.kind),
                reason: "primary statuses cannot stack".to_string(),
            });
        }
        if self.residual != ResidualRule::Inert
            && self.residual != ResidualRule::LowerDefenses
            && self.per_turn_fraction.is_none()
        {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.per_turn_fraction", self.kind),
                reason: "residual rule needs a fraction".to_string(),
            });
        }
        Ok(())
    }
}

static STANDARD: LazyLock<ConfigResult<StatusRegistry>> =
    LazyLock::new(|| StatusRegistry::new(standard_definitions()));

/// Arena of status definitions with a kind-to-index lookup.
#[derive(Debug, Clone)]
pub struct StatusRegistry {
    definitions: Vec<StatusEffectDefinition>,
    index: HashMap<StatusKind, usize>,
}

impl StatusRegistry {
    /// Build and validate a registry. Duplicate kinds are rejected.
    pub fn new(definitions: Vec<StatusEffectDefinition>) -> ConfigResult<Self> {
        let mut index = HashMap::with_capacity(definitions.len());
        for (position, definition) in definitions.iter().enumerate() {
            definition.validate()?;
            if index.insert(definition.kind, position).is_some() {
                return Err(ConfigError::DuplicateEntry(definition.kind.to_string()));
            }
        }
        Ok(Self { definitions, index })
    }

    /// The built-in registry, shared by every battle.
    pub fn standard() -> ConfigResult<&'static StatusRegistry> {
        STANDARD.as_ref().map_err(Clone::clone)
    }

    pub fn get(&self, kind: StatusKind) -> ConfigResult<&StatusEffectDefinition> {
        self.index
            .get(&kind)
            .and_then(|&position| self.definitions.get(position))
            .ok_or(ConfigError::UnregisteredStatus(kind))
    }

    /// Resolve a content-supplied status name such as `"leech_seed"`.
    pub fn lookup_name(&self, name: &str) -> ConfigResult<&StatusEffectDefinition> {
        let kind = StatusKind::from_str(name.trim())
            .map_err(|_| ConfigError::UnknownStatus(name.to_string()))?;
        self.get(kind)
    }

    pub fn contains(&self, kind: StatusKind) -> bool {
        self.index.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusEffectDefinition> {
        self.definitions.iter()
    }
}

fn standard_definitions() -> Vec<StatusEffectDefinition> {
    use ResidualRule::*;
    use StatusEffectDefinition as Def;
    use StatusKind as K;

    let freeze = Def {
        early_end_chance: Some(0.2),
        ..Def::primary(K::Freeze).lasting(5, 5).preventing(0.0)
    };
    let confusion = Def {
        self_harm: Some(1.0 / 16.0),
        ..Def::volatile(K::Confusion).lasting(1, 4).preventing(0.67)
    };
    let stockpile = Def {
        max_stacks: Some(3),
        ..Def::volatile(K::Stockpile).incurable()
    };
    let drowsy = Def::volatile(K::Drowsy)
        .lasting(1, 1)
        .on_expiry(ExpiryRule::Onset);

    vec![
        // Primary
        Def::primary(K::Poison).residual(Fixed, 1.0 / 8.0),
        Def::primary(K::Toxic).residual(Escalating, 1.0 / 16.0),
        Def::primary(K::Burn).residual(Fixed, 1.0 / 16.0),
        freeze,
        Def::primary(K::Paralysis).preventing(0.75),
        Def::primary(K::Sleep).lasting(1, 3).preventing(0.0),
        // Volatile
        confusion,
        Def::volatile(K::Flinch).lasting(1, 1).preventing(0.0).incurable(),
        Def::volatile(K::LeechSeed)
            .lasting(5, 5)
            .residual(DrainToOpponent, 1.0 / 8.0),
        Def::volatile(K::Taunt).lasting(3, 3),
        Def::volatile(K::Embargo).lasting(5, 5),
        Def::volatile(K::Torment).lasting(5, 5).incurable(),
        Def::volatile(K::Trapped).lasting(4, 5),
        Def::volatile(K::Infatuation).preventing(0.5),
        Def::volatile(K::Encore).lasting(3, 3),
        Def::volatile(K::Disable).lasting(4, 4),
        Def::volatile(K::Curse).residual(Fixed, 1.0 / 4.0),
        Def::volatile(K::Nightmare).residual(OnlyWhileAsleep, 1.0 / 4.0),
        Def::volatile(K::PerishSong)
            .lasting(3, 3)
            .incurable()
            .on_expiry(ExpiryRule::Faint),
        drowsy,
        Def::volatile(K::Protected).lasting(1, 1).incurable(),
        Def::volatile(K::Enduring).lasting(1, 1).incurable(),
        Def::volatile(K::Substitute).incurable(),
        Def::volatile(K::FocusEnergy).lasting(5, 5),
        Def::volatile(K::LaserFocus).lasting(2, 2).incurable(),
        Def::volatile(K::Charged).lasting(2, 2).incurable(),
        Def::volatile(K::MagnetRise).lasting(5, 5),
        stockpile,
        Def::volatile(K::HealBlock).lasting(5, 5),
        Def::volatile(K::Roosted).lasting(1, 1).incurable(),
        Def::volatile(K::Wish)
            .lasting(2, 2)
            .incurable()
            .on_expiry(ExpiryRule::Onset),
        Def::volatile(K::Octolock).lasting(5, 5).residual(LowerDefenses, 0.0),
        Def::volatile(K::Ingrain).residual(HealHolder, 1.0 / 16.0),
        Def::volatile(K::Powder).lasting(1, 1).incurable(),
        Def::volatile(K::RagePowder).lasting(1, 1).incurable(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::rng::ScriptedRng;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    fn registry() -> &'static StatusRegistry {
        StatusRegistry::standard().expect("standard registry should validate")
    }

    #[test]
    fn test_every_kind_is_registered() {
        for kind in StatusKind::iter() {
            assert!(registry().contains(kind), "{:?} missing from registry", kind);
        }
        assert_eq!(registry().len(), StatusKind::iter().count());
    }

    #[rstest]
    #[case(StatusKind::Poison, true)]
    #[case(StatusKind::Toxic, true)]
    #[case(StatusKind::Sleep, true)]
    #[case(StatusKind::Confusion, false)]
    #[case(StatusKind::LeechSeed, false)]
    fn test_status_class(#[case] kind: StatusKind, #[case] primary: bool) {
        assert_eq!(registry().get(kind).unwrap().is_primary(), primary);
    }

    #[test]
    fn test_fixed_duration_is_exact_and_free() {
        let flinch = registry().get(StatusKind::Flinch).unwrap();
        let mut rng = ScriptedRng::new(vec![]);
        for _ in 0..10 {
            assert_eq!(flinch.sample_duration(&mut rng), Some(1));
        }
        assert_eq!(rng.consumed(), 0);
    }

    #[test]
    fn test_indefinite_duration() {
        let poison = registry().get(StatusKind::Poison).unwrap();
        let mut rng = ScriptedRng::new(vec![0.3]);
        assert_eq!(poison.sample_duration(&mut rng), None);
    }

    #[test]
    fn test_sampled_duration_stays_in_range() {
        let sleep = registry().get(StatusKind::Sleep).unwrap();
        let mut rng = ScriptedRng::new(vec![0.0, 0.5, 0.99]);
        assert_eq!(sleep.sample_duration(&mut rng), Some(1));
        assert_eq!(sleep.sample_duration(&mut rng), Some(2));
        assert_eq!(sleep.sample_duration(&mut rng), Some(3));
    }

    #[test]
    fn test_non_preventing_status_always_acts() {
        let burn = registry().get(StatusKind::Burn).unwrap();
        assert!(!burn.prevents_action);
        assert_eq!(burn.effective_action_chance(), 1.0);
        let paralysis = registry().get(StatusKind::Paralysis).unwrap();
        assert_eq!(paralysis.effective_action_chance(), 0.75);
    }

    #[test]
    fn test_flinch_and_torment_are_not_curable() {
        assert!(!registry().get(StatusKind::Flinch).unwrap().curable);
        assert!(!registry().get(StatusKind::Torment).unwrap().curable);
        assert!(registry().get(StatusKind::Confusion).unwrap().curable);
    }

    #[test]
    fn test_lookup_by_content_name() {
        assert_eq!(
            registry().lookup_name("leech_seed").unwrap().kind,
            StatusKind::LeechSeed
        );
        assert_eq!(
            registry().lookup_name("petrify").unwrap_err(),
            ConfigError::UnknownStatus("petrify".to_string())
        );
    }

    #[test]
    fn test_duplicate_and_invalid_definitions_rejected() {
        let duplicate = StatusRegistry::new(vec![
            StatusEffectDefinition::primary(StatusKind::Burn),
            StatusEffectDefinition::primary(StatusKind::Burn),
        ]);
        assert_eq!(
            duplicate.unwrap_err(),
            ConfigError::DuplicateEntry("Burn".to_string())
        );

        let inverted = StatusRegistry::new(vec![
            StatusEffectDefinition::primary(StatusKind::Sleep).lasting(4, 2)
        ]);
        assert!(matches!(
            inverted,
            Err(ConfigError::InvalidDuration { min: 4, max: 2, .. })
        ));

        let partial = StatusRegistry::new(vec![StatusEffectDefinition::primary(StatusKind::Burn)])
            .unwrap();
        assert_eq!(
            partial.get(StatusKind::Sleep).unwrap_err(),
            ConfigError::UnregisteredStatus(StatusKind::Sleep)
        );
    }
}
