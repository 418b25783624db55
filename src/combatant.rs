use crate::errors::{EngineError, EngineResult};
use crate::move_catalog::ContactEffect;
use crate::move_data::MoveData;
use schema::{Gender, MonsterType, StatKind, StatusKind};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const MIN_STAGE: i8 = -6;
pub const MAX_STAGE: i8 = 6;
pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 100;

/// Raw stat values before any stage multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatBlock {
    pub hp: u16,
    pub attack: u16,
    pub defense: u16,
    pub special_attack: u16,
    pub special_defense: u16,
    pub speed: u16,
}

impl StatBlock {
    pub fn new(
        hp: u16,
        attack: u16,
        defense: u16,
        special_attack: u16,
        special_defense: u16,
        speed: u16,
    ) -> Self {
        Self {
            hp,
            attack,
            defense,
            special_attack,
            special_defense,
            speed,
        }
    }

    /// Raw value of a combat stat. Accuracy and evasion have no raw value.
    pub fn get(&self, stat: StatKind) -> Option<u16> {
        match stat {
            StatKind::Attack => Some(self.attack),
            StatKind::Defense => Some(self.defense),
            StatKind::SpecialAttack => Some(self.special_attack),
            StatKind::SpecialDefense => Some(self.special_defense),
            StatKind::Speed => Some(self.speed),
            StatKind::Accuracy | StatKind::Evasion => None,
        }
    }

    /// Overwrite a combat stat. Returns false for accuracy and evasion.
    pub fn set(&mut self, stat: StatKind, value: u16) -> bool {
        let slot = match stat {
            StatKind::Attack => &mut self.attack,
            StatKind::Defense => &mut self.defense,
            StatKind::SpecialAttack => &mut self.special_attack,
            StatKind::SpecialDefense => &mut self.special_defense,
            StatKind::Speed => &mut self.speed,
            StatKind::Accuracy | StatKind::Evasion => return false,
        };
        *slot = value;
        true
    }
}

/// Stage per stat, always within `MIN_STAGE..=MAX_STAGE`. Deserialized
/// stages are clamped on the way in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i8; 7]", into = "[i8; 7]")]
pub struct StatStages([i8; 7]);

impl From<[i8; 7]> for StatStages {
    fn from(raw: [i8; 7]) -> Self {
        let mut stages = StatStages::default();
        for (stat, stage) in StatKind::ALL.iter().zip(raw) {
            stages.set(*stat, stage);
        }
        stages
    }
}

impl From<StatStages> for [i8; 7] {
    fn from(stages: StatStages) -> Self {
        stages.0
    }
}

impl StatStages {
    fn slot(stat: StatKind) -> usize {
        match stat {
            StatKind::Attack => 0,
            StatKind::Defense => 1,
            StatKind::SpecialAttack => 2,
            StatKind::SpecialDefense => 3,
            StatKind::Speed => 4,
            StatKind::Accuracy => 5,
            StatKind::Evasion => 6,
        }
    }

    pub fn get(&self, stat: StatKind) -> i8 {
        self.0[Self::slot(stat)]
    }

    /// Set a stage, clamping out-of-range input. Returns the stored stage.
    pub fn set(&mut self, stat: StatKind, stage: i8) -> i8 {
        if !(MIN_STAGE..=MAX_STAGE).contains(&stage) {
            warn!(%stat, stage, "stat stage out of range, clamping");
        }
        let clamped = stage.clamp(MIN_STAGE, MAX_STAGE);
        self.0[Self::slot(stat)] = clamped;
        clamped
    }

    /// Add `delta` to a stage, saturating at the bounds. Returns the change
    /// actually applied, which is 0 when the stage was already capped.
    pub fn apply_delta(&mut self, stat: StatKind, delta: i8) -> i8 {
        let old = self.get(stat);
        let new = old.saturating_add(delta).clamp(MIN_STAGE, MAX_STAGE);
        self.0[Self::slot(stat)] = new;
        new - old
    }

    pub fn reset(&mut self) {
        self.0 = [0; 7];
    }

    pub fn clear_negative(&mut self) {
        for stage in self.0.iter_mut() {
            if *stage < 0 {
                *stage = 0;
            }
        }
    }

    pub fn invert(&mut self) {
        for stage in self.0.iter_mut() {
            *stage = -*stage;
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.0.iter().all(|stage| *stage == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StatKind, i8)> + '_ {
        StatKind::ALL.iter().map(move |stat| (*stat, self.get(*stat)))
    }
}

/// Effect carried by a status instance and resolved when its duration runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingEffect {
    Inflict {
        status: StatusKind,
        duration: Option<u8>,
    },
    Heal {
        amount: u16,
    },
}

/// One status currently held by a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveStatus {
    pub kind: StatusKind,
    /// Turns left; `None` is indefinite.
    pub remaining: Option<u8>,
    pub stacks: u8,
    /// End-of-turn ticks survived so far. Drives escalating damage.
    pub turns_active: u8,
    pub pending: Option<PendingEffect>,
}

impl ActiveStatus {
    pub fn new(kind: StatusKind, remaining: Option<u8>) -> Self {
        Self {
            kind,
            remaining,
            stacks: 1,
            turns_active: 0,
            pending: None,
        }
    }

    pub fn with_pending(mut self, pending: PendingEffect) -> Self {
        self.pending = Some(pending);
        self
    }
}

/// A battle participant: raw stats, current HP and everything that is
/// temporary to this battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub name: String,
    pub types: Vec<MonsterType>,
    pub level: u8,
    #[serde(default)]
    pub gender: Option<Gender>,
    pub stats: StatBlock,
    pub current_hp: u16,
    #[serde(default)]
    pub primary: Option<ActiveStatus>,
    #[serde(default)]
    pub volatiles: Vec<ActiveStatus>,
    #[serde(default)]
    pub stages: StatStages,
    #[serde(default)]
    pub substitute_hp: u16,
    /// Contact effect of the protection raised this turn, if any.
    #[serde(default)]
    pub guard: Option<ContactEffect>,
    #[serde(default)]
    pub last_move: Option<String>,
    #[serde(default)]
    pub moves: Vec<MoveData>,
}

impl Combatant {
    pub fn new(name: impl Into<String>, types: Vec<MonsterType>, level: u8, stats: StatBlock) -> Self {
        Self {
            name: name.into(),
            types,
            level,
            gender: None,
            current_hp: stats.hp,
            stats,
            primary: None,
            volatiles: Vec::new(),
            stages: StatStages::default(),
            substitute_hp: 0,
            guard: None,
            last_move: None,
            moves: Vec::new(),
        }
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn with_moves(mut self, moves: Vec<MoveData>) -> Self {
        self.moves = moves;
        self
    }

    pub fn max_hp(&self) -> u16 {
        self.stats.hp
    }

    pub fn is_fainted(&self) -> bool {
        self.current_hp == 0
    }

    /// `floor(fraction × max_hp)`.
    pub fn hp_fraction(&self, fraction: f64) -> u16 {
        (self.max_hp() as f64 * fraction).floor() as u16
    }

    /// Lose up to `amount` HP. Returns the HP actually lost.
    pub fn take_damage(&mut self, amount: u16) -> u16 {
        let dealt = amount.min(self.current_hp);
        self.current_hp -= dealt;
        dealt
    }

    /// Restore up to `amount` HP. Fainted combatants cannot be healed.
    /// Returns the HP actually restored.
    pub fn heal(&mut self, amount: u16) -> u16 {
        if self.is_fainted() {
            return 0;
        }
        let healed = amount.min(self.max_hp().saturating_sub(self.current_hp));
        self.current_hp += healed;
        healed
    }

    /// Check what a caller-built combatant must satisfy before it can battle:
    /// one or two distinct types, a level in `1..=100` and HP within its maximum.
    pub fn validate(&self) -> EngineResult<()> {
        let malformed = |reason: String| EngineError::MalformedCombatant {
            name: self.name.clone(),
            reason,
        };
        match self.types.as_slice() {
            [_] => {}
            [first, second] if first != second => {}
            [first, second] => {
                return Err(malformed(format!("duplicate type {first}/{second}")));
            }
            types => return Err(malformed(format!("{} types, expected 1 or 2", types.len()))),
        }
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&self.level) {
            return Err(malformed(format!("level {} outside 1..=100", self.level)));
        }
        if self.max_hp() == 0 {
            return Err(malformed("max HP is 0".to_string()));
        }
        if self.current_hp > self.max_hp() {
            return Err(malformed(format!(
                "current HP {} exceeds max HP {}",
                self.current_hp,
                self.max_hp()
            )));
        }
        Ok(())
    }

    pub fn has_type(&self, monster_type: MonsterType) -> bool {
        self.types.contains(&monster_type)
    }

    /// Types used when this combatant is hit. Roosting drops Flying; a pure
    /// Flying type that roosts counts as Normal.
    pub fn defending_types(&self) -> Vec<MonsterType> {
        if !self.has_status(StatusKind::Roosted) {
            return self.types.clone();
        }
        let grounded: Vec<MonsterType> = self
            .types
            .iter()
            .copied()
            .filter(|t| *t != MonsterType::Flying)
            .collect();
        if grounded.is_empty() {
            vec![MonsterType::Normal]
        } else {
            grounded
        }
    }

    pub fn primary_kind(&self) -> Option<StatusKind> {
        self.primary.map(|status| status.kind)
    }

    pub fn is_asleep(&self) -> bool {
        self.primary_kind() == Some(StatusKind::Sleep)
    }

    pub fn status(&self, kind: StatusKind) -> Option<&ActiveStatus> {
        self.primary
            .as_ref()
            .filter(|status| status.kind == kind)
            .or_else(|| self.volatiles.iter().find(|status| status.kind == kind))
    }

    pub fn status_mut(&mut self, kind: StatusKind) -> Option<&mut ActiveStatus> {
        if self.primary.map(|status| status.kind) == Some(kind) {
            return self.primary.as_mut();
        }
        self.volatiles.iter_mut().find(|status| status.kind == kind)
    }

    pub fn has_status(&self, kind: StatusKind) -> bool {
        self.status(kind).is_some()
    }

    pub fn stacks(&self, kind: StatusKind) -> u8 {
        self.status(kind).map_or(0, |status| status.stacks)
    }

    /// Every held status, primary first, in the order they were applied.
    pub fn statuses(&self) -> impl Iterator<Item = &ActiveStatus> {
        self.primary.iter().chain(self.volatiles.iter())
    }

    pub fn remove_status(&mut self, kind: StatusKind) -> Option<ActiveStatus> {
        if self.primary_kind() == Some(kind) {
            return self.primary.take();
        }
        let position = self.volatiles.iter().position(|status| status.kind == kind)?;
        let removed = self.volatiles.remove(position);
        if kind == StatusKind::Substitute {
            self.substitute_hp = 0;
        }
        if kind == StatusKind::Protected {
            self.guard = None;
        }
        Some(removed)
    }

    /// Drop everything that does not survive leaving the field.
    pub fn clear_volatiles(&mut self) {
        self.volatiles.clear();
        self.stages.reset();
        self.substitute_hp = 0;
        self.guard = None;
    }

    pub fn faint(&mut self) {
        self.current_hp = 0;
        self.primary = None;
        self.clear_volatiles();
    }

    pub fn find_move(&self, name: &str) -> Option<&MoveData> {
        self.moves
            .iter()
            .find(|data| data.name.eq_ignore_ascii_case(name.trim()))
    }
}
