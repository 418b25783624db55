use crate::battle::action_stack::ItemKind;
use crate::combatant::Combatant;
use crate::errors::{EngineError, EngineResult};
use crate::field::{FieldKind, FieldState};
use crate::type_chart::Effectiveness;
use schema::{Hazard, SideCondition, StatKind, StatusKind, Weather};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One of the two sides in a singles battle. Provides type safety over raw indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SideId {
    Player1,
    Player2,
}

impl SideId {
    pub const ALL: [SideId; 2] = [SideId::Player1, SideId::Player2];

    pub fn to_index(self) -> usize {
        match self {
            SideId::Player1 => 0,
            SideId::Player2 => 1,
        }
    }

    pub fn opponent(self) -> SideId {
        match self {
            SideId::Player1 => SideId::Player2,
            SideId::Player2 => SideId::Player1,
        }
    }
}

impl fmt::Display for SideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SideId::Player1 => write!(f, "Player 1"),
            SideId::Player2 => write!(f, "Player 2"),
        }
    }
}

/// Stable handle to a team member. Slots never move during a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatantRef {
    pub side: SideId,
    pub slot: usize,
}

impl CombatantRef {
    pub fn new(side: SideId, slot: usize) -> Self {
        Self { side, slot }
    }
}

/// A team, its active slot and the conditions laid on its half of the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Side {
    pub team: Vec<Combatant>,
    pub active: usize,
    /// Layers per hazard on this side.
    #[serde(default)]
    pub hazards: BTreeMap<Hazard, u8>,
    /// Turns left per side condition.
    #[serde(default)]
    pub conditions: BTreeMap<SideCondition, u8>,
    /// Set by a sacrificial heal; the next combatant to enter is fully restored.
    #[serde(default)]
    pub healing_wish: bool,
}

impl Side {
    pub fn new(team: Vec<Combatant>) -> Self {
        Self {
            team,
            active: 0,
            hazards: BTreeMap::new(),
            conditions: BTreeMap::new(),
            healing_wish: false,
        }
    }

    pub fn active_combatant(&self) -> Option<&Combatant> {
        self.team.get(self.active)
    }

    pub fn active_combatant_mut(&mut self) -> Option<&mut Combatant> {
        self.team.get_mut(self.active)
    }

    pub fn has_condition(&self, condition: SideCondition) -> bool {
        self.conditions.contains_key(&condition)
    }

    pub fn hazard_layers(&self, hazard: Hazard) -> u8 {
        self.hazards.get(&hazard).copied().unwrap_or(0)
    }

    pub fn has_able_combatant(&self) -> bool {
        self.team.iter().any(|combatant| !combatant.is_fainted())
    }

    /// Benched slots holding a combatant that can still fight.
    pub fn able_bench_slots(&self) -> Vec<usize> {
        self.team
            .iter()
            .enumerate()
            .filter(|(slot, combatant)| *slot != self.active && !combatant.is_fainted())
            .map(|(slot, _)| slot)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleOutcome {
    Ongoing,
    Won(SideId),
    Draw,
    Fled(SideId),
}

impl BattleOutcome {
    pub fn is_over(self) -> bool {
        self != BattleOutcome::Ongoing
    }
}

/// Everything the engine needs to resolve a turn of one battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleState {
    pub sides: [Side; 2],
    #[serde(default)]
    pub field: FieldState,
    pub turn_number: u32,
    pub outcome: BattleOutcome,
}

impl BattleState {
    pub fn new(player1: Side, player2: Side) -> Self {
        Self {
            sides: [player1, player2],
            field: FieldState::default(),
            turn_number: 1,
            outcome: BattleOutcome::Ongoing,
        }
    }

    pub fn with_field(mut self, field: FieldState) -> Self {
        self.field = field;
        self
    }

    pub fn side(&self, id: SideId) -> &Side {
        &self.sides[id.to_index()]
    }

    pub fn side_mut(&mut self, id: SideId) -> &mut Side {
        &mut self.sides[id.to_index()]
    }

    pub fn active_ref(&self, id: SideId) -> CombatantRef {
        CombatantRef::new(id, self.side(id).active)
    }

    pub fn combatant(&self, target: CombatantRef) -> EngineResult<&Combatant> {
        self.side(target.side)
            .team
            .get(target.slot)
            .ok_or(EngineError::InvalidCombatant {
                side: target.side,
                slot: target.slot,
            })
    }

    pub fn combatant_mut(&mut self, target: CombatantRef) -> EngineResult<&mut Combatant> {
        self.side_mut(target.side)
            .team
            .get_mut(target.slot)
            .ok_or(EngineError::InvalidCombatant {
                side: target.side,
                slot: target.slot,
            })
    }

    pub fn active(&self, id: SideId) -> EngineResult<&Combatant> {
        self.combatant(self.active_ref(id))
    }

    /// Who has won, judged only by which sides still have able combatants.
    pub fn judge_outcome(&self) -> BattleOutcome {
        let able: Vec<bool> = self.sides.iter().map(Side::has_able_combatant).collect();
        match (able[0], able[1]) {
            (true, true) => BattleOutcome::Ongoing,
            (true, false) => BattleOutcome::Won(SideId::Player1),
            (false, true) => BattleOutcome::Won(SideId::Player2),
            (false, false) => BattleOutcome::Draw,
        }
    }

    /// Check every combatant and each side's active slot.
    pub fn validate(&self) -> EngineResult<()> {
        for id in SideId::ALL {
            for combatant in &self.side(id).team {
                combatant.validate()?;
            }
            self.active(id)?;
        }
        Ok(())
    }

    /// Compact binary form for callers that persist battles between turns.
    pub fn to_snapshot(&self) -> EngineResult<Vec<u8>> {
        postcard::to_allocvec(self).map_err(|e| EngineError::Snapshot(e.to_string()))
    }

    /// Restore a snapshot. The restored state is validated before it is returned.
    pub fn from_snapshot(bytes: &[u8]) -> EngineResult<Self> {
        let state: Self =
            postcard::from_bytes(bytes).map_err(|e| EngineError::Snapshot(e.to_string()))?;
        state.validate()?;
        Ok(state)
    }

    fn name_of(&self, target: CombatantRef) -> &str {
        self.combatant(target)
            .map(|combatant| combatant.name.as_str())
            .unwrap_or("???")
    }
}

/// Why a move or action did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    NoTarget,
    ConditionNotMet,
    AlreadyAffected,
    Safeguarded,
    Immune,
    Taunted,
    Tormented,
    Disabled,
    Encored,
    HealBlocked,
    Embargoed,
    Trapped,
    NoReplacement,
    WrongWeather,
    HazardAtMax,
    Mist,
    StatAtLimit,
    NotEnoughHp,
    FullHp,
    Powder,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureReason::NoTarget => "there is no target",
            FailureReason::ConditionNotMet => "the conditions were not met",
            FailureReason::AlreadyAffected => "the target is already affected",
            FailureReason::Safeguarded => "the target is protected by Safeguard",
            FailureReason::Immune => "the target is immune",
            FailureReason::Taunted => "the user is taunted",
            FailureReason::Tormented => "the user cannot repeat a move under torment",
            FailureReason::Disabled => "the move is disabled",
            FailureReason::Encored => "the user must repeat its last move",
            FailureReason::HealBlocked => "healing is blocked",
            FailureReason::Embargoed => "items are blocked by Embargo",
            FailureReason::Trapped => "the user is trapped",
            FailureReason::NoReplacement => "there is nothing to switch to",
            FailureReason::WrongWeather => "the weather is wrong",
            FailureReason::HazardAtMax => "no more layers fit",
            FailureReason::Mist => "the target is protected by Mist",
            FailureReason::StatAtLimit => "the stat cannot go any further",
            FailureReason::NotEnoughHp => "the user does not have enough HP",
            FailureReason::FullHp => "HP is already full",
            FailureReason::Powder => "the powder exploded",
        };
        write!(f, "{}", text)
    }
}

/// Source of damage that did not come from an attack's damage roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageCause {
    Weather(Weather),
    Hazard(Hazard),
    Confusion,
    Contact,
    HpCost,
    PainSplit,
    Powder,
}

/// Structured outcome of everything that happened during a turn, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BattleEvent {
    // Turn management
    TurnStarted {
        turn: u32,
    },
    TurnEnded {
        turn: u32,
    },

    // Actions
    MoveUsed {
        user: CombatantRef,
        move_name: String,
    },
    MoveMissed {
        user: CombatantRef,
        move_name: String,
    },
    MoveFailed {
        user: CombatantRef,
        move_name: String,
        reason: FailureReason,
    },
    MoveBlocked {
        target: CombatantRef,
        move_name: String,
    },
    ActionPrevented {
        actor: CombatantRef,
        reason: StatusKind,
    },
    Switched {
        side: SideId,
        from: usize,
        to: usize,
    },
    SwitchFailed {
        side: SideId,
        reason: FailureReason,
    },
    ItemUsed {
        user: CombatantRef,
        item: ItemKind,
    },
    ItemFailed {
        user: CombatantRef,
        item: ItemKind,
        reason: FailureReason,
    },
    Fled {
        side: SideId,
    },
    FleeFailed {
        side: SideId,
        reason: FailureReason,
    },
    ActionSkipped {
        actor: CombatantRef,
    },

    // Damage and healing
    CriticalHit {
        target: CombatantRef,
    },
    DamageDealt {
        target: CombatantRef,
        amount: u16,
        remaining_hp: u16,
        effectiveness: f64,
    },
    SubstituteDamaged {
        target: CombatantRef,
        amount: u16,
        broke: bool,
    },
    IndirectDamage {
        target: CombatantRef,
        amount: u16,
        remaining_hp: u16,
        cause: DamageCause,
    },
    Endured {
        target: CombatantRef,
    },
    Healed {
        target: CombatantRef,
        amount: u16,
        remaining_hp: u16,
    },
    Fainted {
        target: CombatantRef,
    },

    // Statuses
    StatusApplied {
        target: CombatantRef,
        kind: StatusKind,
        duration: Option<u8>,
    },
    StatusTicked {
        target: CombatantRef,
        kind: StatusKind,
        damage: u16,
    },
    StatusEnded {
        target: CombatantRef,
        kind: StatusKind,
    },
    StatusCured {
        target: CombatantRef,
        kind: StatusKind,
    },

    // Stats
    StatModified {
        target: CombatantRef,
        stat: StatKind,
        new_stage: i8,
    },
    StatChangeBlocked {
        target: CombatantRef,
        stat: StatKind,
        reason: FailureReason,
    },
    StatValueChanged {
        target: CombatantRef,
        stat: StatKind,
        value: u16,
    },

    // Field
    FieldChanged {
        kind: FieldKind,
        remaining: Option<u8>,
    },
    HazardLaid {
        side: SideId,
        hazard: Hazard,
        layers: u8,
    },
    HazardsCleared {
        side: SideId,
    },
    SideConditionStarted {
        side: SideId,
        condition: SideCondition,
        turns: u8,
    },
    SideConditionEnded {
        side: SideId,
        condition: SideCondition,
    },

    BattleEnded {
        outcome: BattleOutcome,
    },
}

impl BattleEvent {
    /// Formats the event into a human-readable line using battle context.
    /// Returns `None` for silent bookkeeping events.
    pub fn format(&self, battle_state: &BattleState) -> Option<String> {
        let name = |target: &CombatantRef| battle_state.name_of(*target);
        match self {
            BattleEvent::TurnStarted { turn } => Some(format!("=== Turn {} ===", turn)),
            BattleEvent::TurnEnded { .. } => None,

            BattleEvent::MoveUsed { user, move_name } => {
                Some(format!("{} used {}!", name(user), move_name))
            }
            BattleEvent::MoveMissed { user, .. } => {
                Some(format!("{}'s attack missed!", name(user)))
            }
            BattleEvent::MoveFailed {
                user,
                move_name,
                reason,
            } => Some(format!(
                "{}'s {} failed: {}.",
                name(user),
                move_name,
                reason
            )),
            BattleEvent::MoveBlocked { target, .. } => {
                Some(format!("{} protected itself!", name(target)))
            }
            BattleEvent::ActionPrevented { actor, reason } => Some(match reason {
                StatusKind::Sleep => format!("{} is fast asleep.", name(actor)),
                StatusKind::Freeze => format!("{} is frozen solid!", name(actor)),
                StatusKind::Paralysis => format!("{} is paralyzed! It can't move!", name(actor)),
                StatusKind::Flinch => format!("{} flinched!", name(actor)),
                StatusKind::Confusion => format!("{} hurt itself in its confusion!", name(actor)),
                StatusKind::Infatuation => format!("{} is immobilized by love!", name(actor)),
                other => format!("{} couldn't move because of {}!", name(actor), other),
            }),
            BattleEvent::Switched { side, from, to } => {
                let side_state = battle_state.side(*side);
                let old = side_state.team.get(*from).map_or("???", |c| c.name.as_str());
                let new = side_state.team.get(*to).map_or("???", |c| c.name.as_str());
                Some(format!("{} withdrew {} and sent out {}!", side, old, new))
            }
            BattleEvent::SwitchFailed { side, reason } => {
                Some(format!("{} couldn't switch: {}.", side, reason))
            }
            BattleEvent::ItemUsed { user, item } => {
                Some(format!("{} was given a {}.", name(user), item))
            }
            BattleEvent::ItemFailed { user, item, reason } => Some(format!(
                "The {} had no effect on {}: {}.",
                item,
                name(user),
                reason
            )),
            BattleEvent::Fled { side } => Some(format!("{} fled from the battle!", side)),
            BattleEvent::FleeFailed { side, reason } => {
                Some(format!("{} couldn't escape: {}.", side, reason))
            }
            BattleEvent::ActionSkipped { actor } => {
                Some(format!("{} is biding its time.", name(actor)))
            }

            BattleEvent::CriticalHit { .. } => Some("A critical hit!".to_string()),
            BattleEvent::DamageDealt {
                target,
                amount,
                effectiveness,
                ..
            } => {
                let suffix = match Effectiveness::from_multiplier(*effectiveness) {
                    Effectiveness::SuperEffective => " It's super effective!",
                    Effectiveness::NotVeryEffective => " It's not very effective...",
                    Effectiveness::NoEffect => " It had no effect!",
                    Effectiveness::Normal => "",
                };
                Some(format!("{} took {} damage!{}", name(target), amount, suffix))
            }
            BattleEvent::SubstituteDamaged { target, broke, .. } => Some(if *broke {
                format!("{}'s substitute faded!", name(target))
            } else {
                format!("The substitute took damage for {}!", name(target))
            }),
            BattleEvent::IndirectDamage {
                target,
                amount,
                cause,
                ..
            } => {
                let source = match cause {
                    DamageCause::Weather(weather) => format!("the {}", weather),
                    DamageCause::Hazard(hazard) => hazard.to_string(),
                    DamageCause::Confusion => "its confusion".to_string(),
                    DamageCause::Contact => "the protection's barbs".to_string(),
                    DamageCause::HpCost => "its own move".to_string(),
                    DamageCause::PainSplit => "the pain split".to_string(),
                    DamageCause::Powder => "exploding powder".to_string(),
                };
                Some(format!("{} lost {} HP to {}.", name(target), amount, source))
            }
            BattleEvent::Endured { target } => {
                Some(format!("{} endured the hit!", name(target)))
            }
            BattleEvent::Healed { target, amount, .. } => {
                Some(format!("{} recovered {} HP!", name(target), amount))
            }
            BattleEvent::Fainted { target } => Some(format!("{} fainted!", name(target))),

            BattleEvent::StatusApplied { target, kind, .. } => {
                Some(format!("{} is now affected by {}!", name(target), kind))
            }
            BattleEvent::StatusTicked {
                target,
                kind,
                damage,
            } => Some(format!(
                "{} is hurt by {}! ({} damage)",
                name(target),
                kind,
                damage
            )),
            BattleEvent::StatusEnded { target, kind } => {
                Some(format!("{}'s {} wore off.", name(target), kind))
            }
            BattleEvent::StatusCured { target, kind } => {
                Some(format!("{} was cured of {}!", name(target), kind))
            }

            BattleEvent::StatModified {
                target,
                stat,
                new_stage,
            } => Some(format!(
                "{}'s {} is now at stage {:+}.",
                name(target),
                stat,
                new_stage
            )),
            BattleEvent::StatChangeBlocked {
                target,
                stat,
                reason,
            } => Some(format!(
                "{}'s {} won't change: {}.",
                name(target),
                stat,
                reason
            )),
            BattleEvent::StatValueChanged { .. } => None,

            BattleEvent::FieldChanged { kind, remaining } => Some(match remaining {
                Some(0) => format!("The field returned to {}.", kind),
                Some(turns) => format!("{} ({} turns left).", kind, turns),
                None => format!("{} settled in.", kind),
            }),
            BattleEvent::HazardLaid {
                side,
                hazard,
                layers,
            } => Some(format!(
                "{} now lies on {}'s side ({} layer(s)).",
                hazard, side, layers
            )),
            BattleEvent::HazardsCleared { side } => {
                Some(format!("The hazards on {}'s side were cleared.", side))
            }
            BattleEvent::SideConditionStarted {
                side,
                condition,
                turns,
            } => Some(format!(
                "{} protects {}'s side for {} turns.",
                condition, side, turns
            )),
            BattleEvent::SideConditionEnded { side, condition } => {
                Some(format!("{}'s {} wore off.", side, condition))
            }

            BattleEvent::BattleEnded { outcome } => Some(match outcome {
                BattleOutcome::Won(side) => format!("{} won the battle!", side),
                BattleOutcome::Draw => "The battle ended in a draw.".to_string(),
                BattleOutcome::Fled(side) => format!("{} ran away.", side),
                BattleOutcome::Ongoing => return None,
            }),
        }
    }
}

/// Ordered collector for the events of one turn.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    events: Vec<BattleEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: BattleEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[BattleEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<BattleEvent> {
        self.events
    }

    /// Every non-silent event rendered against `battle_state`.
    pub fn format_all(&self, battle_state: &BattleState) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| event.format(battle_state))
            .collect()
    }

    /// Return true if the event bus contains no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Return the number of events in the bus.
    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl fmt::Display for EventBus {
    /// Debug format of all events, one per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for event in &self.events {
            writeln!(f, "  {:?}", event)?;
        }
        Ok(())
    }
}
