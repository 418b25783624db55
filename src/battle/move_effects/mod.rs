//! Turns a catalog descriptor into the commands for one use of a non-damaging
//! move. Each family lives in its own helper module; this module owns the
//! shared context, the protection check and the dispatch.

mod field_effects;
mod healing_effects;
mod stat_effects;
mod status_effects;

use crate::battle::commands::BattleCommand;
use crate::battle::rng::BattleRng;
use crate::battle::state::{BattleEvent, BattleState, CombatantRef, FailureReason};
use crate::combatant::Combatant;
use crate::config::BattleRules;
use crate::errors::EngineResult;
use crate::move_catalog::{
    EffectCondition, EffectTarget, FieldEffect, MoveEffectDescriptor, MoveEffectEntry,
};
use crate::status::StatusRegistry;
use schema::StatusKind;
use tracing::debug;

use self::{field_effects::*, healing_effects::*, stat_effects::*, status_effects::*};

/// Who is acting on whom, plus the tables an effect needs to consult.
#[derive(Debug, Clone, Copy)]
pub struct EffectContext<'a> {
    pub user: CombatantRef,
    pub target: CombatantRef,
    pub move_name: &'a str,
    pub registry: &'a StatusRegistry,
    pub rules: &'a BattleRules,
}

impl<'a> EffectContext<'a> {
    pub fn new(
        user: CombatantRef,
        target: CombatantRef,
        move_name: &'a str,
        registry: &'a StatusRegistry,
        rules: &'a BattleRules,
    ) -> Self {
        Self {
            user,
            target,
            move_name,
            registry,
            rules,
        }
    }

    /// Combatants an effect lands on, user first.
    pub fn resolve(&self, target: EffectTarget) -> Vec<CombatantRef> {
        match target {
            EffectTarget::User => vec![self.user],
            EffectTarget::Opponent => vec![self.target],
            EffectTarget::Both => vec![self.user, self.target],
        }
    }

    pub fn is_opponent(&self, target: CombatantRef) -> bool {
        target.side != self.user.side
    }

    pub(crate) fn fail(&self, reason: FailureReason) -> BattleCommand {
        BattleCommand::EmitEvent(BattleEvent::MoveFailed {
            user: self.user,
            move_name: self.move_name.to_string(),
            reason,
        })
    }
}

/// Resolve one use of a catalog move.
///
/// The returned batch always opens with the usage announcement; a move that
/// cannot work ends with a single failure event and changes nothing else.
pub fn apply_move_effect(
    entry: &MoveEffectEntry,
    context: &EffectContext,
    state: &BattleState,
    rng: &mut dyn BattleRng,
) -> EngineResult<Vec<BattleCommand>> {
    let mut commands = vec![
        BattleCommand::EmitEvent(BattleEvent::MoveUsed {
            user: context.user,
            move_name: entry.name.clone(),
        }),
        BattleCommand::SetLastMove {
            target: context.user,
            name: entry.name.clone(),
        },
    ];

    let user = state.combatant(context.user)?;
    let descriptor = resolve_branch(&entry.effect, user);
    let target = state.combatant(context.target)?;

    if targets_opponent(descriptor) && target.has_status(StatusKind::Protected) {
        debug!(move_name = %entry.name, "blocked by protection");
        commands.push(BattleCommand::EmitEvent(BattleEvent::MoveBlocked {
            target: context.target,
            move_name: entry.name.clone(),
        }));
        return Ok(commands);
    }

    commands.extend(apply_descriptor(descriptor, context, state, rng)?);
    Ok(commands)
}

/// Follow type-conditional branches down to the effect that actually runs.
fn resolve_branch<'d>(descriptor: &'d MoveEffectDescriptor, user: &Combatant) -> &'d MoveEffectDescriptor {
    let mut current = descriptor;
    while let MoveEffectDescriptor::Field(FieldEffect::TypeConditional {
        user_type,
        matching,
        otherwise,
    }) = current
    {
        current = if user.has_type(*user_type) {
            matching
        } else {
            otherwise
        };
    }
    current
}

/// Whether the effect reaches across to the opponent, making it subject to
/// protection.
fn targets_opponent(descriptor: &MoveEffectDescriptor) -> bool {
    match descriptor {
        MoveEffectDescriptor::StatModification { target, .. } => *target == EffectTarget::Opponent,
        MoveEffectDescriptor::StatusAffliction { .. } => true,
        MoveEffectDescriptor::Healing { recipient, .. } => *recipient == EffectTarget::Opponent,
        MoveEffectDescriptor::Field(effect) => matches!(
            effect,
            FieldEffect::InflictVolatile {
                target: EffectTarget::Opponent,
                ..
            } | FieldEffect::TransferStatus
                | FieldEffect::PainSplit
        ),
    }
}

fn apply_descriptor(
    descriptor: &MoveEffectDescriptor,
    context: &EffectContext,
    state: &BattleState,
    rng: &mut dyn BattleRng,
) -> EngineResult<Vec<BattleCommand>> {
    match descriptor {
        MoveEffectDescriptor::StatModification { .. } => {
            apply_stat_modification(descriptor, context, state, rng)
        }
        MoveEffectDescriptor::StatusAffliction { .. } => {
            apply_status_affliction(descriptor, context, state, rng)
        }
        MoveEffectDescriptor::Healing { .. } => apply_healing(descriptor, context, state, rng),
        MoveEffectDescriptor::Field(FieldEffect::TypeConditional { .. }) => {
            let user = state.combatant(context.user)?;
            apply_descriptor(resolve_branch(descriptor, user), context, state, rng)
        }
        MoveEffectDescriptor::Field(effect) => apply_field_effect(effect, context, state, rng),
    }
}

/// Check a move's precondition against the current state.
pub(crate) fn condition_met(
    condition: &EffectCondition,
    context: &EffectContext,
    state: &BattleState,
) -> EngineResult<bool> {
    let user = state.combatant(context.user)?;
    let target = state.combatant(context.target)?;
    Ok(match condition {
        EffectCondition::TargetPoisoned => matches!(
            target.primary_kind(),
            Some(StatusKind::Poison | StatusKind::Toxic)
        ),
        EffectCondition::TargetAsleep => target.is_asleep(),
        EffectCondition::TargetHasStatus => target.primary.is_some(),
        EffectCondition::UserHasStatus => user.primary.is_some(),
        EffectCondition::OppositeGender => match (user.gender, target.gender) {
            (Some(mine), Some(theirs)) => mine.is_opposite(theirs),
            _ => false,
        },
        EffectCondition::UserHasStockpile => user.stacks(StatusKind::Stockpile) > 0,
        EffectCondition::WeatherIn(weathers) => weathers.contains(&state.field.weather),
    })
}

/// `Some(failure)` when `condition` is present and not met.
pub(crate) fn unmet_condition(
    condition: Option<&EffectCondition>,
    context: &EffectContext,
    state: &BattleState,
) -> EngineResult<Option<BattleCommand>> {
    match condition {
        Some(condition) if !condition_met(condition, context, state)? => {
            Ok(Some(context.fail(FailureReason::ConditionNotMet)))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::battle::commands::execute_command_batch;
    use crate::battle::rng::ScriptedRng;
    use crate::battle::state::{EventBus, Side, SideId};
    use crate::combatant::StatBlock;
    use crate::move_catalog::MoveEffectCatalog;
    use schema::MonsterType;

    pub fn member(name: &str, types: Vec<MonsterType>) -> Combatant {
        Combatant::new(name, types, 50, StatBlock::new(160, 100, 100, 100, 100, 100))
    }

    pub fn create_test_battle_state() -> BattleState {
        let player1 = Side::new(vec![
            member("Caster", vec![MonsterType::Normal]),
            member("Reserve", vec![MonsterType::Water]),
        ]);
        let player2 = Side::new(vec![
            member("Target", vec![MonsterType::Normal]),
            member("Backup", vec![MonsterType::Grass]),
        ]);
        BattleState::new(player1, player2)
    }

    pub fn user_ref() -> CombatantRef {
        CombatantRef::new(SideId::Player1, 0)
    }

    pub fn target_ref() -> CombatantRef {
        CombatantRef::new(SideId::Player2, 0)
    }

    /// Run a catalog move from Player1's lead against Player2's lead and apply
    /// the result. Returns the emitted events.
    pub fn use_move(state: &mut BattleState, name: &str, draws: Vec<f64>) -> Vec<BattleEvent> {
        let catalog = MoveEffectCatalog::standard().unwrap();
        let registry = StatusRegistry::standard().unwrap();
        let rules = BattleRules::standard().unwrap();
        let entry = catalog.lookup(name).unwrap();
        let context = EffectContext::new(user_ref(), target_ref(), &entry.name, registry, &rules);
        let mut rng = ScriptedRng::new(draws);
        let commands = apply_move_effect(entry, &context, state, &mut rng).unwrap();
        let mut bus = EventBus::new();
        execute_command_batch(commands, state, &mut bus).unwrap();
        bus.into_events()
    }

    pub fn failure(events: &[BattleEvent]) -> Option<FailureReason> {
        events.iter().find_map(|event| match event {
            BattleEvent::MoveFailed { reason, .. } => Some(*reason),
            _ => None,
        })
    }
}
