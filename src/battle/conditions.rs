//! Status lifecycle: applying, gating actions, end-of-turn residuals and cures.
//!
//! Everything here reads the battle state and answers with commands; nothing
//! mutates state directly.

use crate::battle::commands::BattleCommand;
use crate::battle::rng::BattleRng;
use crate::battle::state::{
    BattleEvent, BattleState, CombatantRef, DamageCause, FailureReason, SideId,
};
use crate::combatant::{ActiveStatus, Combatant, PendingEffect};
use crate::errors::EngineResult;
use crate::status::{ExpiryRule, ResidualRule, StatusClass, StatusRegistry};
use schema::{MonsterType, SideCondition, StatKind, StatusKind, Terrain};
use tracing::debug;

/// Result of trying to place a status on a combatant.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusCheck {
    Apply(BattleCommand),
    Fail(FailureReason),
}

/// Types that can never hold `kind`.
fn immune_types(kind: StatusKind) -> &'static [MonsterType] {
    match kind {
        StatusKind::Poison | StatusKind::Toxic => &[MonsterType::Poison, MonsterType::Steel],
        StatusKind::Burn => &[MonsterType::Fire],
        StatusKind::Freeze => &[MonsterType::Ice],
        StatusKind::Paralysis => &[MonsterType::Electric],
        StatusKind::LeechSeed | StatusKind::Powder => &[MonsterType::Grass],
        _ => &[],
    }
}

fn blocked_by_safeguard(kind: StatusKind, primary: bool) -> bool {
    primary || matches!(kind, StatusKind::Confusion | StatusKind::Drowsy)
}

fn blocked_by_terrain(terrain: Terrain, kind: StatusKind, primary: bool, target: &Combatant) -> bool {
    if target.has_type(MonsterType::Flying) || target.has_status(StatusKind::MagnetRise) {
        return false;
    }
    match terrain {
        Terrain::Electric => matches!(kind, StatusKind::Sleep | StatusKind::Drowsy),
        Terrain::Misty => primary || kind == StatusKind::Confusion,
        _ => false,
    }
}

/// Validate and build the command that places `kind` on `target`.
///
/// `source` is the side whose action caused the status, if any; Safeguard only
/// stops statuses coming from the other side. `duration` overrides the
/// registry's sampled duration.
pub fn try_inflict(
    registry: &StatusRegistry,
    state: &BattleState,
    target: CombatantRef,
    kind: StatusKind,
    duration: Option<u8>,
    source: Option<SideId>,
    rng: &mut dyn BattleRng,
) -> EngineResult<StatusCheck> {
    let definition = registry.get(kind)?;
    let combatant = state.combatant(target)?;
    if combatant.is_fainted() {
        return Ok(StatusCheck::Fail(FailureReason::NoTarget));
    }

    let primary = definition.class == StatusClass::Primary;
    let from_opponent = source.is_some_and(|side| side != target.side);
    if from_opponent
        && state.side(target.side).has_condition(SideCondition::Safeguard)
        && blocked_by_safeguard(kind, primary)
    {
        return Ok(StatusCheck::Fail(FailureReason::Safeguarded));
    }
    if combatant.types.iter().any(|t| immune_types(kind).contains(t)) {
        return Ok(StatusCheck::Fail(FailureReason::Immune));
    }
    if blocked_by_terrain(state.field.terrain, kind, primary, combatant) {
        return Ok(StatusCheck::Fail(FailureReason::Immune));
    }

    if primary {
        if combatant.primary.is_some() {
            return Ok(StatusCheck::Fail(FailureReason::AlreadyAffected));
        }
    } else if let Some(existing) = combatant.status(kind) {
        return Ok(match definition.max_stacks {
            Some(cap) if existing.stacks < cap => {
                let mut stacked = *existing;
                stacked.stacks += 1;
                StatusCheck::Apply(BattleCommand::ApplyStatus {
                    target,
                    status: stacked,
                    primary: false,
                })
            }
            _ => StatusCheck::Fail(FailureReason::AlreadyAffected),
        });
    }

    let remaining = duration.or_else(|| definition.sample_duration(rng));
    debug!(%kind, ?remaining, name = %combatant.name, "status will be applied");
    Ok(StatusCheck::Apply(BattleCommand::ApplyStatus {
        target,
        status: ActiveStatus::new(kind, remaining),
        primary,
    }))
}

/// Outcome of the pre-action status gate.
#[derive(Debug, Clone, PartialEq)]
pub struct GateResult {
    pub acts: bool,
    pub commands: Vec<BattleCommand>,
}

/// Roll every action-preventing status the actor holds, primary first.
///
/// A status with an early-end chance (freeze) rolls that first and is removed
/// on success. The first status that fails its action roll stops the action;
/// one with self-harm (confusion) then hurts the actor.
pub fn check_action_gate(
    registry: &StatusRegistry,
    state: &BattleState,
    actor: CombatantRef,
    rng: &mut dyn BattleRng,
) -> EngineResult<GateResult> {
    let combatant = state.combatant(actor)?;
    let mut commands = Vec::new();

    for status in combatant.statuses() {
        let definition = registry.get(status.kind)?;
        if !definition.prevents_action {
            continue;
        }
        if let Some(chance) = definition.early_end_chance {
            if rng.chance(chance, "early status end") {
                commands.push(BattleCommand::RemoveStatus {
                    target: actor,
                    kind: status.kind,
                });
                continue;
            }
        }
        if rng.chance(definition.effective_action_chance(), status.kind.display_name()) {
            continue;
        }

        debug!(kind = %status.kind, name = %combatant.name, "action prevented");
        commands.push(BattleCommand::EmitEvent(BattleEvent::ActionPrevented {
            actor,
            reason: status.kind,
        }));
        if let Some(fraction) = definition.self_harm {
            commands.push(BattleCommand::IndirectDamage {
                target: actor,
                amount: combatant.hp_fraction(fraction).max(1),
                cause: DamageCause::Confusion,
            });
        }
        return Ok(GateResult {
            acts: false,
            commands,
        });
    }

    Ok(GateResult {
        acts: true,
        commands,
    })
}

/// Volatile statuses that forbid using `move_name` this turn.
pub fn move_restriction(actor: &Combatant, move_name: &str, is_status_move: bool) -> Option<FailureReason> {
    let repeats_last = actor
        .last_move
        .as_deref()
        .is_some_and(|last| last.eq_ignore_ascii_case(move_name));

    if is_status_move && actor.has_status(StatusKind::Taunt) {
        return Some(FailureReason::Taunted);
    }
    if repeats_last && actor.has_status(StatusKind::Disable) {
        return Some(FailureReason::Disabled);
    }
    if repeats_last && actor.has_status(StatusKind::Torment) {
        return Some(FailureReason::Tormented);
    }
    if actor.has_status(StatusKind::Encore) && actor.last_move.is_some() && !repeats_last {
        return Some(FailureReason::Encored);
    }
    None
}

/// Statuses that pin the holder in place.
pub fn switch_blocker(combatant: &Combatant) -> Option<StatusKind> {
    [StatusKind::Trapped, StatusKind::Octolock, StatusKind::Ingrain]
        .into_iter()
        .find(|kind| combatant.has_status(*kind))
}

/// End-of-turn processing for one class of statuses on `target`: residual
/// effect first, then the duration tick and expiry.
pub fn residual_commands(
    registry: &StatusRegistry,
    state: &BattleState,
    target: CombatantRef,
    class: StatusClass,
    rng: &mut dyn BattleRng,
) -> EngineResult<Vec<BattleCommand>> {
    let combatant = state.combatant(target)?;
    let mut commands = Vec::new();
    if combatant.is_fainted() {
        return Ok(commands);
    }

    let statuses: Vec<ActiveStatus> = match class {
        StatusClass::Primary => combatant.primary.into_iter().collect(),
        StatusClass::Volatile => combatant.volatiles.clone(),
    };

    for status in statuses {
        let definition = registry.get(status.kind)?;
        let fraction = definition.per_turn_fraction.unwrap_or(0.0);

        // --- Residual effect ---
        match definition.residual {
            ResidualRule::Inert => {}
            ResidualRule::Fixed => commands.push(BattleCommand::TickDamage {
                target,
                kind: status.kind,
                amount: combatant.hp_fraction(fraction),
            }),
            ResidualRule::Escalating => {
                // n/16 on the nth tick, uncapped.
                let steps = status.turns_active.saturating_add(1);
                commands.push(BattleCommand::TickDamage {
                    target,
                    kind: status.kind,
                    amount: combatant.hp_fraction(fraction * steps as f64),
                });
            }
            ResidualRule::DrainToOpponent => {
                let drained = combatant.hp_fraction(fraction).min(combatant.current_hp);
                commands.push(BattleCommand::TickDamage {
                    target,
                    kind: status.kind,
                    amount: drained,
                });
                let opponent = state.active_ref(target.side.opponent());
                if !state.combatant(opponent)?.has_status(StatusKind::HealBlock) {
                    commands.push(BattleCommand::Heal {
                        target: opponent,
                        amount: drained,
                    });
                }
            }
            ResidualRule::OnlyWhileAsleep => {
                if combatant.is_asleep() {
                    commands.push(BattleCommand::TickDamage {
                        target,
                        kind: status.kind,
                        amount: combatant.hp_fraction(fraction),
                    });
                } else {
                    commands.push(BattleCommand::RemoveStatus {
                        target,
                        kind: status.kind,
                    });
                    continue;
                }
            }
            ResidualRule::HealHolder => {
                if !combatant.has_status(StatusKind::HealBlock) {
                    commands.push(BattleCommand::Heal {
                        target,
                        amount: combatant.hp_fraction(fraction),
                    });
                }
            }
            ResidualRule::LowerDefenses => {
                for stat in [StatKind::Defense, StatKind::SpecialDefense] {
                    commands.push(BattleCommand::ChangeStatStage {
                        target,
                        stat,
                        delta: -1,
                    });
                }
            }
        }

        // --- Duration ---
        let mut ticked = status;
        ticked.turns_active = ticked.turns_active.saturating_add(1);
        match status.remaining {
            Some(turns) if turns <= 1 => {
                commands.extend(expiry_commands(
                    registry, state, target, status, definition.expiry, rng,
                )?);
            }
            Some(turns) => {
                ticked.remaining = Some(turns - 1);
                commands.push(BattleCommand::UpdateStatus {
                    target,
                    status: ticked,
                });
            }
            None => commands.push(BattleCommand::UpdateStatus {
                target,
                status: ticked,
            }),
        }
    }

    Ok(commands)
}

fn expiry_commands(
    registry: &StatusRegistry,
    state: &BattleState,
    target: CombatantRef,
    status: ActiveStatus,
    rule: ExpiryRule,
    rng: &mut dyn BattleRng,
) -> EngineResult<Vec<BattleCommand>> {
    let mut commands = vec![BattleCommand::RemoveStatus {
        target,
        kind: status.kind,
    }];
    match rule {
        ExpiryRule::Remove => {}
        ExpiryRule::Faint => commands.push(BattleCommand::Faint { target }),
        ExpiryRule::Onset => match status.pending {
            Some(PendingEffect::Inflict {
                status: kind,
                duration,
            }) => {
                if let StatusCheck::Apply(command) =
                    try_inflict(registry, state, target, kind, duration, None, rng)?
                {
                    commands.push(command);
                }
            }
            Some(PendingEffect::Heal { amount }) => {
                commands.push(BattleCommand::Heal { target, amount });
            }
            None => {}
        },
    }
    Ok(commands)
}

/// Cure `kind` if `combatant` holds it and the registry allows curing it.
pub fn cure_command(
    registry: &StatusRegistry,
    combatant: &Combatant,
    target: CombatantRef,
    kind: StatusKind,
) -> EngineResult<Option<BattleCommand>> {
    if !combatant.has_status(kind) || !registry.get(kind)?.curable {
        return Ok(None);
    }
    Ok(Some(BattleCommand::CureStatus { target, kind }))
}

/// Cure the primary status, if any.
pub fn cure_primary(
    registry: &StatusRegistry,
    combatant: &Combatant,
    target: CombatantRef,
) -> EngineResult<Option<BattleCommand>> {
    match combatant.primary_kind() {
        Some(kind) => cure_command(registry, combatant, target, kind),
        None => Ok(None),
    }
}
