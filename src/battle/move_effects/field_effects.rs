// --- IMPORTS ---
use super::stat_effects::stat_change_commands;
use super::EffectContext;
use crate::battle::commands::BattleCommand;
use crate::battle::conditions::{try_inflict, StatusCheck};
use crate::battle::rng::BattleRng;
use crate::battle::state::{BattleState, DamageCause, FailureReason};
use crate::battle::switching::switch_in_commands;
use crate::errors::EngineResult;
use crate::move_catalog::{EffectTarget, FieldEffect};
use schema::StatusKind;
use tracing::debug;

const SUBSTITUTE_COST: f64 = 0.25;

/// Apply a field, protection or one-off effect.
pub(super) fn apply_field_effect(
    effect: &FieldEffect,
    context: &EffectContext,
    state: &BattleState,
    rng: &mut dyn BattleRng,
) -> EngineResult<Vec<BattleCommand>> {
    let user_side = context.user.side;
    let turns = context.rules.default_field_duration;

    match effect {
        FieldEffect::SetWeather { weather } => {
            if state.field.weather == *weather {
                return Ok(vec![context.fail(FailureReason::AlreadyAffected)]);
            }
            Ok(vec![BattleCommand::SetWeather {
                weather: *weather,
                turns: Some(turns),
            }])
        }
        FieldEffect::SetTerrain { terrain } => {
            if state.field.terrain == *terrain {
                return Ok(vec![context.fail(FailureReason::AlreadyAffected)]);
            }
            Ok(vec![BattleCommand::SetTerrain {
                terrain: *terrain,
                turns: Some(turns),
            }])
        }
        FieldEffect::LayHazard { hazard } => {
            let side = user_side.opponent();
            if state.side(side).hazard_layers(*hazard) >= hazard.max_layers() {
                return Ok(vec![context.fail(FailureReason::HazardAtMax)]);
            }
            Ok(vec![BattleCommand::AddHazard {
                side,
                hazard: *hazard,
            }])
        }
        FieldEffect::ClearHazards {
            both_sides,
            user_stats,
            target_stats,
        } => {
            let mut commands = vec![BattleCommand::ClearHazards { side: user_side }];
            if *both_sides {
                commands.push(BattleCommand::ClearHazards {
                    side: user_side.opponent(),
                });
            }
            commands.extend(stat_change_commands(context.user, user_stats, context, state));
            let target = state.combatant(context.target)?;
            // The hazards still go when the target is shielded; only its stat drop is blocked.
            if !target.is_fainted() && !target.has_status(StatusKind::Protected) {
                commands.extend(stat_change_commands(
                    context.target,
                    target_stats,
                    context,
                    state,
                ));
            }
            Ok(commands)
        }
        FieldEffect::SideCondition {
            condition,
            turns: condition_turns,
            requires_weather,
        } => {
            if !requires_weather.is_empty() && !requires_weather.contains(&state.field.weather) {
                return Ok(vec![context.fail(FailureReason::WrongWeather)]);
            }
            if state.side(user_side).has_condition(*condition) {
                return Ok(vec![context.fail(FailureReason::AlreadyAffected)]);
            }
            Ok(vec![BattleCommand::AddSideCondition {
                side: user_side,
                condition: *condition,
                turns: condition_turns.unwrap_or(turns),
            }])
        }
        FieldEffect::Protect { contact } => {
            let mut commands = self_status(StatusKind::Protected, context, state, rng)?;
            if matches!(commands.first(), Some(BattleCommand::ApplyStatus { .. })) {
                commands.push(BattleCommand::SetGuard {
                    target: context.user,
                    contact: contact.clone(),
                });
            }
            Ok(commands)
        }
        FieldEffect::Endure => self_status(StatusKind::Enduring, context, state, rng),
        FieldEffect::Substitute => {
            let user = state.combatant(context.user)?;
            if user.has_status(StatusKind::Substitute) {
                return Ok(vec![context.fail(FailureReason::AlreadyAffected)]);
            }
            let cost = user.hp_fraction(SUBSTITUTE_COST);
            if user.current_hp <= cost {
                return Ok(vec![context.fail(FailureReason::NotEnoughHp)]);
            }
            let mut commands = vec![BattleCommand::IndirectDamage {
                target: context.user,
                amount: cost,
                cause: DamageCause::HpCost,
            }];
            commands.extend(self_status(StatusKind::Substitute, context, state, rng)?);
            commands.push(BattleCommand::SetSubstitute {
                target: context.user,
                hp: cost,
            });
            Ok(commands)
        }
        FieldEffect::InflictVolatile {
            status,
            target,
            duration,
            hp_cost,
        } => inflict_volatile(*status, *target, *duration, *hp_cost, context, state, rng),
        FieldEffect::TransferStatus => {
            let user = state.combatant(context.user)?;
            let Some(kind) = user.primary_kind() else {
                return Ok(vec![context.fail(FailureReason::ConditionNotMet)]);
            };
            let check = try_inflict(
                context.registry,
                state,
                context.target,
                kind,
                user.primary.and_then(|status| status.remaining),
                Some(user_side),
                rng,
            )?;
            Ok(match check {
                StatusCheck::Apply(command) => vec![
                    command,
                    BattleCommand::CureStatus {
                        target: context.user,
                        kind,
                    },
                ],
                StatusCheck::Fail(reason) => vec![context.fail(reason)],
            })
        }
        FieldEffect::PainSplit => {
            let user = state.combatant(context.user)?;
            let target = state.combatant(context.target)?;
            if target.is_fainted() {
                return Ok(vec![context.fail(FailureReason::NoTarget)]);
            }
            let shared = ((user.current_hp as u32 + target.current_hp as u32) / 2) as u16;
            let mut commands = Vec::new();
            for (target_ref, combatant) in [(context.user, user), (context.target, target)] {
                if combatant.current_hp > shared {
                    commands.push(BattleCommand::IndirectDamage {
                        target: target_ref,
                        amount: combatant.current_hp - shared,
                        cause: DamageCause::PainSplit,
                    });
                } else if combatant.current_hp < shared {
                    commands.push(BattleCommand::Heal {
                        target: target_ref,
                        amount: shared - combatant.current_hp,
                    });
                }
            }
            Ok(commands)
        }
        FieldEffect::ForceSwitch => {
            let target = state.combatant(context.target)?;
            if target.is_fainted() {
                return Ok(vec![context.fail(FailureReason::NoTarget)]);
            }
            if target.has_status(StatusKind::Ingrain) {
                return Ok(vec![context.fail(FailureReason::Trapped)]);
            }
            let side = context.target.side;
            let bench = state.side(side).able_bench_slots();
            if bench.is_empty() {
                return Ok(vec![context.fail(FailureReason::NoReplacement)]);
            }
            let slot = bench[rng.pick_index(bench.len(), "forced switch")];
            debug!(%side, slot, "dragging in a replacement");
            switch_in_commands(context.registry, state, side, slot, rng)
        }
        // Branches are resolved before dispatch.
        FieldEffect::TypeConditional { .. } | FieldEffect::Nothing => Ok(Vec::new()),
    }
}

/// A one-turn style status the user puts on itself.
fn self_status(
    kind: StatusKind,
    context: &EffectContext,
    state: &BattleState,
    rng: &mut dyn BattleRng,
) -> EngineResult<Vec<BattleCommand>> {
    let check = try_inflict(context.registry, state, context.user, kind, None, None, rng)?;
    Ok(match check {
        StatusCheck::Apply(command) => vec![command],
        StatusCheck::Fail(reason) => vec![context.fail(reason)],
    })
}

fn inflict_volatile(
    status: StatusKind,
    target: EffectTarget,
    duration: Option<u8>,
    hp_cost: Option<f64>,
    context: &EffectContext,
    state: &BattleState,
    rng: &mut dyn BattleRng,
) -> EngineResult<Vec<BattleCommand>> {
    let opponent = state.combatant(context.target)?;
    if matches!(status, StatusKind::Encore | StatusKind::Disable) && opponent.last_move.is_none() {
        return Ok(vec![context.fail(FailureReason::ConditionNotMet)]);
    }

    let mut commands = Vec::new();
    let mut last_failure = None;
    for target_ref in context.resolve(target) {
        let check = try_inflict(
            context.registry,
            state,
            target_ref,
            status,
            duration,
            Some(context.user.side),
            rng,
        )?;
        match check {
            StatusCheck::Apply(command) => commands.push(command),
            StatusCheck::Fail(reason) => last_failure = Some(reason),
        }
    }
    if commands.is_empty() {
        return Ok(vec![context.fail(last_failure.unwrap_or(FailureReason::NoTarget))]);
    }

    // Curse costs the user even if it faints doing so.
    if let Some(fraction) = hp_cost {
        let user = state.combatant(context.user)?;
        commands.insert(
            0,
            BattleCommand::IndirectDamage {
                target: context.user,
                amount: user.hp_fraction(fraction),
                cause: DamageCause::HpCost,
            },
        );
    }
    Ok(commands)
}
