// --- IMPORTS ---
use super::{unmet_condition, EffectContext};
use crate::battle::commands::BattleCommand;
use crate::battle::conditions::{try_inflict, StatusCheck};
use crate::battle::rng::BattleRng;
use crate::battle::state::{BattleEvent, BattleState, CombatantRef, DamageCause, FailureReason};
use crate::battle::stats::effective_stat;
use crate::battle::switching::switch_in_commands;
use crate::combatant::{MAX_STAGE, MIN_STAGE};
use crate::errors::EngineResult;
use crate::move_catalog::{MoveEffectDescriptor, StatSpecial, StatusRider};
use schema::{SideCondition, StatKind, StatusKind};
use std::collections::BTreeMap;

/// Stage changes for one combatant, honouring Mist against opposing drops.
pub(super) fn stat_change_commands(
    target: CombatantRef,
    stats: &BTreeMap<StatKind, i8>,
    context: &EffectContext,
    state: &BattleState,
) -> Vec<BattleCommand> {
    let misted = context.is_opponent(target)
        && state.side(target.side).has_condition(SideCondition::Mist);
    stats
        .iter()
        .filter(|(_, delta)| **delta != 0)
        .map(|(&stat, &delta)| {
            if delta < 0 && misted {
                BattleCommand::EmitEvent(BattleEvent::StatChangeBlocked {
                    target,
                    stat,
                    reason: FailureReason::Mist,
                })
            } else {
                BattleCommand::ChangeStatStage {
                    target,
                    stat,
                    delta,
                }
            }
        })
        .collect()
}

/// Place a rider status on every combatant it names. Riders that cannot
/// stick are dropped silently; the move itself still worked.
pub(super) fn rider_commands(
    rider: &StatusRider,
    context: &EffectContext,
    state: &BattleState,
    rng: &mut dyn BattleRng,
) -> EngineResult<Vec<BattleCommand>> {
    let mut commands = Vec::new();
    for target in context.resolve(rider.target) {
        let check = try_inflict(
            context.registry,
            state,
            target,
            rider.status,
            rider.duration,
            Some(context.user.side),
            rng,
        )?;
        if let StatusCheck::Apply(command) = check {
            commands.push(command);
        }
    }
    Ok(commands)
}

/// Apply a stat modification move.
pub(super) fn apply_stat_modification(
    descriptor: &MoveEffectDescriptor,
    context: &EffectContext,
    state: &BattleState,
    rng: &mut dyn BattleRng,
) -> EngineResult<Vec<BattleCommand>> {
    let MoveEffectDescriptor::StatModification {
        stats,
        target,
        side_effect,
        switch_out,
        hp_cost,
        special,
        condition,
        user_faints,
    } = descriptor
    else {
        return Ok(Vec::new());
    };

    if let Some(failure) = unmet_condition(condition.as_ref(), context, state)? {
        return Ok(vec![failure]);
    }
    let targets = context.resolve(*target);
    let user = state.combatant(context.user)?;
    for &target in &targets {
        if context.is_opponent(target) && state.combatant(target)?.is_fainted() {
            return Ok(vec![context.fail(FailureReason::NoTarget)]);
        }
    }

    let mut commands = Vec::new();
    if let Some(special) = special {
        match special_commands(special, &targets, context, state, rng)? {
            Ok(special_commands) => commands.extend(special_commands),
            Err(reason) => return Ok(vec![context.fail(reason)]),
        }
    }

    // Paid only once the move is known to work.
    if let Some(fraction) = hp_cost {
        let cost = user.hp_fraction(*fraction);
        if user.current_hp <= cost {
            return Ok(vec![context.fail(FailureReason::NotEnoughHp)]);
        }
        commands.insert(
            0,
            BattleCommand::IndirectDamage {
                target: context.user,
                amount: cost,
                cause: DamageCause::HpCost,
            },
        );
    }

    for &target in &targets {
        commands.extend(stat_change_commands(target, stats, context, state));
    }
    if let Some(rider) = side_effect {
        commands.extend(rider_commands(rider, context, state, rng)?);
    }
    if *user_faints {
        commands.push(BattleCommand::Faint {
            target: context.user,
        });
    }
    if *switch_out {
        let bench = state.side(context.user.side).able_bench_slots();
        if let Some(&slot) = bench.first() {
            commands.extend(switch_in_commands(
                context.registry,
                state,
                context.user.side,
                slot,
                rng,
            )?);
        }
    }
    Ok(commands)
}

/// Commands for the non-additive stage manipulations, or the reason the move
/// fails.
fn special_commands(
    special: &StatSpecial,
    targets: &[CombatantRef],
    context: &EffectContext,
    state: &BattleState,
    rng: &mut dyn BattleRng,
) -> EngineResult<Result<Vec<BattleCommand>, FailureReason>> {
    let user = state.combatant(context.user)?;
    let opponent = state.combatant(context.target)?;
    let mut commands = Vec::new();

    match special {
        StatSpecial::ResetAll => {
            for &target in targets {
                let combatant = state.combatant(target)?;
                for (stat, stage) in combatant.stages.iter() {
                    if stage != 0 {
                        commands.push(BattleCommand::SetStatStage {
                            target,
                            stat,
                            stage: 0,
                        });
                    }
                }
            }
        }
        StatSpecial::SwapStages(stats) => {
            for &stat in stats {
                commands.push(BattleCommand::SetStatStage {
                    target: context.user,
                    stat,
                    stage: opponent.stages.get(stat),
                });
                commands.push(BattleCommand::SetStatStage {
                    target: context.target,
                    stat,
                    stage: user.stages.get(stat),
                });
            }
        }
        StatSpecial::CopyStages => {
            for (stat, stage) in opponent.stages.iter() {
                commands.push(BattleCommand::SetStatStage {
                    target: context.user,
                    stat,
                    stage,
                });
            }
        }
        StatSpecial::InvertStages => {
            for &target in targets {
                let combatant = state.combatant(target)?;
                if combatant.stages.is_neutral() {
                    return Ok(Err(FailureReason::ConditionNotMet));
                }
                for (stat, stage) in combatant.stages.iter() {
                    if stage != 0 {
                        commands.push(BattleCommand::SetStatStage {
                            target,
                            stat,
                            stage: -stage,
                        });
                    }
                }
            }
        }
        StatSpecial::RandomBoost { stages } => {
            let candidates: Vec<StatKind> = StatKind::ALL
                .into_iter()
                .filter(|&stat| user.stages.get(stat) < MAX_STAGE)
                .collect();
            if candidates.is_empty() {
                return Ok(Err(FailureReason::StatAtLimit));
            }
            let stat = candidates[rng.pick_index(candidates.len(), "random stat boost")];
            commands.push(BattleCommand::ChangeStatStage {
                target: context.user,
                stat,
                delta: *stages,
            });
        }
        StatSpecial::ClearNegative => {
            for (stat, stage) in user.stages.iter() {
                if stage < 0 {
                    commands.push(BattleCommand::SetStatStage {
                        target: context.user,
                        stat,
                        stage: 0,
                    });
                }
            }
        }
        StatSpecial::Maximize(stat) => {
            if user.stages.get(*stat) >= MAX_STAGE {
                return Ok(Err(FailureReason::StatAtLimit));
            }
            commands.push(BattleCommand::SetStatStage {
                target: context.user,
                stat: *stat,
                stage: MAX_STAGE,
            });
        }
        StatSpecial::AverageRaw(stats) => {
            for &stat in stats {
                let mine = user.stats.get(stat).unwrap_or(0) as u32;
                let theirs = opponent.stats.get(stat).unwrap_or(0) as u32;
                let value = ((mine + theirs) / 2) as u16;
                for target in [context.user, context.target] {
                    commands.push(BattleCommand::SetRawStat {
                        target,
                        stat,
                        value,
                    });
                }
            }
        }
        StatSpecial::SwapRaw(first, second) => {
            let (Some(a), Some(b)) = (user.stats.get(*first), user.stats.get(*second)) else {
                return Ok(Err(FailureReason::ConditionNotMet));
            };
            commands.push(BattleCommand::SetRawStat {
                target: context.user,
                stat: *first,
                value: b,
            });
            commands.push(BattleCommand::SetRawStat {
                target: context.user,
                stat: *second,
                value: a,
            });
        }
        StatSpecial::StrengthSap => {
            if opponent.stages.get(StatKind::Attack) <= MIN_STAGE {
                return Ok(Err(FailureReason::StatAtLimit));
            }
            let amount = effective_stat(opponent, StatKind::Attack) as u16;
            if !user.has_status(StatusKind::HealBlock) {
                commands.push(BattleCommand::Heal {
                    target: context.user,
                    amount,
                });
            }
        }
    }
    Ok(Ok(commands))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::battle::state::{BattleEvent, FailureReason};
    use crate::combatant::ActiveStatus;
    use pretty_assertions::assert_eq;
    use schema::{SideCondition, StatKind, StatusKind};

    #[test]
    fn test_swords_dance_clamps_at_six() {
        let mut state = create_test_battle_state();
        state.sides[0].team[0].stages.set(StatKind::Attack, 5);
        let events = use_move(&mut state, "Swords Dance", vec![]);
        assert_eq!(state.sides[0].team[0].stages.get(StatKind::Attack), 6);
        assert!(events.contains(&BattleEvent::StatModified {
            target: user_ref(),
            stat: StatKind::Attack,
            new_stage: 6,
        }));
    }

    #[test]
    fn test_mist_blocks_opposing_drops() {
        let mut state = create_test_battle_state();
        state.sides[1].conditions.insert(SideCondition::Mist, 5);
        let events = use_move(&mut state, "Growl", vec![]);
        assert_eq!(state.sides[1].team[0].stages.get(StatKind::Attack), 0);
        assert!(events.contains(&BattleEvent::StatChangeBlocked {
            target: target_ref(),
            stat: StatKind::Attack,
            reason: FailureReason::Mist,
        }));
    }

    #[test]
    fn test_belly_drum_costs_half_and_maximizes() {
        let mut state = create_test_battle_state();
        use_move(&mut state, "Belly Drum", vec![]);
        let user = &state.sides[0].team[0];
        assert_eq!(user.current_hp, 80);
        assert_eq!(user.stages.get(StatKind::Attack), 6);

        // 80 HP left is not more than the 80 HP cost.
        state.sides[0].team[0].stages.reset();
        let events = use_move(&mut state, "Belly Drum", vec![]);
        assert_eq!(failure(&events), Some(FailureReason::NotEnoughHp));
        assert_eq!(state.sides[0].team[0].current_hp, 80);
    }

    #[test]
    fn test_haze_resets_both_sides() {
        let mut state = create_test_battle_state();
        state.sides[0].team[0].stages.set(StatKind::Speed, -3);
        state.sides[1].team[0].stages.set(StatKind::Attack, 4);
        use_move(&mut state, "Haze", vec![]);
        assert!(state.sides[0].team[0].stages.is_neutral());
        assert!(state.sides[1].team[0].stages.is_neutral());
    }

    #[test]
    fn test_acupressure_picks_from_unmaxed_stats() {
        let mut state = create_test_battle_state();
        state.sides[0].team[0].stages.set(StatKind::Attack, 6);
        // ALL minus Attack leaves six candidates; 0.0 picks Defense.
        use_move(&mut state, "Acupressure", vec![0.0]);
        assert_eq!(state.sides[0].team[0].stages.get(StatKind::Defense), 2);
    }

    #[test]
    fn test_strength_sap_heals_by_target_attack() {
        let mut state = create_test_battle_state();
        state.sides[0].team[0].current_hp = 20;
        use_move(&mut state, "Strength Sap", vec![]);
        assert_eq!(state.sides[0].team[0].current_hp, 120);
        assert_eq!(state.sides[1].team[0].stages.get(StatKind::Attack), -1);
    }

    #[test]
    fn test_venom_drench_needs_poisoned_target() {
        let mut state = create_test_battle_state();
        let events = use_move(&mut state, "Venom Drench", vec![]);
        assert_eq!(failure(&events), Some(FailureReason::ConditionNotMet));

        state.sides[1].team[0].primary = Some(ActiveStatus::new(StatusKind::Poison, None));
        use_move(&mut state, "Venom Drench", vec![]);
        assert_eq!(state.sides[1].team[0].stages.get(StatKind::Speed), -1);
    }

    #[test]
    fn test_swagger_confuses() {
        let mut state = create_test_battle_state();
        use_move(&mut state, "Swagger", vec![0.0]);
        let target = &state.sides[1].team[0];
        assert_eq!(target.stages.get(StatKind::Attack), 2);
        assert!(target.has_status(StatusKind::Confusion));
    }

    #[test]
    fn test_memento_faints_user() {
        let mut state = create_test_battle_state();
        use_move(&mut state, "Memento", vec![]);
        assert!(state.sides[0].team[0].is_fainted());
        assert_eq!(state.sides[1].team[0].stages.get(StatKind::Attack), -2);
    }

    #[test]
    fn test_parting_shot_switches_user_out() {
        let mut state = create_test_battle_state();
        use_move(&mut state, "Parting Shot", vec![]);
        assert_eq!(state.sides[0].active, 1);
        assert_eq!(state.sides[1].team[0].stages.get(StatKind::SpecialAttack), -1);
    }

    #[test]
    fn test_power_trick_swaps_raw_stats() {
        let mut state = create_test_battle_state();
        state.sides[0].team[0].stats.attack = 120;
        state.sides[0].team[0].stats.defense = 60;
        use_move(&mut state, "Power Trick", vec![]);
        assert_eq!(state.sides[0].team[0].stats.attack, 60);
        assert_eq!(state.sides[0].team[0].stats.defense, 120);
    }
}
