// --- IMPORTS ---
use super::stat_effects::rider_commands;
use super::{unmet_condition, EffectContext};
use crate::battle::commands::BattleCommand;
use crate::battle::conditions::{cure_primary, try_inflict, StatusCheck};
use crate::battle::rng::BattleRng;
use crate::battle::state::{BattleState, CombatantRef, FailureReason};
use crate::combatant::{ActiveStatus, Combatant, PendingEffect};
use crate::errors::EngineResult;
use crate::move_catalog::{CureScope, HealAmount, MoveEffectDescriptor, StatusRider};
use schema::{StatKind, StatusKind};
use tracing::debug;

/// HP a heal restores for `recipient` under the current field.
fn heal_amount(amount: &HealAmount, recipient: &Combatant, state: &BattleState) -> u16 {
    let fraction = match amount {
        HealAmount::Fraction(fraction) => *fraction,
        HealAmount::Full => return recipient.max_hp(),
        HealAmount::ByWeather { default, weather } => {
            weather.get(&state.field.weather).copied().unwrap_or(*default)
        }
        HealAmount::ByTerrain { default, terrain } => {
            terrain.get(&state.field.terrain).copied().unwrap_or(*default)
        }
        HealAmount::ByStockpile(steps) => {
            let stacks = recipient.stacks(StatusKind::Stockpile) as usize;
            match stacks.checked_sub(1) {
                Some(index) => steps
                    .get(index)
                    .or(steps.last())
                    .copied()
                    .unwrap_or(0.0),
                None => 0.0,
            }
        }
    };
    recipient.hp_fraction(fraction)
}

/// Commands that cure the statuses `scope` covers.
fn cure_commands(
    scope: CureScope,
    context: &EffectContext,
    state: &BattleState,
) -> EngineResult<Vec<BattleCommand>> {
    let refs: Vec<CombatantRef> = match scope {
        CureScope::User => vec![context.user],
        CureScope::Target => vec![context.target],
        CureScope::Team => (0..state.side(context.user.side).team.len())
            .map(|slot| CombatantRef::new(context.user.side, slot))
            .collect(),
    };
    let mut commands = Vec::new();
    for target in refs {
        let combatant = state.combatant(target)?;
        if combatant.is_fainted() {
            continue;
        }
        if let Some(command) = cure_primary(context.registry, combatant, target)? {
            commands.push(command);
        }
    }
    Ok(commands)
}

/// Apply a healing move.
pub(super) fn apply_healing(
    descriptor: &MoveEffectDescriptor,
    context: &EffectContext,
    state: &BattleState,
    rng: &mut dyn BattleRng,
) -> EngineResult<Vec<BattleCommand>> {
    let MoveEffectDescriptor::Healing {
        amount,
        recipient,
        cure,
        sacrifice,
        delay,
        user_status,
        condition,
    } = descriptor
    else {
        return Ok(Vec::new());
    };

    if let Some(failure) = unmet_condition(condition.as_ref(), context, state)? {
        return Ok(vec![failure]);
    }
    let user = state.combatant(context.user)?;

    if *sacrifice {
        if state.side(context.user.side).able_bench_slots().is_empty() {
            return Ok(vec![context.fail(FailureReason::NoReplacement)]);
        }
        return Ok(vec![
            BattleCommand::Faint {
                target: context.user,
            },
            BattleCommand::SetHealingWish {
                side: context.user.side,
                pending: true,
            },
        ]);
    }

    if let Some(turns) = delay {
        return delayed_heal(amount, *turns, context, state, rng);
    }

    let recipients = context.resolve(*recipient);
    let cures = match cure {
        Some(scope) => cure_commands(*scope, context, state)?,
        None => Vec::new(),
    };

    let mut heals = Vec::new();
    for &target in &recipients {
        let combatant = state.combatant(target)?;
        if combatant.is_fainted() {
            return Ok(vec![context.fail(FailureReason::NoTarget)]);
        }
        let restored = heal_amount(amount, combatant, state);
        if restored == 0 || combatant.current_hp >= combatant.max_hp() {
            continue;
        }
        if combatant.has_status(StatusKind::HealBlock) {
            return Ok(vec![context.fail(FailureReason::HealBlocked)]);
        }
        heals.push(BattleCommand::Heal {
            target,
            amount: restored,
        });
    }

    if heals.is_empty() && cures.is_empty() {
        let reason = if cure.is_some() {
            FailureReason::ConditionNotMet
        } else {
            FailureReason::FullHp
        };
        return Ok(vec![context.fail(reason)]);
    }

    let mut commands = cures;
    let cured_user_primary = commands.iter().any(|command| {
        matches!(command, BattleCommand::CureStatus { target, .. } if *target == context.user)
    });
    commands.extend(heals);

    if let HealAmount::ByStockpile(_) = amount {
        commands.extend(release_stockpile(user, context.user));
    }
    if let Some(rider) = user_status {
        commands.extend(user_status_commands(
            rider,
            cured_user_primary,
            context,
            state,
            rng,
        )?);
    }
    Ok(commands)
}

/// Spending the stockpile clears it along with the defenses it granted.
fn release_stockpile(user: &Combatant, target: CombatantRef) -> Vec<BattleCommand> {
    let stacks = user.stacks(StatusKind::Stockpile) as i8;
    let mut commands = vec![BattleCommand::RemoveStatus {
        target,
        kind: StatusKind::Stockpile,
    }];
    for stat in [StatKind::Defense, StatKind::SpecialDefense] {
        commands.push(BattleCommand::ChangeStatStage {
            target,
            stat,
            delta: -stacks,
        });
    }
    commands
}

/// A status the user puts on itself as part of healing. When the same move
/// just cleared the user's primary, a new primary replaces it directly.
fn user_status_commands(
    rider: &StatusRider,
    cleared_primary: bool,
    context: &EffectContext,
    state: &BattleState,
    rng: &mut dyn BattleRng,
) -> EngineResult<Vec<BattleCommand>> {
    let definition = context.registry.get(rider.status)?;
    let user = state.combatant(context.user)?;
    if definition.is_primary() && (cleared_primary || user.primary.is_none()) {
        let remaining = rider
            .duration
            .or_else(|| definition.sample_duration(rng));
        debug!(status = %rider.status, ?remaining, "user puts itself under a status");
        return Ok(vec![BattleCommand::ApplyStatus {
            target: context.user,
            status: ActiveStatus::new(rider.status, remaining),
            primary: true,
        }]);
    }
    rider_commands(rider, context, state, rng)
}

fn delayed_heal(
    amount: &HealAmount,
    turns: u8,
    context: &EffectContext,
    state: &BattleState,
    rng: &mut dyn BattleRng,
) -> EngineResult<Vec<BattleCommand>> {
    let user = state.combatant(context.user)?;
    let restored = heal_amount(amount, user, state);
    let check = try_inflict(
        context.registry,
        state,
        context.user,
        StatusKind::Wish,
        Some(turns),
        None,
        rng,
    )?;
    Ok(match check {
        StatusCheck::Apply(BattleCommand::ApplyStatus {
            target,
            status,
            primary,
        }) => vec![BattleCommand::ApplyStatus {
            target,
            status: status.with_pending(PendingEffect::Heal { amount: restored }),
            primary,
        }],
        StatusCheck::Apply(other) => vec![other],
        StatusCheck::Fail(reason) => vec![context.fail(reason)],
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::battle::state::FailureReason;
    use crate::combatant::{ActiveStatus, PendingEffect};
    use pretty_assertions::assert_eq;
    use schema::{StatKind, StatusKind, Weather};

    #[test]
    fn test_recover_heals_half() {
        let mut state = create_test_battle_state();
        state.sides[0].team[0].current_hp = 50;
        use_move(&mut state, "Recover", vec![]);
        assert_eq!(state.sides[0].team[0].current_hp, 130);
    }

    #[test]
    fn test_full_hp_fails() {
        let mut state = create_test_battle_state();
        let events = use_move(&mut state, "Recover", vec![]);
        assert_eq!(failure(&events), Some(FailureReason::FullHp));
    }

    #[test]
    fn test_heal_block_stops_healing() {
        let mut state = create_test_battle_state();
        state.sides[0].team[0].current_hp = 50;
        state.sides[0].team[0]
            .volatiles
            .push(ActiveStatus::new(StatusKind::HealBlock, Some(5)));
        let events = use_move(&mut state, "Recover", vec![]);
        assert_eq!(failure(&events), Some(FailureReason::HealBlocked));
        assert_eq!(state.sides[0].team[0].current_hp, 50);
    }

    #[test]
    fn test_synthesis_scales_with_weather() {
        let mut state = create_test_battle_state();
        state.sides[0].team[0].current_hp = 10;
        state.field.weather = Weather::Rain;
        use_move(&mut state, "Synthesis", vec![]);
        assert_eq!(state.sides[0].team[0].current_hp, 50);
    }

    #[test]
    fn test_rest_replaces_status_with_sleep() {
        let mut state = create_test_battle_state();
        state.sides[0].team[0].current_hp = 30;
        state.sides[0].team[0].primary = Some(ActiveStatus::new(StatusKind::Burn, None));
        use_move(&mut state, "Rest", vec![]);
        let user = &state.sides[0].team[0];
        assert_eq!(user.current_hp, 160);
        assert_eq!(user.primary_kind(), Some(StatusKind::Sleep));
        assert_eq!(user.primary.unwrap().remaining, Some(2));
    }

    #[test]
    fn test_swallow_consumes_stockpile() {
        let mut state = create_test_battle_state();
        let events = use_move(&mut state, "Swallow", vec![]);
        assert_eq!(failure(&events), Some(FailureReason::ConditionNotMet));

        use_move(&mut state, "Stockpile", vec![]);
        use_move(&mut state, "Stockpile", vec![]);
        assert_eq!(state.sides[0].team[0].stacks(StatusKind::Stockpile), 2);
        state.sides[0].team[0].current_hp = 40;
        use_move(&mut state, "Swallow", vec![]);

        let user = &state.sides[0].team[0];
        assert_eq!(user.current_hp, 120);
        assert!(!user.has_status(StatusKind::Stockpile));
        assert_eq!(user.stages.get(StatKind::Defense), 0);
    }

    #[test]
    fn test_wish_carries_pending_heal() {
        let mut state = create_test_battle_state();
        use_move(&mut state, "Wish", vec![]);
        let wish = state.sides[0].team[0].status(StatusKind::Wish).unwrap();
        assert_eq!(wish.remaining, Some(2));
        assert_eq!(wish.pending, Some(PendingEffect::Heal { amount: 80 }));
    }

    #[test]
    fn test_heal_bell_cures_bench() {
        let mut state = create_test_battle_state();
        state.sides[0].team[1].primary = Some(ActiveStatus::new(StatusKind::Paralysis, None));
        use_move(&mut state, "Heal Bell", vec![]);
        assert_eq!(state.sides[0].team[1].primary, None);

        let events = use_move(&mut state, "Heal Bell", vec![]);
        assert_eq!(failure(&events), Some(FailureReason::ConditionNotMet));
    }

    #[test]
    fn test_healing_wish_needs_replacement() {
        let mut state = create_test_battle_state();
        use_move(&mut state, "Healing Wish", vec![]);
        assert!(state.sides[0].team[0].is_fainted());
        assert!(state.sides[0].healing_wish);

        let mut state = create_test_battle_state();
        state.sides[0].team[1].current_hp = 0;
        let events = use_move(&mut state, "Healing Wish", vec![]);
        assert_eq!(failure(&events), Some(FailureReason::NoReplacement));
    }
}
