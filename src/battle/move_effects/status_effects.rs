// --- IMPORTS ---
use super::{unmet_condition, EffectContext};
use crate::battle::commands::BattleCommand;
use crate::battle::conditions::{try_inflict, StatusCheck};
use crate::battle::rng::BattleRng;
use crate::battle::state::{BattleEvent, BattleState, FailureReason};
use crate::battle::stats::move_hits;
use crate::combatant::PendingEffect;
use crate::errors::EngineResult;
use crate::move_catalog::MoveEffectDescriptor;
use schema::StatusKind;

/// Apply a status affliction move.
pub(super) fn apply_status_affliction(
    descriptor: &MoveEffectDescriptor,
    context: &EffectContext,
    state: &BattleState,
    rng: &mut dyn BattleRng,
) -> EngineResult<Vec<BattleCommand>> {
    let MoveEffectDescriptor::StatusAffliction {
        status,
        duration,
        accuracy,
        delay,
        condition,
        includes_user,
    } = descriptor
    else {
        return Ok(Vec::new());
    };

    let user = state.combatant(context.user)?;
    let target = state.combatant(context.target)?;
    if target.is_fainted() {
        return Ok(vec![context.fail(FailureReason::NoTarget)]);
    }
    if let Some(failure) = unmet_condition(condition.as_ref(), context, state)? {
        return Ok(vec![failure]);
    }
    if target.substitute_hp > 0 {
        return Ok(vec![context.fail(FailureReason::NoTarget)]);
    }
    if !move_hits(user, target, *accuracy, state.field.weather, rng) {
        return Ok(vec![BattleCommand::EmitEvent(BattleEvent::MoveMissed {
            user: context.user,
            move_name: context.move_name.to_string(),
        })]);
    }

    let source = Some(context.user.side);
    let mut commands = Vec::new();
    let check = match delay {
        Some(turns) => delayed_check(*status, *duration, *turns, context, state, rng)?,
        None => try_inflict(
            context.registry,
            state,
            context.target,
            *status,
            *duration,
            source,
            rng,
        )?,
    };
    match check {
        StatusCheck::Apply(command) => commands.push(command),
        StatusCheck::Fail(reason) => return Ok(vec![context.fail(reason)]),
    }

    if *includes_user {
        let check = try_inflict(
            context.registry,
            state,
            context.user,
            *status,
            *duration,
            source,
            rng,
        )?;
        if let StatusCheck::Apply(command) = check {
            commands.push(command);
        }
    }
    Ok(commands)
}

/// Drowsiness that turns into `status` after `turns` end-of-turn ticks.
fn delayed_check(
    status: StatusKind,
    duration: Option<u8>,
    turns: u8,
    context: &EffectContext,
    state: &BattleState,
    rng: &mut dyn BattleRng,
) -> EngineResult<StatusCheck> {
    let target = state.combatant(context.target)?;
    if context.registry.get(status)?.is_primary() && target.primary.is_some() {
        return Ok(StatusCheck::Fail(FailureReason::AlreadyAffected));
    }
    // The eventual status must be able to land now, or the wait is pointless.
    if let StatusCheck::Fail(reason) = try_inflict(
        context.registry,
        state,
        context.target,
        status,
        Some(1),
        Some(context.user.side),
        rng,
    )? {
        return Ok(StatusCheck::Fail(reason));
    }

    let check = try_inflict(
        context.registry,
        state,
        context.target,
        StatusKind::Drowsy,
        Some(turns),
        Some(context.user.side),
        rng,
    )?;
    Ok(match check {
        StatusCheck::Apply(BattleCommand::ApplyStatus {
            target,
            status: drowsy,
            primary,
        }) => StatusCheck::Apply(BattleCommand::ApplyStatus {
            target,
            status: drowsy.with_pending(PendingEffect::Inflict { status, duration }),
            primary,
        }),
        other => other,
    })
}
