//! Turn resolution: validate the submitted actions, order them, resolve each
//! one, then run the end-of-turn phase.

use crate::battle::action_stack::{ActionStack, BattleAction, ItemKind, QueuedAction, TurnAction};
use crate::battle::calculators::{calculate_attack_outcome, DamageCalculator, DamageHooks, NoHooks};
use crate::battle::commands::{execute_command_batch, BattleCommand};
use crate::battle::conditions::{
    check_action_gate, cure_command, cure_primary, move_restriction, residual_commands,
    switch_blocker,
};
use crate::battle::move_effects::{apply_move_effect, EffectContext};
use crate::battle::rng::BattleRng;
use crate::battle::state::{
    BattleEvent, BattleOutcome, BattleState, CombatantRef, DamageCause, EventBus, FailureReason,
    SideId,
};
use crate::battle::switching::switch_in_commands;
use crate::config::BattleRules;
use crate::errors::{ConfigResult, EngineError, EngineResult};
use crate::field::{residual_damage_fraction, terrain_heal_fraction};
use crate::move_catalog::{MoveEffectCatalog, MoveEffectEntry};
use crate::move_data::MoveData;
use crate::status::{StatusClass, StatusRegistry};
use schema::{SideCondition, StatusKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

static NO_HOOKS: NoHooks = NoHooks;

/// Everything one resolved turn produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReport {
    pub turn: u32,
    pub events: Vec<BattleEvent>,
    pub outcome: BattleOutcome,
}

/// Resolves turns against shared, read-only tables.
///
/// The engine holds no per-battle state, so one instance can serve any number
/// of battles; each battle's turns must still be resolved one at a time.
pub struct TurnEngine<'a> {
    rules: BattleRules,
    registry: &'a StatusRegistry,
    catalog: &'a MoveEffectCatalog,
    hooks: &'a dyn DamageHooks,
}

impl TurnEngine<'static> {
    /// Engine over the shipped rules, status registry and move catalog.
    pub fn standard() -> ConfigResult<Self> {
        Ok(Self::new(
            BattleRules::standard()?,
            StatusRegistry::standard()?,
            MoveEffectCatalog::standard()?,
        ))
    }
}

impl<'a> TurnEngine<'a> {
    pub fn new(
        rules: BattleRules,
        registry: &'a StatusRegistry,
        catalog: &'a MoveEffectCatalog,
    ) -> Self {
        Self {
            rules,
            registry,
            catalog,
            hooks: &NO_HOOKS,
        }
    }

    /// Route damage through external ability and item effects.
    pub fn with_hooks(mut self, hooks: &'a dyn DamageHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn rules(&self) -> &BattleRules {
        &self.rules
    }

    pub fn registry(&self) -> &StatusRegistry {
        self.registry
    }

    pub fn catalog(&self) -> &MoveEffectCatalog {
        self.catalog
    }

    /// Resolve one full turn.
    ///
    /// `actions` must hold exactly one action per side. Resolution runs on a
    /// copy of `state`; the copy replaces `state` only if the whole turn
    /// succeeds, so an error leaves the caller's state untouched.
    pub fn resolve_turn(
        &self,
        state: &mut BattleState,
        actions: &[(SideId, TurnAction)],
        rng: &mut dyn BattleRng,
    ) -> EngineResult<TurnReport> {
        if state.outcome.is_over() {
            return Err(EngineError::BattleOver);
        }
        let span = info_span!("turn", turn_number = state.turn_number);
        let _guard = span.enter();

        state.validate()?;
        self.validate_actions(state, actions)?;

        let mut working = state.clone();
        let mut bus = EventBus::new();
        let turn = working.turn_number;
        bus.push(BattleEvent::TurnStarted { turn });

        let mut action_stack = ActionStack::build_initial(&working, actions, self.catalog, &self.rules)?;
        debug!(order = ?action_stack.order(), "action order");

        while let Some(queued) = action_stack.pop_front() {
            self.execute_battle_action(queued, &mut working, &mut bus, rng)?;
            if self.check_win_conditions(&mut working, &mut bus)? {
                break;
            }
        }

        if !working.outcome.is_over() {
            self.execute_end_turn_phase(&mut working, &mut bus, rng)?;
            self.check_win_conditions(&mut working, &mut bus)?;
        }

        bus.push(BattleEvent::TurnEnded { turn });
        working.turn_number += 1;
        info!(outcome = ?working.outcome, events = bus.len(), "turn resolved");

        *state = working;
        Ok(TurnReport {
            turn,
            events: bus.into_events(),
            outcome: state.outcome,
        })
    }

    // --- Validation ---

    fn validate_actions(
        &self,
        state: &BattleState,
        actions: &[(SideId, TurnAction)],
    ) -> EngineResult<()> {
        for side in SideId::ALL {
            let submitted: Vec<&TurnAction> = actions
                .iter()
                .filter(|(acting, _)| *acting == side)
                .map(|(_, action)| action)
                .collect();
            let action = match submitted.as_slice() {
                [] => return Err(EngineError::MissingAction(side)),
                [action] => *action,
                _ => {
                    return Err(EngineError::InvalidAction(format!(
                        "{side} submitted more than one action"
                    )))
                }
            };
            let active = state.active(side)?;
            if active.is_fainted() && !matches!(action, TurnAction::Switch { .. }) {
                return Err(EngineError::InvalidAction(format!(
                    "{side} must replace its fainted combatant"
                )));
            }
            if let TurnAction::Switch { slot } = action {
                let incoming = state.combatant(CombatantRef::new(side, *slot))?;
                if *slot == state.side(side).active || incoming.is_fainted() {
                    return Err(EngineError::InvalidCombatant { side, slot: *slot });
                }
            }
        }
        Ok(())
    }

    // --- Action execution ---

    fn execute_battle_action(
        &self,
        queued: QueuedAction<'_>,
        state: &mut BattleState,
        bus: &mut EventBus,
        rng: &mut dyn BattleRng,
    ) -> EngineResult<()> {
        let side = queued.side;
        let actor = state.active_ref(side);
        let actor_fainted = state.combatant(actor)?.is_fainted();

        match queued.action {
            BattleAction::Switch(slot) => self.execute_switch(side, slot, state, bus, rng),
            // A combatant that fainted earlier this turn loses its action.
            _ if actor_fainted => {
                debug!(%side, "actor fainted before acting");
                Ok(())
            }
            BattleAction::Flee => execute_flee(side, state, bus),
            BattleAction::Skip => execute_command_batch(
                vec![BattleCommand::EmitEvent(BattleEvent::ActionSkipped { actor })],
                state,
                bus,
            ),
            BattleAction::Item(item) => self.execute_item(actor, item, state, bus),
            BattleAction::Attack(move_data) => {
                if !self.pass_action_gate(actor, state, bus, rng)? {
                    return Ok(());
                }
                self.execute_attack(actor, &move_data, state, bus, rng)
            }
            BattleAction::Effect(entry) => {
                if !self.pass_action_gate(actor, state, bus, rng)? {
                    return Ok(());
                }
                self.execute_effect(actor, entry, state, bus, rng)
            }
        }
    }

    /// Statuses that can stop a move get their roll here. Returns whether the
    /// actor goes on to act.
    fn pass_action_gate(
        &self,
        actor: CombatantRef,
        state: &mut BattleState,
        bus: &mut EventBus,
        rng: &mut dyn BattleRng,
    ) -> EngineResult<bool> {
        let gate = check_action_gate(self.registry, state, actor, rng)?;
        execute_command_batch(gate.commands, state, bus)?;
        Ok(gate.acts && !state.combatant(actor)?.is_fainted())
    }

    fn execute_attack(
        &self,
        actor: CombatantRef,
        move_data: &MoveData,
        state: &mut BattleState,
        bus: &mut EventBus,
        rng: &mut dyn BattleRng,
    ) -> EngineResult<()> {
        let attacker = state.combatant(actor)?;
        if let Some(reason) = move_restriction(attacker, &move_data.name, false) {
            return execute_command_batch(
                vec![move_failed(actor, &move_data.name, reason)],
                state,
                bus,
            );
        }
        let defender = state.active_ref(actor.side.opponent());
        let calculator = DamageCalculator::new(&self.rules);
        let commands = calculate_attack_outcome(
            state,
            actor,
            defender,
            move_data,
            &calculator,
            self.registry,
            self.hooks,
            rng,
        )?;
        execute_command_batch(commands, state, bus)
    }

    fn execute_effect(
        &self,
        actor: CombatantRef,
        entry: &MoveEffectEntry,
        state: &mut BattleState,
        bus: &mut EventBus,
        rng: &mut dyn BattleRng,
    ) -> EngineResult<()> {
        let user = state.combatant(actor)?;
        if let Some(reason) = move_restriction(user, &entry.name, true) {
            return execute_command_batch(vec![move_failed(actor, &entry.name, reason)], state, bus);
        }
        let target = state.active_ref(actor.side.opponent());
        let context = EffectContext::new(actor, target, &entry.name, self.registry, &self.rules);
        let commands = apply_move_effect(entry, &context, state, rng)?;
        execute_command_batch(commands, state, bus)
    }

    fn execute_switch(
        &self,
        side: SideId,
        slot: usize,
        state: &mut BattleState,
        bus: &mut EventBus,
        rng: &mut dyn BattleRng,
    ) -> EngineResult<()> {
        let outgoing = state.active(side)?;
        if !outgoing.is_fainted() {
            if let Some(kind) = switch_blocker(outgoing) {
                debug!(%side, %kind, "switch blocked");
                bus.push(BattleEvent::SwitchFailed {
                    side,
                    reason: FailureReason::Trapped,
                });
                return Ok(());
            }
        }
        let incoming = state.combatant(CombatantRef::new(side, slot))?;
        if incoming.is_fainted() || slot == state.side(side).active {
            bus.push(BattleEvent::SwitchFailed {
                side,
                reason: FailureReason::NoReplacement,
            });
            return Ok(());
        }
        let commands = switch_in_commands(self.registry, state, side, slot, rng)?;
        execute_command_batch(commands, state, bus)
    }

    fn execute_item(
        &self,
        actor: CombatantRef,
        item: ItemKind,
        state: &mut BattleState,
        bus: &mut EventBus,
    ) -> EngineResult<()> {
        let user = state.combatant(actor)?;
        let failed = |reason| BattleCommand::EmitEvent(BattleEvent::ItemFailed {
            user: actor,
            item,
            reason,
        });
        if user.has_status(StatusKind::Embargo) {
            return execute_command_batch(vec![failed(FailureReason::Embargoed)], state, bus);
        }

        let mut effects = Vec::new();
        if let Some(amount) = item.heal_amount(user.max_hp()) {
            if user.current_hp < user.max_hp() {
                effects.push(BattleCommand::Heal {
                    target: actor,
                    amount,
                });
            }
        }
        if item.cures_status() {
            effects.extend(cure_primary(self.registry, user, actor)?);
            effects.extend(cure_command(self.registry, user, actor, StatusKind::Confusion)?);
        }
        if effects.is_empty() {
            return execute_command_batch(vec![failed(FailureReason::FullHp)], state, bus);
        }

        let mut commands = vec![BattleCommand::EmitEvent(BattleEvent::ItemUsed {
            user: actor,
            item,
        })];
        commands.extend(effects);
        execute_command_batch(commands, state, bus)
    }

    // --- End of turn ---

    /// Residual statuses, weather, terrain, then every countdown.
    fn execute_end_turn_phase(
        &self,
        state: &mut BattleState,
        bus: &mut EventBus,
        rng: &mut dyn BattleRng,
    ) -> EngineResult<()> {
        for class in [StatusClass::Primary, StatusClass::Volatile] {
            for side in SideId::ALL {
                let target = state.active_ref(side);
                if state.combatant(target)?.is_fainted() {
                    continue;
                }
                let commands = residual_commands(self.registry, state, target, class, rng)?;
                execute_command_batch(commands, state, bus)?;
            }
        }

        let weather = state.field.weather;
        let terrain_heal = terrain_heal_fraction(state.field.terrain);
        for side in SideId::ALL {
            let target = state.active_ref(side);
            let combatant = state.combatant(target)?;
            if combatant.is_fainted() {
                continue;
            }
            let mut commands = Vec::new();
            let damage =
                combatant.hp_fraction(residual_damage_fraction(weather, &combatant.defending_types()));
            if damage > 0 {
                commands.push(BattleCommand::IndirectDamage {
                    target,
                    amount: damage,
                    cause: DamageCause::Weather(weather),
                });
            }
            let heal = combatant.hp_fraction(terrain_heal);
            if heal > 0 && !combatant.has_status(StatusKind::HealBlock) {
                commands.push(BattleCommand::Heal {
                    target,
                    amount: heal,
                });
            }
            execute_command_batch(commands, state, bus)?;
        }

        for change in state.field.tick() {
            bus.push(BattleEvent::FieldChanged {
                kind: change.kind,
                remaining: change.remaining,
            });
        }

        for side in SideId::ALL {
            let expired = tick_side_conditions(state, side);
            let commands = expired
                .into_iter()
                .map(|condition| BattleCommand::RemoveSideCondition { side, condition })
                .collect();
            execute_command_batch(commands, state, bus)?;
        }
        Ok(())
    }

    /// Record the outcome once it is decided. Returns whether the battle is over.
    fn check_win_conditions(&self, state: &mut BattleState, bus: &mut EventBus) -> EngineResult<bool> {
        if state.outcome.is_over() {
            return Ok(true);
        }
        let outcome = state.judge_outcome();
        if outcome.is_over() {
            execute_command_batch(vec![BattleCommand::SetOutcome(outcome)], state, bus)?;
            return Ok(true);
        }
        Ok(false)
    }
}

fn move_failed(user: CombatantRef, move_name: &str, reason: FailureReason) -> BattleCommand {
    BattleCommand::EmitEvent(BattleEvent::MoveFailed {
        user,
        move_name: move_name.to_string(),
        reason,
    })
}

fn execute_flee(side: SideId, state: &mut BattleState, bus: &mut EventBus) -> EngineResult<()> {
    let runner = state.active(side)?;
    if let Some(kind) = switch_blocker(runner) {
        debug!(%side, %kind, "flee blocked");
        bus.push(BattleEvent::FleeFailed {
            side,
            reason: FailureReason::Trapped,
        });
        return Ok(());
    }
    execute_command_batch(
        vec![
            BattleCommand::EmitEvent(BattleEvent::Fled { side }),
            BattleCommand::SetOutcome(BattleOutcome::Fled(side)),
        ],
        state,
        bus,
    )
}

/// Count down every side condition, returning the ones that run out.
fn tick_side_conditions(state: &mut BattleState, side: SideId) -> Vec<SideCondition> {
    let mut expired = Vec::new();
    for (condition, turns) in state.side_mut(side).conditions.iter_mut() {
        if *turns <= 1 {
            expired.push(*condition);
        } else {
            *turns -= 1;
        }
    }
    expired
}
