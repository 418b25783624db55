use crate::battle::state::{
    BattleEvent, BattleOutcome, BattleState, CombatantRef, DamageCause, EventBus, FailureReason,
    SideId,
};
use crate::combatant::{ActiveStatus, Combatant};
use crate::errors::EngineResult;
use crate::move_catalog::ContactEffect;
use schema::{Hazard, SideCondition, StatKind, StatusKind, Terrain, Weather};
use tracing::debug;

/// Atomic commands representing final state changes. Effect resolvers decide
/// what should happen against a read-only state and return commands; only the
/// executor mutates the battle and emits the matching events.
#[derive(Debug, Clone, PartialEq)]
pub enum BattleCommand {
    // Hit points
    DealDamage {
        target: CombatantRef,
        amount: u16,
        effectiveness: f64,
    },
    DamageSubstitute {
        target: CombatantRef,
        amount: u16,
    },
    IndirectDamage {
        target: CombatantRef,
        amount: u16,
        cause: DamageCause,
    },
    TickDamage {
        target: CombatantRef,
        kind: StatusKind,
        amount: u16,
    },
    Heal {
        target: CombatantRef,
        amount: u16,
    },
    Faint {
        target: CombatantRef,
    },

    // Statuses
    ApplyStatus {
        target: CombatantRef,
        status: ActiveStatus,
        primary: bool,
    },
    /// Replace an existing instance in place without an event.
    UpdateStatus {
        target: CombatantRef,
        status: ActiveStatus,
    },
    RemoveStatus {
        target: CombatantRef,
        kind: StatusKind,
    },
    CureStatus {
        target: CombatantRef,
        kind: StatusKind,
    },

    // Stats
    ChangeStatStage {
        target: CombatantRef,
        stat: StatKind,
        delta: i8,
    },
    SetStatStage {
        target: CombatantRef,
        stat: StatKind,
        stage: i8,
    },
    SetRawStat {
        target: CombatantRef,
        stat: StatKind,
        value: u16,
    },

    // Per-combatant battle state
    SetSubstitute {
        target: CombatantRef,
        hp: u16,
    },
    SetGuard {
        target: CombatantRef,
        contact: Option<ContactEffect>,
    },
    SetLastMove {
        target: CombatantRef,
        name: String,
    },

    // Field and sides
    SetWeather {
        weather: Weather,
        turns: Option<u8>,
    },
    SetTerrain {
        terrain: Terrain,
        turns: Option<u8>,
    },
    AddHazard {
        side: SideId,
        hazard: Hazard,
    },
    /// Drop one hazard entirely, as when a Poison type absorbs Toxic Spikes.
    RemoveHazard {
        side: SideId,
        hazard: Hazard,
    },
    ClearHazards {
        side: SideId,
    },
    AddSideCondition {
        side: SideId,
        condition: SideCondition,
        turns: u8,
    },
    RemoveSideCondition {
        side: SideId,
        condition: SideCondition,
    },
    SetHealingWish {
        side: SideId,
        pending: bool,
    },
    SwitchActive {
        side: SideId,
        slot: usize,
    },

    // Battle flow
    SetOutcome(BattleOutcome),
    EmitEvent(BattleEvent),
}

/// Execute a batch of commands in order.
pub fn execute_command_batch(
    commands: Vec<BattleCommand>,
    state: &mut BattleState,
    bus: &mut EventBus,
) -> EngineResult<()> {
    for command in commands {
        execute_command(command, state, bus)?;
    }
    Ok(())
}

/// Helper for commands that operate on a single combatant.
fn with_combatant<F>(target: CombatantRef, state: &mut BattleState, operation: F) -> EngineResult<()>
where
    F: FnOnce(&mut Combatant),
{
    let combatant = state.combatant_mut(target)?;
    operation(combatant);
    Ok(())
}

/// Shared tail of every HP loss: report and faint when HP reaches 0.
fn finish_damage(target: CombatantRef, combatant: &mut Combatant, bus: &mut EventBus) {
    if combatant.is_fainted() {
        debug!(name = %combatant.name, "combatant fainted");
        combatant.faint();
        bus.push(BattleEvent::Fainted { target });
    }
}

fn execute_deal_damage_command(
    target: CombatantRef,
    amount: u16,
    effectiveness: f64,
    state: &mut BattleState,
    bus: &mut EventBus,
) -> EngineResult<()> {
    let combatant = state.combatant_mut(target)?;
    if combatant.is_fainted() {
        return Ok(());
    }
    let mut amount = amount;
    let endured = amount >= combatant.current_hp && combatant.has_status(StatusKind::Enduring);
    if endured {
        amount = combatant.current_hp.saturating_sub(1);
    }
    let dealt = combatant.take_damage(amount);
    bus.push(BattleEvent::DamageDealt {
        target,
        amount: dealt,
        remaining_hp: combatant.current_hp,
        effectiveness,
    });
    if endured {
        bus.push(BattleEvent::Endured { target });
    }
    finish_damage(target, combatant, bus);
    Ok(())
}

fn execute_command(
    command: BattleCommand,
    state: &mut BattleState,
    bus: &mut EventBus,
) -> EngineResult<()> {
    match command {
        BattleCommand::EmitEvent(event) => {
            bus.push(event);
            Ok(())
        }
        BattleCommand::DealDamage {
            target,
            amount,
            effectiveness,
        } => execute_deal_damage_command(target, amount, effectiveness, state, bus),
        BattleCommand::DamageSubstitute { target, amount } => {
            with_combatant(target, state, |combatant| {
                let absorbed = amount.min(combatant.substitute_hp);
                combatant.substitute_hp -= absorbed;
                let broke = combatant.substitute_hp == 0;
                if broke {
                    combatant.remove_status(StatusKind::Substitute);
                }
                bus.push(BattleEvent::SubstituteDamaged {
                    target,
                    amount: absorbed,
                    broke,
                });
            })
        }
        BattleCommand::IndirectDamage {
            target,
            amount,
            cause,
        } => with_combatant(target, state, |combatant| {
            if combatant.is_fainted() {
                return;
            }
            let dealt = combatant.take_damage(amount);
            bus.push(BattleEvent::IndirectDamage {
                target,
                amount: dealt,
                remaining_hp: combatant.current_hp,
                cause,
            });
            finish_damage(target, combatant, bus);
        }),
        BattleCommand::TickDamage {
            target,
            kind,
            amount,
        } => with_combatant(target, state, |combatant| {
            if combatant.is_fainted() {
                return;
            }
            let dealt = combatant.take_damage(amount);
            bus.push(BattleEvent::StatusTicked {
                target,
                kind,
                damage: dealt,
            });
            finish_damage(target, combatant, bus);
        }),
        BattleCommand::Heal { target, amount } => with_combatant(target, state, |combatant| {
            let healed = combatant.heal(amount);
            if healed > 0 {
                bus.push(BattleEvent::Healed {
                    target,
                    amount: healed,
                    remaining_hp: combatant.current_hp,
                });
            }
        }),
        BattleCommand::Faint { target } => with_combatant(target, state, |combatant| {
            if !combatant.is_fainted() {
                combatant.faint();
                bus.push(BattleEvent::Fainted { target });
            }
        }),
        BattleCommand::ApplyStatus {
            target,
            status,
            primary,
        } => with_combatant(target, state, |combatant| {
            if combatant.is_fainted() {
                return;
            }
            if primary {
                combatant.primary = Some(status);
            } else if let Some(existing) = combatant.status_mut(status.kind) {
                *existing = status;
            } else {
                combatant.volatiles.push(status);
            }
            debug!(name = %combatant.name, kind = ?status.kind, remaining = ?status.remaining, "status applied");
            bus.push(BattleEvent::StatusApplied {
                target,
                kind: status.kind,
                duration: status.remaining,
            });
        }),
        BattleCommand::UpdateStatus { target, status } => {
            with_combatant(target, state, |combatant| {
                if let Some(existing) = combatant.status_mut(status.kind) {
                    *existing = status;
                }
            })
        }
        BattleCommand::RemoveStatus { target, kind } => with_combatant(target, state, |combatant| {
            if combatant.remove_status(kind).is_some() {
                bus.push(BattleEvent::StatusEnded { target, kind });
            }
        }),
        BattleCommand::CureStatus { target, kind } => with_combatant(target, state, |combatant| {
            if combatant.remove_status(kind).is_some() {
                bus.push(BattleEvent::StatusCured { target, kind });
            }
        }),
        BattleCommand::ChangeStatStage {
            target,
            stat,
            delta,
        } => with_combatant(target, state, |combatant| {
            // Fainting already reset the stages; later changes in the batch are void.
            if combatant.is_fainted() {
                return;
            }
            let applied = combatant.stages.apply_delta(stat, delta);
            if applied == 0 {
                bus.push(BattleEvent::StatChangeBlocked {
                    target,
                    stat,
                    reason: FailureReason::StatAtLimit,
                });
            } else {
                bus.push(BattleEvent::StatModified {
                    target,
                    stat,
                    new_stage: combatant.stages.get(stat),
                });
            }
        }),
        BattleCommand::SetStatStage {
            target,
            stat,
            stage,
        } => with_combatant(target, state, |combatant| {
            if !combatant.is_fainted() && combatant.stages.get(stat) != stage {
                let new_stage = combatant.stages.set(stat, stage);
                bus.push(BattleEvent::StatModified {
                    target,
                    stat,
                    new_stage,
                });
            }
        }),
        BattleCommand::SetRawStat {
            target,
            stat,
            value,
        } => with_combatant(target, state, |combatant| {
            if !combatant.is_fainted() && combatant.stats.set(stat, value) {
                bus.push(BattleEvent::StatValueChanged {
                    target,
                    stat,
                    value,
                });
            }
        }),
        BattleCommand::SetSubstitute { target, hp } => {
            with_combatant(target, state, |combatant| combatant.substitute_hp = hp)
        }
        BattleCommand::SetGuard { target, contact } => {
            with_combatant(target, state, |combatant| combatant.guard = contact)
        }
        BattleCommand::SetLastMove { target, name } => {
            with_combatant(target, state, |combatant| combatant.last_move = Some(name))
        }
        BattleCommand::SetWeather { weather, turns } => {
            let change = state.field.set_weather(weather, turns);
            bus.push(BattleEvent::FieldChanged {
                kind: change.kind,
                remaining: change.remaining,
            });
            Ok(())
        }
        BattleCommand::SetTerrain { terrain, turns } => {
            let change = state.field.set_terrain(terrain, turns);
            bus.push(BattleEvent::FieldChanged {
                kind: change.kind,
                remaining: change.remaining,
            });
            Ok(())
        }
        BattleCommand::AddHazard { side, hazard } => {
            let layers = state.side_mut(side).hazards.entry(hazard).or_insert(0);
            *layers = (*layers + 1).min(hazard.max_layers());
            let layers = *layers;
            bus.push(BattleEvent::HazardLaid {
                side,
                hazard,
                layers,
            });
            Ok(())
        }
        BattleCommand::RemoveHazard { side, hazard } => {
            let hazards = &mut state.side_mut(side).hazards;
            if hazards.remove(&hazard).is_some() {
                debug!(%side, %hazard, "hazard removed");
                if hazards.is_empty() {
                    bus.push(BattleEvent::HazardsCleared { side });
                }
            }
            Ok(())
        }
        BattleCommand::ClearHazards { side } => {
            let hazards = &mut state.side_mut(side).hazards;
            if !hazards.is_empty() {
                hazards.clear();
                bus.push(BattleEvent::HazardsCleared { side });
            }
            Ok(())
        }
        BattleCommand::AddSideCondition {
            side,
            condition,
            turns,
        } => {
            state.side_mut(side).conditions.insert(condition, turns);
            bus.push(BattleEvent::SideConditionStarted {
                side,
                condition,
                turns,
            });
            Ok(())
        }
        BattleCommand::RemoveSideCondition { side, condition } => {
            if state.side_mut(side).conditions.remove(&condition).is_some() {
                bus.push(BattleEvent::SideConditionEnded { side, condition });
            }
            Ok(())
        }
        BattleCommand::SetHealingWish { side, pending } => {
            state.side_mut(side).healing_wish = pending;
            Ok(())
        }
        BattleCommand::SwitchActive { side, slot } => {
            let incoming = CombatantRef::new(side, slot);
            state.combatant(incoming)?;
            let side_state = state.side_mut(side);
            let from = side_state.active;
            if let Some(outgoing) = side_state.active_combatant_mut() {
                outgoing.clear_volatiles();
            }
            side_state.active = slot;
            bus.push(BattleEvent::Switched {
                side,
                from,
                to: slot,
            });
            Ok(())
        }
        BattleCommand::SetOutcome(outcome) => {
            if state.outcome != outcome {
                state.outcome = outcome;
                bus.push(BattleEvent::BattleEnded { outcome });
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::state::Side;
    use crate::combatant::StatBlock;
    use crate::errors::EngineError;
    use pretty_assertions::assert_eq;
    use schema::MonsterType;

    fn create_test_battle_state() -> BattleState {
        let make = |name: &str| {
            Combatant::new(
                name,
                vec![MonsterType::Normal],
                50,
                StatBlock::new(100, 80, 60, 80, 60, 100),
            )
        };
        BattleState::new(
            Side::new(vec![make("Alpha"), make("Bravo")]),
            Side::new(vec![make("Charlie")]),
        )
    }

    const P1: CombatantRef = CombatantRef {
        side: SideId::Player1,
        slot: 0,
    };
    const P2: CombatantRef = CombatantRef {
        side: SideId::Player2,
        slot: 0,
    };

    #[test]
    fn test_deal_damage_emits_and_faints() {
        let mut state = create_test_battle_state();
        let mut bus = EventBus::new();
        let commands = vec![
            BattleCommand::DealDamage {
                target: P2,
                amount: 30,
                effectiveness: 1.0,
            },
            BattleCommand::DealDamage {
                target: P2,
                amount: 200,
                effectiveness: 1.0,
            },
        ];
        execute_command_batch(commands, &mut state, &mut bus).unwrap();

        assert_eq!(
            bus.events(),
            &[
                BattleEvent::DamageDealt {
                    target: P2,
                    amount: 30,
                    remaining_hp: 70,
                    effectiveness: 1.0
                },
                BattleEvent::DamageDealt {
                    target: P2,
                    amount: 70,
                    remaining_hp: 0,
                    effectiveness: 1.0
                },
                BattleEvent::Fainted { target: P2 },
            ]
        );
        assert!(state.combatant(P2).unwrap().is_fainted());
    }

    #[test]
    fn test_enduring_leaves_one_hp() {
        let mut state = create_test_battle_state();
        let mut bus = EventBus::new();
        state.sides[1].team[0]
            .volatiles
            .push(ActiveStatus::new(StatusKind::Enduring, Some(1)));
        execute_command_batch(
            vec![BattleCommand::DealDamage {
                target: P2,
                amount: 500,
                effectiveness: 1.0,
            }],
            &mut state,
            &mut bus,
        )
        .unwrap();
        assert_eq!(state.combatant(P2).unwrap().current_hp, 1);
        assert!(bus.events().contains(&BattleEvent::Endured { target: P2 }));
    }

    #[test]
    fn test_stat_stage_clamps_and_reports() {
        let mut state = create_test_battle_state();
        let mut bus = EventBus::new();
        state.sides[0].team[0].stages.set(StatKind::Attack, 5);
        let commands = vec![
            BattleCommand::ChangeStatStage {
                target: P1,
                stat: StatKind::Attack,
                delta: 2,
            },
            BattleCommand::ChangeStatStage {
                target: P1,
                stat: StatKind::Attack,
                delta: 1,
            },
        ];
        execute_command_batch(commands, &mut state, &mut bus).unwrap();
        assert_eq!(
            bus.events(),
            &[
                BattleEvent::StatModified {
                    target: P1,
                    stat: StatKind::Attack,
                    new_stage: 6
                },
                BattleEvent::StatChangeBlocked {
                    target: P1,
                    stat: StatKind::Attack,
                    reason: FailureReason::StatAtLimit
                },
            ]
        );
    }

    #[test]
    fn test_stat_commands_ignore_fainted_targets() {
        let mut state = create_test_battle_state();
        let mut bus = EventBus::new();
        let commands = vec![
            BattleCommand::DealDamage {
                target: P2,
                amount: 200,
                effectiveness: 1.0,
            },
            BattleCommand::ChangeStatStage {
                target: P2,
                stat: StatKind::Speed,
                delta: -1,
            },
            BattleCommand::SetStatStage {
                target: P2,
                stat: StatKind::Attack,
                stage: 2,
            },
            BattleCommand::SetRawStat {
                target: P2,
                stat: StatKind::Defense,
                value: 10,
            },
        ];
        execute_command_batch(commands, &mut state, &mut bus).unwrap();

        let fainted = state.combatant(P2).unwrap();
        assert!(fainted.stages.is_neutral());
        assert_eq!(fainted.stats.defense, 60);
        assert_eq!(bus.events().last(), Some(&BattleEvent::Fainted { target: P2 }));
    }

    #[test]
    fn test_switch_clears_outgoing_volatiles() {
        let mut state = create_test_battle_state();
        let mut bus = EventBus::new();
        state.sides[0].team[0]
            .volatiles
            .push(ActiveStatus::new(StatusKind::Confusion, Some(3)));
        state.sides[0].team[0].stages.set(StatKind::Speed, 2);

        execute_command_batch(
            vec![BattleCommand::SwitchActive {
                side: SideId::Player1,
                slot: 1,
            }],
            &mut state,
            &mut bus,
        )
        .unwrap();

        assert_eq!(state.sides[0].active, 1);
        assert!(state.sides[0].team[0].volatiles.is_empty());
        assert!(state.sides[0].team[0].stages.is_neutral());
    }

    #[test]
    fn test_invalid_target_is_an_error() {
        let mut state = create_test_battle_state();
        let mut bus = EventBus::new();
        let result = execute_command_batch(
            vec![BattleCommand::Heal {
                target: CombatantRef::new(SideId::Player2, 4),
                amount: 10,
            }],
            &mut state,
            &mut bus,
        );
        assert_eq!(
            result.unwrap_err(),
            EngineError::InvalidCombatant {
                side: SideId::Player2,
                slot: 4
            }
        );
    }

    #[test]
    fn test_hazard_layers_cap() {
        let mut state = create_test_battle_state();
        let mut bus = EventBus::new();
        let commands = (0..4)
            .map(|_| BattleCommand::AddHazard {
                side: SideId::Player2,
                hazard: Hazard::Spikes,
            })
            .collect();
        execute_command_batch(commands, &mut state, &mut bus).unwrap();
        assert_eq!(state.sides[1].hazard_layers(Hazard::Spikes), 3);
    }
}
