//! Bringing a benched combatant in: the swap itself, entry hazards, and a
//! pending Healing Wish.

use crate::battle::commands::BattleCommand;
use crate::battle::conditions::{try_inflict, StatusCheck};
use crate::battle::rng::BattleRng;
use crate::battle::state::{BattleState, CombatantRef, DamageCause, SideId};
use crate::combatant::Combatant;
use crate::errors::{EngineError, EngineResult};
use crate::status::StatusRegistry;
use crate::type_chart::effectiveness;
use schema::{Hazard, MonsterType, StatKind, StatusKind};
use tracing::debug;

const SPIKES_FRACTIONS: [f64; 3] = [1.0 / 8.0, 1.0 / 6.0, 1.0 / 4.0];
const STEALTH_ROCK_FRACTION: f64 = 1.0 / 8.0;

/// Grounded combatants are touched by terrain and ground-level hazards.
pub fn is_grounded(combatant: &Combatant) -> bool {
    !combatant.has_type(MonsterType::Flying) && !combatant.has_status(StatusKind::MagnetRise)
}

/// Commands that swap `slot` in for `side` and resolve everything that
/// happens on entry.
pub fn switch_in_commands(
    registry: &StatusRegistry,
    state: &BattleState,
    side: SideId,
    slot: usize,
    rng: &mut dyn BattleRng,
) -> EngineResult<Vec<BattleCommand>> {
    let incoming_ref = CombatantRef::new(side, slot);
    let incoming = state.combatant(incoming_ref)?;
    if incoming.is_fainted() || slot == state.side(side).active {
        return Err(EngineError::InvalidCombatant { side, slot });
    }

    let mut commands = vec![BattleCommand::SwitchActive { side, slot }];
    commands.extend(hazard_commands(registry, state, incoming_ref, rng)?);

    if state.side(side).healing_wish {
        debug!(%side, slot, "healing wish restores the incoming combatant");
        commands.push(BattleCommand::Heal {
            target: incoming_ref,
            amount: incoming.max_hp(),
        });
        if let Some(kind) = incoming.primary_kind() {
            commands.push(BattleCommand::CureStatus {
                target: incoming_ref,
                kind,
            });
        }
        commands.push(BattleCommand::SetHealingWish {
            side,
            pending: false,
        });
    }
    Ok(commands)
}

fn hazard_commands(
    registry: &StatusRegistry,
    state: &BattleState,
    target: CombatantRef,
    rng: &mut dyn BattleRng,
) -> EngineResult<Vec<BattleCommand>> {
    let incoming = state.combatant(target)?;
    let side = state.side(target.side);
    let grounded = is_grounded(incoming);
    let mut commands = Vec::new();

    for (&hazard, &layers) in &side.hazards {
        if layers == 0 {
            continue;
        }
        match hazard {
            Hazard::Spikes if grounded => {
                let index = (layers as usize).min(SPIKES_FRACTIONS.len()) - 1;
                commands.push(BattleCommand::IndirectDamage {
                    target,
                    amount: incoming.hp_fraction(SPIKES_FRACTIONS[index]),
                    cause: DamageCause::Hazard(hazard),
                });
            }
            Hazard::StealthRock => {
                let multiplier = effectiveness(MonsterType::Rock, &incoming.types);
                commands.push(BattleCommand::IndirectDamage {
                    target,
                    amount: incoming.hp_fraction(STEALTH_ROCK_FRACTION * multiplier),
                    cause: DamageCause::Hazard(hazard),
                });
            }
            Hazard::ToxicSpikes if grounded => {
                if incoming.has_type(MonsterType::Poison) {
                    commands.push(BattleCommand::RemoveHazard {
                        side: target.side,
                        hazard,
                    });
                    continue;
                }
                let kind = if layers >= 2 {
                    StatusKind::Toxic
                } else {
                    StatusKind::Poison
                };
                let source = Some(target.side.opponent());
                if let StatusCheck::Apply(command) =
                    try_inflict(registry, state, target, kind, None, source, rng)?
                {
                    commands.push(command);
                }
            }
            Hazard::StickyWeb if grounded => {
                commands.push(BattleCommand::ChangeStatStage {
                    target,
                    stat: StatKind::Speed,
                    delta: -1,
                });
            }
            _ => {}
        }
    }
    Ok(commands)
}
