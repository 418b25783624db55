use crate::battle::rng::BattleRng;
use crate::battle::state::Side;
use crate::combatant::{Combatant, MAX_STAGE, MIN_STAGE};
use crate::config::BattleRules;
use crate::field::weather_accuracy_multiplier;
use schema::{SideCondition, StatKind, StatusKind, Weather};
use tracing::warn;

fn clamp_stage(stage: i8) -> i8 {
    if !(MIN_STAGE..=MAX_STAGE).contains(&stage) {
        warn!(stage, "stage out of range, clamping");
    }
    stage.clamp(MIN_STAGE, MAX_STAGE)
}

/// Multiplier for attack, defense, special attack, special defense and speed.
/// `(2 + s) / 2` for non-negative stages, `2 / (2 + |s|)` below zero.
pub fn stat_multiplier(stage: i8) -> f64 {
    let stage = clamp_stage(stage) as f64;
    if stage >= 0.0 {
        (2.0 + stage) / 2.0
    } else {
        2.0 / (2.0 - stage)
    }
}

/// Multiplier for accuracy and evasion.
/// `(3 + s) / 3` for non-negative stages, `3 / (3 + |s|)` below zero.
pub fn accuracy_multiplier(stage: i8) -> f64 {
    let stage = clamp_stage(stage) as f64;
    if stage >= 0.0 {
        (3.0 + stage) / 3.0
    } else {
        3.0 / (3.0 - stage)
    }
}

/// A combat stat after its stage multiplier, floored and never below 1.
pub fn effective_stat(combatant: &Combatant, stat: StatKind) -> f64 {
    let raw = combatant.stats.get(stat).unwrap_or(0) as f64;
    (raw * stat_multiplier(combatant.stages.get(stat))).floor().max(1.0)
}

/// Speed used for turn ordering: stages, then paralysis, then tailwind.
pub fn effective_speed(combatant: &Combatant, side: &Side, rules: &BattleRules) -> f64 {
    let mut speed = effective_stat(combatant, StatKind::Speed);
    if combatant.primary_kind() == Some(StatusKind::Paralysis) {
        speed *= rules.paralysis_speed_multiplier;
    }
    if side.has_condition(SideCondition::Tailwind) {
        speed *= rules.tailwind_speed_multiplier;
    }
    speed
}

/// Crit stage for an attack: the move's own stage plus two under Focus Energy.
pub fn critical_stage(attacker: &Combatant, move_crit_stage: u8) -> u8 {
    let focus = if attacker.has_status(StatusKind::FocusEnergy) {
        2
    } else {
        0
    };
    move_crit_stage.saturating_add(focus)
}

/// Percentage chance to hit, or `None` when the move cannot miss.
pub fn hit_chance(
    attacker: &Combatant,
    defender: &Combatant,
    accuracy: Option<u8>,
    weather: Weather,
) -> Option<f64> {
    let accuracy = accuracy?;
    // The net stage legitimately spans -12..=12; only its clamped value matters.
    let net = i16::from(attacker.stages.get(StatKind::Accuracy))
        - i16::from(defender.stages.get(StatKind::Evasion));
    let stage = net.clamp(i16::from(MIN_STAGE), i16::from(MAX_STAGE)) as i8;
    let chance = accuracy as f64 * accuracy_multiplier(stage) * weather_accuracy_multiplier(weather);
    Some(chance.clamp(0.0, 100.0))
}

/// Roll accuracy against evasion. Sure-hit moves and a 100% threshold draw nothing.
pub fn move_hits(
    attacker: &Combatant,
    defender: &Combatant,
    accuracy: Option<u8>,
    weather: Weather,
    rng: &mut dyn BattleRng,
) -> bool {
    match hit_chance(attacker, defender, accuracy, weather) {
        None => true,
        Some(chance) => rng.chance(chance / 100.0, "accuracy"),
    }
}
