use crate::battle::commands::BattleCommand;
use crate::battle::conditions::{try_inflict, StatusCheck};
use crate::battle::rng::BattleRng;
use crate::battle::state::{
    BattleEvent, BattleState, CombatantRef, DamageCause, FailureReason, Side,
};
use crate::battle::stats::{critical_stage, effective_stat, move_hits};
use crate::combatant::Combatant;
use crate::config::BattleRules;
use crate::errors::EngineResult;
use crate::field::{type_multiplier, FieldState};
use crate::move_catalog::ContactEffect;
use crate::move_data::{MoveData, SecondaryEffect};
use crate::status::StatusRegistry;
use crate::type_chart::effectiveness;
use schema::{MonsterType, MoveCategory, SideCondition, StatKind, StatusKind};
use tracing::debug;

/// Extension points for abilities and held items, which live outside the engine.
pub trait DamageHooks {
    /// Extra multiplier folded into the damage product before truncation.
    fn pre_damage_multiplier(
        &self,
        _attacker: &Combatant,
        _defender: &Combatant,
        _move_data: &MoveData,
    ) -> f64 {
        1.0
    }

    /// Last chance to adjust the final integer damage.
    fn post_damage(
        &self,
        _attacker: &Combatant,
        _defender: &Combatant,
        _move_data: &MoveData,
        damage: u16,
    ) -> u16 {
        damage
    }
}

/// Hooks that change nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl DamageHooks for NoHooks {}

/// Everything the damage roll decided, for events and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageOutcome {
    pub damage: u16,
    pub effectiveness: f64,
    pub critical: bool,
    pub stab: bool,
    pub random_factor: f64,
}

impl DamageOutcome {
    fn immune() -> Self {
        Self {
            damage: 0,
            effectiveness: 0.0,
            critical: false,
            stab: false,
            random_factor: 1.0,
        }
    }
}

/// The damage formula with its tunable constants.
#[derive(Debug, Clone)]
pub struct DamageCalculator<'r> {
    rules: &'r BattleRules,
}

impl<'r> DamageCalculator<'r> {
    pub fn new(rules: &'r BattleRules) -> Self {
        Self { rules }
    }

    /// Type effectiveness of `move_data` against `defender` right now, with
    /// roosting and levitation taken into account.
    pub fn effectiveness(&self, defender: &Combatant, move_data: &MoveData) -> f64 {
        if move_data.move_type == MonsterType::Ground && defender.has_status(StatusKind::MagnetRise)
        {
            return 0.0;
        }
        effectiveness(move_data.move_type, &defender.defending_types())
    }

    /// Damage for one hit. Immune targets take 0 and consume no randomness;
    /// otherwise the crit roll is drawn before the random factor.
    #[allow(clippy::too_many_arguments)]
    pub fn calculate(
        &self,
        attacker: &Combatant,
        defender: &Combatant,
        defender_side: &Side,
        move_data: &MoveData,
        field: &FieldState,
        rng: &mut dyn BattleRng,
        hooks: &dyn DamageHooks,
    ) -> DamageOutcome {
        let power = match move_data.power {
            Some(power) if move_data.is_damaging() => power as f64,
            _ => return DamageOutcome::immune(),
        };
        let type_factor = self.effectiveness(defender, move_data);
        if type_factor == 0.0 {
            return DamageOutcome::immune();
        }

        let critical = if defender_side.has_condition(SideCondition::LuckyChant) {
            false
        } else if attacker.has_status(StatusKind::LaserFocus) {
            true
        } else {
            let stage = critical_stage(attacker, move_data.crit_stage);
            rng.chance(self.rules.critical_rate(stage), "critical hit")
        };

        let (attack, defense) = match move_data.category {
            MoveCategory::Special => (
                effective_stat(attacker, StatKind::SpecialAttack),
                effective_stat(defender, StatKind::SpecialDefense),
            ),
            _ => (
                effective_stat(attacker, StatKind::Attack),
                effective_stat(defender, StatKind::Defense),
            ),
        };

        let level = attacker.level.clamp(1, 100) as f64;
        let base = (2.0 * level / 5.0 + 2.0) * power * attack / defense / 50.0 + 2.0;

        let stab = attacker.has_type(move_data.move_type);
        let stab_factor = if stab { self.rules.stab_multiplier } else { 1.0 };
        let crit_factor = if critical {
            self.rules.critical_multiplier
        } else {
            1.0
        };
        let (low, high) = self.rules.random_factor;
        let random_factor = rng.factor_in(low, high, "damage roll");
        let field_factor = type_multiplier(field.weather, field.terrain, move_data.move_type);
        let screen_factor = if critical {
            1.0
        } else {
            self.screen_factor(defender_side, move_data.category)
        };
        let charge_factor = if move_data.move_type == MonsterType::Electric
            && attacker.has_status(StatusKind::Charged)
        {
            2.0
        } else {
            1.0
        };

        let raw = base
            * stab_factor
            * type_factor
            * crit_factor
            * random_factor
            * field_factor
            * screen_factor
            * charge_factor
            * hooks.pre_damage_multiplier(attacker, defender, move_data);

        let damage = (raw.floor().max(1.0)).min(u16::MAX as f64) as u16;
        let damage = hooks.post_damage(attacker, defender, move_data, damage);

        debug!(
            move_name = %move_data.name,
            base,
            stab,
            type_factor,
            critical,
            random_factor,
            field_factor,
            screen_factor,
            damage,
            "damage calculated"
        );

        DamageOutcome {
            damage,
            effectiveness: type_factor,
            critical,
            stab,
            random_factor,
        }
    }

    fn screen_factor(&self, side: &Side, category: MoveCategory) -> f64 {
        let screened = side.has_condition(SideCondition::AuroraVeil)
            || match category {
                MoveCategory::Physical => side.has_condition(SideCondition::Reflect),
                MoveCategory::Special => side.has_condition(SideCondition::LightScreen),
                MoveCategory::Status => false,
            };
        if screened {
            self.rules.screen_multiplier
        } else {
            1.0
        }
    }
}

/// Commands applied to an attacker that ran into a guarded target.
pub fn contact_commands(
    registry: &StatusRegistry,
    state: &BattleState,
    attacker: CombatantRef,
    contact: &ContactEffect,
    rng: &mut dyn BattleRng,
) -> EngineResult<Vec<BattleCommand>> {
    Ok(match contact {
        ContactEffect::LowerStat { stat, stages } => vec![BattleCommand::ChangeStatStage {
            target: attacker,
            stat: *stat,
            delta: -stages.abs(),
        }],
        ContactEffect::Inflict(kind) => {
            let guard_side = Some(attacker.side.opponent());
            match try_inflict(registry, state, attacker, *kind, None, guard_side, rng)? {
                StatusCheck::Apply(command) => vec![command],
                StatusCheck::Fail(_) => Vec::new(),
            }
        }
        ContactEffect::Damage(fraction) => {
            let amount = state.combatant(attacker)?.hp_fraction(*fraction).max(1);
            vec![BattleCommand::IndirectDamage {
                target: attacker,
                amount,
                cause: DamageCause::Contact,
            }]
        }
    })
}

/// Resolve one damaging attack from `attacker` into `defender`: protection,
/// accuracy, the damage roll and the substitute.
#[allow(clippy::too_many_arguments)]
pub fn calculate_attack_outcome(
    state: &BattleState,
    attacker: CombatantRef,
    defender: CombatantRef,
    move_data: &MoveData,
    calculator: &DamageCalculator<'_>,
    registry: &StatusRegistry,
    hooks: &dyn DamageHooks,
    rng: &mut dyn BattleRng,
) -> EngineResult<Vec<BattleCommand>> {
    let mut commands = Vec::new();
    let attacker_mon = state.combatant(attacker)?;
    let defender_mon = state.combatant(defender)?;
    let move_name = move_data.name.clone();

    commands.push(BattleCommand::EmitEvent(BattleEvent::MoveUsed {
        user: attacker,
        move_name: move_name.clone(),
    }));
    commands.push(BattleCommand::SetLastMove {
        target: attacker,
        name: move_name.clone(),
    });
    if attacker_mon.has_status(StatusKind::LaserFocus) {
        commands.push(BattleCommand::RemoveStatus {
            target: attacker,
            kind: StatusKind::LaserFocus,
        });
    }

    if move_data.move_type == MonsterType::Fire && attacker_mon.has_status(StatusKind::Powder) {
        commands.push(BattleCommand::EmitEvent(BattleEvent::MoveFailed {
            user: attacker,
            move_name,
            reason: FailureReason::Powder,
        }));
        commands.push(BattleCommand::IndirectDamage {
            target: attacker,
            amount: attacker_mon.hp_fraction(0.25).max(1),
            cause: DamageCause::Powder,
        });
        return Ok(commands);
    }

    if defender_mon.is_fainted() {
        commands.push(BattleCommand::EmitEvent(BattleEvent::MoveFailed {
            user: attacker,
            move_name,
            reason: FailureReason::NoTarget,
        }));
        return Ok(commands);
    }

    if defender_mon.has_status(StatusKind::Protected) {
        commands.push(BattleCommand::EmitEvent(BattleEvent::MoveBlocked {
            target: defender,
            move_name,
        }));
        if let (true, Some(contact)) = (move_data.contact, defender_mon.guard.as_ref()) {
            commands.extend(contact_commands(registry, state, attacker, contact, rng)?);
        }
        return Ok(commands);
    }

    if !move_hits(
        attacker_mon,
        defender_mon,
        move_data.clamped_accuracy(),
        state.field.weather,
        rng,
    ) {
        commands.push(BattleCommand::EmitEvent(BattleEvent::MoveMissed {
            user: attacker,
            move_name,
        }));
        return Ok(commands);
    }

    if !move_data.is_damaging() {
        return Ok(commands);
    }

    let outcome = calculator.calculate(
        attacker_mon,
        defender_mon,
        state.side(defender.side),
        move_data,
        &state.field,
        rng,
        hooks,
    );

    if move_data.move_type == MonsterType::Electric && attacker_mon.has_status(StatusKind::Charged)
    {
        commands.push(BattleCommand::RemoveStatus {
            target: attacker,
            kind: StatusKind::Charged,
        });
    }
    if outcome.critical {
        commands.push(BattleCommand::EmitEvent(BattleEvent::CriticalHit {
            target: defender,
        }));
    }

    let behind_substitute = outcome.damage > 0 && defender_mon.substitute_hp > 0;
    if behind_substitute {
        commands.push(BattleCommand::DamageSubstitute {
            target: defender,
            amount: outcome.damage,
        });
    } else {
        commands.push(BattleCommand::DealDamage {
            target: defender,
            amount: outcome.damage,
            effectiveness: outcome.effectiveness,
        });
    }

    // A substitute or an immunity soaks the secondary effect too.
    let landed = outcome.damage > 0 && !behind_substitute;
    if let Some(secondary) = move_data.secondary.filter(|_| landed) {
        commands.extend(secondary_effect_commands(
            registry, state, attacker, defender, secondary, rng,
        )?);
    }

    Ok(commands)
}

/// Roll a damaging move's added status. The status lands after the damage,
/// so it is dropped if the hit knocks the target out.
fn secondary_effect_commands(
    registry: &StatusRegistry,
    state: &BattleState,
    attacker: CombatantRef,
    defender: CombatantRef,
    secondary: SecondaryEffect,
    rng: &mut dyn BattleRng,
) -> EngineResult<Vec<BattleCommand>> {
    let chance = f64::from(secondary.chance.min(100)) / 100.0;
    if !rng.chance(chance, "secondary effect") {
        return Ok(Vec::new());
    }
    let source = Some(attacker.side);
    Ok(
        match try_inflict(registry, state, defender, secondary.status, None, source, rng)? {
            StatusCheck::Apply(command) => vec![command],
            StatusCheck::Fail(reason) => {
                debug!(kind = %secondary.status, ?reason, "secondary effect did not take");
                Vec::new()
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::rng::{ScriptedRng, TurnRng};
    use crate::battle::state::SideId;
    use crate::combatant::{ActiveStatus, StatBlock};
    use pretty_assertions::assert_eq;
    use schema::{Terrain, Weather};

    fn mon(types: Vec<MonsterType>) -> Combatant {
        Combatant::new("Mon", types, 50, StatBlock::new(150, 100, 100, 100, 100, 100))
    }

    fn no_crit_max_roll() -> ScriptedRng {
        ScriptedRng::new(vec![0.99, 1.0])
    }

    fn create_test_battle_state() -> BattleState {
        BattleState::new(
            Side::new(vec![mon(vec![MonsterType::Normal])]),
            Side::new(vec![mon(vec![MonsterType::Normal])]),
        )
    }

    #[test]
    fn test_base_formula_without_modifiers() {
        let rules = BattleRules::default();
        let calculator = DamageCalculator::new(&rules);
        let attacker = mon(vec![MonsterType::Fighting]);
        let defender = mon(vec![MonsterType::Normal]);
        let tackle = MoveData::new("Tackle", MonsterType::Normal, MoveCategory::Physical, 50);
        let side = Side::new(vec![]);

        let outcome = calculator.calculate(
            &attacker,
            &defender,
            &side,
            &tackle,
            &FieldState::default(),
            &mut no_crit_max_roll(),
            &NoHooks,
        );

        // (22 * 50 * 100 / 100 / 50) + 2 = 24
        assert_eq!(outcome.damage, 24);
        assert!(!outcome.critical);
        assert!(!outcome.stab);
        assert_eq!(outcome.effectiveness, 1.0);
    }

    #[test]
    fn test_immune_target_takes_nothing_and_draws_nothing() {
        let rules = BattleRules::default();
        let calculator = DamageCalculator::new(&rules);
        let attacker = mon(vec![MonsterType::Electric]);
        let defender = mon(vec![MonsterType::Ground]);
        let bolt = MoveData::new("Thunderbolt", MonsterType::Electric, MoveCategory::Special, 250);
        let mut rng = ScriptedRng::new(vec![]);

        let outcome = calculator.calculate(
            &attacker,
            &defender,
            &Side::new(vec![]),
            &bolt,
            &FieldState::default(),
            &mut rng,
            &NoHooks,
        );

        assert_eq!(outcome.damage, 0);
        assert_eq!(outcome.effectiveness, 0.0);
        assert_eq!(rng.consumed(), 0);
    }

    #[test]
    fn test_stab_and_rain_stack_multiplicatively() {
        let rules = BattleRules::default();
        let calculator = DamageCalculator::new(&rules);
        let attacker = mon(vec![MonsterType::Water]);
        let defender = mon(vec![MonsterType::Normal]);
        let surf = MoveData::new("Surf", MonsterType::Water, MoveCategory::Special, 90);
        let side = Side::new(vec![]);

        let clear = calculator.calculate(
            &attacker,
            &defender,
            &side,
            &surf,
            &FieldState::default(),
            &mut no_crit_max_roll(),
            &NoHooks,
        );
        let rain = calculator.calculate(
            &attacker,
            &defender,
            &side,
            &surf,
            &FieldState::default().with_weather(Weather::Rain, Some(5)),
            &mut no_crit_max_roll(),
            &NoHooks,
        );

        // base = 22 * 90 / 50 + 2 = 41.6
        assert!(clear.stab);
        assert_eq!(clear.damage, (41.6f64 * 1.5).floor() as u16);
        assert_eq!(rain.damage, (41.6f64 * 1.5 * 1.5).floor() as u16);
    }

    #[test]
    fn test_critical_stage_three_always_crits() {
        let rules = BattleRules::default();
        let calculator = DamageCalculator::new(&rules);
        let attacker = mon(vec![MonsterType::Normal]);
        let defender = mon(vec![MonsterType::Normal]);
        let slash = MoveData::new("Slash", MonsterType::Normal, MoveCategory::Physical, 70)
            .with_crit_stage(3);
        let mut rng = ScriptedRng::new(vec![1.0]);

        let outcome = calculator.calculate(
            &attacker,
            &defender,
            &Side::new(vec![]),
            &slash,
            &FieldState::default(),
            &mut rng,
            &NoHooks,
        );
        assert!(outcome.critical);
        // Only the damage roll was drawn.
        assert_eq!(rng.consumed(), 1);
    }

    #[test]
    fn test_crit_rate_converges_at_stage_zero() {
        let rules = BattleRules::default();
        let calculator = DamageCalculator::new(&rules);
        let attacker = mon(vec![MonsterType::Normal]);
        let defender = mon(vec![MonsterType::Normal]);
        let tackle = MoveData::new("Tackle", MonsterType::Normal, MoveCategory::Physical, 40);
        let side = Side::new(vec![]);
        let mut rng = TurnRng::from_seed_u64(7);

        let trials = 48_000;
        let crits = (0..trials)
            .filter(|_| {
                calculator
                    .calculate(
                        &attacker,
                        &defender,
                        &side,
                        &tackle,
                        &FieldState::default(),
                        &mut rng,
                        &NoHooks,
                    )
                    .critical
            })
            .count();
        let rate = crits as f64 / trials as f64;
        assert!((rate - 1.0 / 24.0).abs() < 0.006, "crit rate {}", rate);
    }

    #[test]
    fn test_screens_halve_unless_critical() {
        let rules = BattleRules::default();
        let calculator = DamageCalculator::new(&rules);
        let attacker = mon(vec![MonsterType::Normal]);
        let defender = mon(vec![MonsterType::Normal]);
        let tackle = MoveData::new("Strike", MonsterType::Fighting, MoveCategory::Physical, 100);
        let mut side = Side::new(vec![]);
        let open = calculator.calculate(
            &attacker,
            &defender,
            &side,
            &tackle,
            &FieldState::default(),
            &mut no_crit_max_roll(),
            &NoHooks,
        );
        side.conditions.insert(SideCondition::Reflect, 5);
        let screened = calculator.calculate(
            &attacker,
            &defender,
            &side,
            &tackle,
            &FieldState::default(),
            &mut no_crit_max_roll(),
            &NoHooks,
        );
        let crit = calculator.calculate(
            &attacker,
            &defender,
            &side,
            &tackle,
            &FieldState::default(),
            &mut ScriptedRng::new(vec![0.0, 1.0]),
            &NoHooks,
        );
        // 46 * 2 = 92 unscreened, halved behind Reflect.
        assert_eq!(open.damage, 92);
        assert_eq!(screened.damage, 46);
        assert_eq!(crit.damage, 138);
    }

    #[test]
    fn test_weak_hit_floors_at_one() {
        let rules = BattleRules::default();
        let calculator = DamageCalculator::new(&rules);
        let attacker = Combatant::new(
            "Tiny",
            vec![MonsterType::Normal],
            1,
            StatBlock::new(10, 1, 1, 1, 1, 1),
        );
        let defender = mon(vec![MonsterType::Rock, MonsterType::Steel]);
        let peck = MoveData::new("Peck", MonsterType::Bug, MoveCategory::Physical, 1);

        let outcome = calculator.calculate(
            &attacker,
            &defender,
            &Side::new(vec![]),
            &peck,
            &FieldState::default().with_terrain(Terrain::Normal, None),
            &mut ScriptedRng::new(vec![0.99, 0.0]),
            &NoHooks,
        );
        assert!(outcome.effectiveness > 0.0 && outcome.effectiveness < 1.0);
        assert_eq!(outcome.damage, 1);
    }

    struct Doubler;

    impl DamageHooks for Doubler {
        fn pre_damage_multiplier(&self, _: &Combatant, _: &Combatant, _: &MoveData) -> f64 {
            2.0
        }
    }

    #[test]
    fn test_hooks_adjust_damage() {
        let rules = BattleRules::default();
        let calculator = DamageCalculator::new(&rules);
        let attacker = mon(vec![MonsterType::Fighting]);
        let defender = mon(vec![MonsterType::Normal]);
        let tackle = MoveData::new("Tackle", MonsterType::Normal, MoveCategory::Physical, 50);
        let outcome = calculator.calculate(
            &attacker,
            &defender,
            &Side::new(vec![]),
            &tackle,
            &FieldState::default(),
            &mut no_crit_max_roll(),
            &Doubler,
        );
        assert_eq!(outcome.damage, 48);
    }

    #[test]
    fn test_calculate_attack_outcome_miss() {
        let state = create_test_battle_state();
        let rules = BattleRules::default();
        let calculator = DamageCalculator::new(&rules);
        let registry = StatusRegistry::standard().unwrap();
        let attacker = CombatantRef::new(SideId::Player1, 0);
        let defender = CombatantRef::new(SideId::Player2, 0);
        let shaky = MoveData::new("Shaky", MonsterType::Normal, MoveCategory::Physical, 80)
            .with_accuracy(Some(50));
        let mut rng = ScriptedRng::new(vec![0.9]);

        let commands = calculate_attack_outcome(
            &state,
            attacker,
            defender,
            &shaky,
            &calculator,
            registry,
            &NoHooks,
            &mut rng,
        )
        .unwrap();

        assert!(matches!(
            commands.last(),
            Some(BattleCommand::EmitEvent(BattleEvent::MoveMissed { .. }))
        ));
    }

    #[test]
    fn test_protected_target_blocks_and_punishes_contact() {
        let mut state = create_test_battle_state();
        state.sides[1].team[0]
            .volatiles
            .push(ActiveStatus::new(StatusKind::Protected, Some(1)));
        state.sides[1].team[0].guard = Some(ContactEffect::Damage(0.125));
        let rules = BattleRules::default();
        let calculator = DamageCalculator::new(&rules);
        let registry = StatusRegistry::standard().unwrap();
        let attacker = CombatantRef::new(SideId::Player1, 0);
        let defender = CombatantRef::new(SideId::Player2, 0);
        let tackle = MoveData::new("Tackle", MonsterType::Normal, MoveCategory::Physical, 40);

        let commands = calculate_attack_outcome(
            &state,
            attacker,
            defender,
            &tackle,
            &calculator,
            registry,
            &NoHooks,
            &mut ScriptedRng::new(vec![]),
        )
        .unwrap();

        assert_eq!(
            &commands[2..],
            &[
                BattleCommand::EmitEvent(BattleEvent::MoveBlocked {
                    target: defender,
                    move_name: "Tackle".to_string()
                }),
                BattleCommand::IndirectDamage {
                    target: attacker,
                    amount: 18,
                    cause: DamageCause::Contact
                },
            ]
        );
    }

    #[test]
    fn test_substitute_soaks_the_secondary_effect() {
        let mut state = create_test_battle_state();
        state.sides[1].team[0].substitute_hp = 40;
        state.sides[1].team[0]
            .volatiles
            .push(ActiveStatus::new(StatusKind::Substitute, None));
        let rules = BattleRules::default();
        let calculator = DamageCalculator::new(&rules);
        let registry = StatusRegistry::standard().unwrap();
        let spark = MoveData::new("Spark", MonsterType::Electric, MoveCategory::Physical, 65)
            .with_secondary(StatusKind::Paralysis, 100);
        let mut rng = no_crit_max_roll();

        let commands = calculate_attack_outcome(
            &state,
            CombatantRef::new(SideId::Player1, 0),
            CombatantRef::new(SideId::Player2, 0),
            &spark,
            &calculator,
            registry,
            &NoHooks,
            &mut rng,
        )
        .unwrap();

        assert!(matches!(
            commands.last(),
            Some(BattleCommand::DamageSubstitute { .. })
        ));
        assert!(!commands
            .iter()
            .any(|command| matches!(command, BattleCommand::ApplyStatus { .. })));
        assert_eq!(rng.consumed(), 2);
    }
}
