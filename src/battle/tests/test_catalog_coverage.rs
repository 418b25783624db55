#[cfg(test)]
mod tests {
    use crate::battle::engine::TurnEngine;
    use crate::battle::rng::TurnRng;
    use crate::battle::state::{BattleEvent, SideId};
    use crate::battle::tests::common::*;
    use crate::move_catalog::MoveEffectCatalog;
    use pretty_assertions::assert_eq;

    fn full_teams() -> crate::battle::state::BattleState {
        create_team_battle(
            vec![
                TestCombatantBuilder::new("Caster").with_hp(60).build(),
                TestCombatantBuilder::new("Reserve").build(),
            ],
            vec![
                TestCombatantBuilder::new("Target").with_hp(60).build(),
                TestCombatantBuilder::new("Backup").build(),
            ],
        )
    }

    #[test]
    fn test_every_catalog_move_resolves_a_turn() {
        let engine = TurnEngine::standard().unwrap();
        let catalog = MoveEffectCatalog::standard().unwrap();
        assert!(!catalog.is_empty());

        for (index, entry) in catalog.iter().enumerate() {
            let mut state = full_teams();
            let mut rng = TurnRng::from_seed_u64(index as u64);
            let report = engine
                .resolve_turn(
                    &mut state,
                    &[
                        (SideId::Player1, use_move(&entry.name)),
                        (SideId::Player2, use_move("Splash")),
                    ],
                    &mut rng,
                )
                .unwrap_or_else(|error| panic!("{} failed to resolve: {error}", entry.name));

            assert!(
                report.events.iter().any(|event| matches!(
                    event,
                    BattleEvent::MoveUsed { user, move_name }
                        if user.side == SideId::Player1 && *move_name == entry.name
                )),
                "{} was never announced",
                entry.name
            );
        }
    }

    #[test]
    fn test_catalog_moves_against_a_protected_target() {
        let engine = TurnEngine::standard().unwrap();
        let catalog = MoveEffectCatalog::standard().unwrap();

        for entry in catalog.iter().filter(|entry| entry.priority < 4) {
            let mut state = full_teams();
            let report = engine
                .resolve_turn(
                    &mut state,
                    &[
                        (SideId::Player1, use_move(&entry.name)),
                        (SideId::Player2, use_move("Protect")),
                    ],
                    &mut TurnRng::from_seed_u64(7),
                )
                .unwrap_or_else(|error| panic!("{} failed to resolve: {error}", entry.name));
            assert!(
                report.events.iter().any(|event| matches!(event, BattleEvent::TurnEnded { .. })),
                "{}",
                entry.name
            );
            let shielded = &state.sides[1].team[0];
            assert!(shielded.stages.is_neutral(), "{} changed a shielded target's stages", entry.name);
            assert_eq!(shielded.primary, None, "{} afflicted a shielded target", entry.name);
        }
    }
}
