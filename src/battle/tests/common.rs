use crate::battle::action_stack::TurnAction;
use crate::battle::engine::{TurnEngine, TurnReport};
use crate::battle::rng::ScriptedRng;
use crate::battle::state::{BattleEvent, BattleState, Side, SideId};
use crate::combatant::{ActiveStatus, Combatant, StatBlock};
use crate::move_data::MoveData;
use schema::{MonsterType, MoveCategory, StatusKind};

/// A builder for creating test combatants with common defaults.
///
/// # Example
/// ```ignore
/// let sleeper = TestCombatantBuilder::new("Sleeper")
///     .with_types(vec![MonsterType::Psychic])
///     .with_status(StatusKind::Sleep, Some(3))
///     .build();
/// ```
pub struct TestCombatantBuilder {
    name: String,
    types: Vec<MonsterType>,
    level: u8,
    stats: StatBlock,
    current_hp: Option<u16>,
    statuses: Vec<(StatusKind, Option<u8>)>,
    moves: Vec<MoveData>,
}

impl TestCombatantBuilder {
    /// Level 50, Normal type, 100 in every stat, knows Tackle.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            types: vec![MonsterType::Normal],
            level: 50,
            stats: StatBlock::new(100, 100, 100, 100, 100, 100),
            current_hp: None,
            statuses: Vec::new(),
            moves: vec![tackle()],
        }
    }

    pub fn with_types(mut self, types: Vec<MonsterType>) -> Self {
        self.types = types;
        self
    }

    pub fn with_stats(mut self, stats: StatBlock) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    /// Sets the current HP. If not set, HP will be max.
    pub fn with_hp(mut self, hp: u16) -> Self {
        self.current_hp = Some(hp);
        self
    }

    /// Adds a status with an explicit remaining duration.
    pub fn with_status(mut self, kind: StatusKind, remaining: Option<u8>) -> Self {
        self.statuses.push((kind, remaining));
        self
    }

    pub fn with_moves(mut self, moves: Vec<MoveData>) -> Self {
        self.moves = moves;
        self
    }

    pub fn build(self) -> Combatant {
        let registry = crate::status::StatusRegistry::standard().unwrap();
        let mut combatant = Combatant::new(self.name, self.types, self.level, self.stats)
            .with_moves(self.moves);
        if let Some(hp) = self.current_hp {
            combatant.current_hp = hp;
        }
        for (kind, remaining) in self.statuses {
            let status = ActiveStatus::new(kind, remaining);
            if registry.get(kind).unwrap().is_primary() {
                combatant.primary = Some(status);
            } else {
                combatant.volatiles.push(status);
            }
        }
        combatant
    }
}

pub fn tackle() -> MoveData {
    MoveData::new("Tackle", MonsterType::Normal, MoveCategory::Physical, 40)
}

/// A battle between two single-combatant teams.
pub fn create_test_battle(player1: Combatant, player2: Combatant) -> BattleState {
    BattleState::new(Side::new(vec![player1]), Side::new(vec![player2]))
}

/// A battle between two teams.
pub fn create_team_battle(player1: Vec<Combatant>, player2: Vec<Combatant>) -> BattleState {
    BattleState::new(Side::new(player1), Side::new(player2))
}

pub fn attack(move_data: MoveData) -> TurnAction {
    TurnAction::Attack { move_data }
}

pub fn use_move(name: &str) -> TurnAction {
    TurnAction::UseMove {
        name: name.to_string(),
    }
}

/// A scripted source that answers every roll with `value` once `draws` run out.
pub fn scripted(draws: Vec<f64>, fallback: f64) -> ScriptedRng {
    ScriptedRng::new(draws).with_fallback(fallback)
}

/// Resolve one turn with the standard tables.
pub fn run_turn(
    state: &mut BattleState,
    player1: TurnAction,
    player2: TurnAction,
    rng: &mut ScriptedRng,
) -> TurnReport {
    let engine = TurnEngine::standard().unwrap();
    engine
        .resolve_turn(
            state,
            &[(SideId::Player1, player1), (SideId::Player2, player2)],
            rng,
        )
        .unwrap()
}

pub fn count_events<F>(events: &[BattleEvent], predicate: F) -> usize
where
    F: Fn(&BattleEvent) -> bool,
{
    events.iter().filter(|event| predicate(event)).count()
}
