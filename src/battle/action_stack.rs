use std::collections::VecDeque;
use std::fmt;

use crate::battle::state::{BattleState, CombatantRef, SideId};
use crate::battle::stats::effective_speed;
use crate::config::BattleRules;
use crate::errors::{EngineError, EngineResult};
use crate::move_catalog::{MoveEffectCatalog, MoveEffectEntry};
use crate::move_data::MoveData;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Healing items a side may use on its active combatant instead of moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Potion,
    SuperPotion,
    HyperPotion,
    MaxPotion,
    FullRestore,
    FullHeal,
}

impl ItemKind {
    /// HP restored, or `None` for items that only cure.
    pub fn heal_amount(self, max_hp: u16) -> Option<u16> {
        match self {
            ItemKind::Potion => Some(20),
            ItemKind::SuperPotion => Some(50),
            ItemKind::HyperPotion => Some(200),
            ItemKind::MaxPotion | ItemKind::FullRestore => Some(max_hp),
            ItemKind::FullHeal => None,
        }
    }

    /// Whether the item removes a curable primary status and confusion.
    pub fn cures_status(self) -> bool {
        matches!(self, ItemKind::FullRestore | ItemKind::FullHeal)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let display_name = match self {
            ItemKind::Potion => "Potion",
            ItemKind::SuperPotion => "Super Potion",
            ItemKind::HyperPotion => "Hyper Potion",
            ItemKind::MaxPotion => "Max Potion",
            ItemKind::FullRestore => "Full Restore",
            ItemKind::FullHeal => "Full Heal",
        };
        write!(f, "{}", display_name)
    }
}

/// What a side asks its active combatant to do this turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TurnAction {
    /// A damaging move with caller-supplied metadata.
    Attack { move_data: MoveData },
    /// A move by name: a catalog effect, or one of the combatant's known attacks.
    UseMove { name: String },
    /// Bring in the combatant in `slot`. Also used to replace a fainted active.
    Switch { slot: usize },
    Item { item: ItemKind },
    Flee,
    /// Do nothing this turn.
    Skip,
}

/// A turn action with every name resolved, ready to execute.
#[derive(Debug, Clone)]
pub enum BattleAction<'a> {
    Attack(MoveData),
    Effect(&'a MoveEffectEntry),
    Switch(usize),
    Item(ItemKind),
    Flee,
    Skip,
}

impl BattleAction<'_> {
    pub fn move_name(&self) -> Option<&str> {
        match self {
            BattleAction::Attack(data) => Some(&data.name),
            BattleAction::Effect(entry) => Some(&entry.name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueuedAction<'a> {
    pub side: SideId,
    pub action: BattleAction<'a>,
}

// A helper struct local to this implementation detail.
#[derive(Debug, Clone, Copy)]
struct ActionPriority {
    action_priority: u8, // Flee: 3, Switch: 2, Item: 1, Move: 0
    move_priority: i8,
    speed: OrderedFloat<f64>,
}

/// The ordered queue of actions for one turn.
pub struct ActionStack<'a> {
    actions: VecDeque<QueuedAction<'a>>,
}

impl<'a> ActionStack<'a> {
    pub fn new() -> Self {
        Self {
            actions: VecDeque::new(),
        }
    }

    /// Resolve every submitted action and order them: action class, then move
    /// priority, then effective speed, then Player 1 before Player 2.
    pub fn build_initial(
        battle_state: &BattleState,
        submitted: &[(SideId, TurnAction)],
        catalog: &'a MoveEffectCatalog,
        rules: &BattleRules,
    ) -> EngineResult<Self> {
        let mut prioritized = Vec::with_capacity(submitted.len());
        for (side, action) in submitted {
            let resolved = Self::resolve_action(battle_state, *side, action, catalog)?;
            let priority = Self::calculate_action_priority(battle_state, *side, &resolved, rules)?;
            prioritized.push((*side, resolved, priority));
        }

        prioritized.sort_by(|a, b| {
            b.2.action_priority
                .cmp(&a.2.action_priority)
                .then(b.2.move_priority.cmp(&a.2.move_priority))
                .then(b.2.speed.cmp(&a.2.speed))
                .then(a.0.cmp(&b.0))
        });

        let mut stack = Self::new();
        for (side, action, priority) in prioritized {
            debug!(
                %side,
                action = ?action.move_name(),
                move_priority = priority.move_priority,
                speed = priority.speed.into_inner(),
                "queued action"
            );
            stack.push_back(QueuedAction { side, action });
        }
        Ok(stack)
    }

    pub fn push_back(&mut self, action: QueuedAction<'a>) {
        self.actions.push_back(action);
    }

    pub fn pop_front(&mut self) -> Option<QueuedAction<'a>> {
        self.actions.pop_front()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Sides in execution order, for inspection.
    pub fn order(&self) -> Vec<SideId> {
        self.actions.iter().map(|queued| queued.side).collect()
    }

    // --- Private Helper Functions ---

    fn resolve_action(
        battle_state: &BattleState,
        side: SideId,
        action: &TurnAction,
        catalog: &'a MoveEffectCatalog,
    ) -> EngineResult<BattleAction<'a>> {
        Ok(match action {
            TurnAction::Attack { move_data } => BattleAction::Attack(move_data.clone()),
            TurnAction::UseMove { name } => {
                if let Some(entry) = catalog.get(name) {
                    BattleAction::Effect(entry)
                } else {
                    let known = battle_state
                        .active(side)?
                        .find_move(name)
                        .cloned()
                        .ok_or_else(|| EngineError::MoveNotFound(name.clone()))?;
                    BattleAction::Attack(known)
                }
            }
            TurnAction::Switch { slot } => {
                battle_state.combatant(CombatantRef::new(side, *slot))?;
                BattleAction::Switch(*slot)
            }
            TurnAction::Item { item } => BattleAction::Item(*item),
            TurnAction::Flee => BattleAction::Flee,
            TurnAction::Skip => BattleAction::Skip,
        })
    }

    fn calculate_action_priority(
        battle_state: &BattleState,
        side: SideId,
        action: &BattleAction<'a>,
        rules: &BattleRules,
    ) -> EngineResult<ActionPriority> {
        let side_state = battle_state.side(side);
        let speed = OrderedFloat(effective_speed(battle_state.active(side)?, side_state, rules));
        let (action_priority, move_priority) = match action {
            BattleAction::Flee => (3, 0),
            BattleAction::Switch(_) => (2, 0),
            BattleAction::Item(_) => (1, 0),
            BattleAction::Skip => (0, 0),
            BattleAction::Attack(data) => (0, data.ordering_priority()),
            BattleAction::Effect(entry) => (0, entry.priority.clamp(-7, 7)),
        };
        Ok(ActionPriority {
            action_priority,
            move_priority,
            speed,
        })
    }
}

impl Default for ActionStack<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::state::Side;
    use crate::combatant::{ActiveStatus, Combatant, StatBlock};
    use pretty_assertions::assert_eq;
    use schema::{MonsterType, MoveCategory, StatusKind};

    fn runner(speed: u16) -> Combatant {
        Combatant::new(
            "Runner",
            vec![MonsterType::Normal],
            50,
            StatBlock::new(100, 50, 50, 50, 50, speed),
        )
        .with_moves(vec![MoveData::new(
            "Tackle",
            MonsterType::Normal,
            MoveCategory::Physical,
            40,
        )])
    }

    fn tackle() -> TurnAction {
        TurnAction::Attack {
            move_data: MoveData::new("Tackle", MonsterType::Normal, MoveCategory::Physical, 40),
        }
    }

    fn order_for(state: &BattleState, actions: &[(SideId, TurnAction)]) -> Vec<SideId> {
        let catalog = MoveEffectCatalog::standard().unwrap();
        ActionStack::build_initial(state, actions, catalog, &BattleRules::default())
            .unwrap()
            .order()
    }

    #[test]
    fn test_faster_side_moves_first() {
        let state = BattleState::new(Side::new(vec![runner(50)]), Side::new(vec![runner(80)]));
        let order = order_for(
            &state,
            &[(SideId::Player1, tackle()), (SideId::Player2, tackle())],
        );
        assert_eq!(order, vec![SideId::Player2, SideId::Player1]);
    }

    #[test]
    fn test_priority_beats_speed() {
        let state = BattleState::new(Side::new(vec![runner(50)]), Side::new(vec![runner(80)]));
        let quick = TurnAction::Attack {
            move_data: MoveData::new("Quick Attack", MonsterType::Normal, MoveCategory::Physical, 40)
                .with_priority(1),
        };
        let order = order_for(&state, &[(SideId::Player1, quick), (SideId::Player2, tackle())]);
        assert_eq!(order, vec![SideId::Player1, SideId::Player2]);
    }

    #[test]
    fn test_catalog_priority_is_used() {
        let state = BattleState::new(Side::new(vec![runner(50)]), Side::new(vec![runner(80)]));
        let protect = TurnAction::UseMove {
            name: "Protect".to_string(),
        };
        let order = order_for(&state, &[(SideId::Player1, protect), (SideId::Player2, tackle())]);
        assert_eq!(order, vec![SideId::Player1, SideId::Player2]);
    }

    #[test]
    fn test_paralysis_halves_speed_for_ordering() {
        let mut slow_after_paralysis = runner(100);
        slow_after_paralysis.primary = Some(ActiveStatus::new(StatusKind::Paralysis, None));
        let state = BattleState::new(
            Side::new(vec![slow_after_paralysis]),
            Side::new(vec![runner(60)]),
        );
        let order = order_for(
            &state,
            &[(SideId::Player1, tackle()), (SideId::Player2, tackle())],
        );
        assert_eq!(order, vec![SideId::Player2, SideId::Player1]);
    }

    #[test]
    fn test_speed_tie_favours_player_one() {
        let state = BattleState::new(Side::new(vec![runner(70)]), Side::new(vec![runner(70)]));
        let order = order_for(
            &state,
            &[(SideId::Player2, tackle()), (SideId::Player1, tackle())],
        );
        assert_eq!(order, vec![SideId::Player1, SideId::Player2]);
    }

    #[test]
    fn test_non_move_actions_go_first() {
        let mut team = vec![runner(10), runner(10)];
        team[1].name = "Bench".to_string();
        let state = BattleState::new(Side::new(team), Side::new(vec![runner(90)]));
        let quick = TurnAction::Attack {
            move_data: MoveData::new("Extreme Speed", MonsterType::Normal, MoveCategory::Physical, 80)
                .with_priority(7),
        };
        let order = order_for(
            &state,
            &[
                (SideId::Player1, TurnAction::Switch { slot: 1 }),
                (SideId::Player2, quick),
            ],
        );
        assert_eq!(order, vec![SideId::Player1, SideId::Player2]);
    }

    #[test]
    fn test_known_attack_resolves_by_name_and_unknown_fails() {
        let state = BattleState::new(Side::new(vec![runner(50)]), Side::new(vec![runner(50)]));
        let catalog = MoveEffectCatalog::standard().unwrap();
        let rules = BattleRules::default();

        let known = [(
            SideId::Player1,
            TurnAction::UseMove {
                name: "tackle".to_string(),
            },
        )];
        assert!(ActionStack::build_initial(&state, &known, catalog, &rules).is_ok());

        let unknown = [(
            SideId::Player1,
            TurnAction::UseMove {
                name: "Hyper Splash".to_string(),
            },
        )];
        assert_eq!(
            ActionStack::build_initial(&state, &unknown, catalog, &rules)
                .err()
                .unwrap(),
            EngineError::MoveNotFound("Hyper Splash".to_string())
        );
    }

    #[test]
    fn test_item_amounts() {
        assert_eq!(ItemKind::Potion.heal_amount(300), Some(20));
        assert_eq!(ItemKind::MaxPotion.heal_amount(300), Some(300));
        assert_eq!(ItemKind::FullHeal.heal_amount(300), None);
        assert!(ItemKind::FullRestore.cures_status());
        assert!(!ItemKind::HyperPotion.cures_status());
    }
}
