use schema::{MoveCategory, MonsterType, StatusKind};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A status a damaging move may leave on the target it hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryEffect {
    pub status: StatusKind,
    /// Percentage, clamped to `0..=100` when rolled.
    pub chance: u8,
}

/// Metadata for a damaging move, owned by the content layer and handed to the
/// engine with each attack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveData {
    pub name: String,
    pub move_type: MonsterType,
    pub category: MoveCategory,
    pub power: Option<u16>,
    /// Percentage to hit. `None` never misses.
    #[serde(default)]
    pub accuracy: Option<u8>,
    #[serde(default)]
    pub priority: i8,
    /// Added to the user's crit stage when rolling for a critical hit.
    #[serde(default)]
    pub crit_stage: u8,
    /// Whether the move touches its target, which triggers contact effects.
    #[serde(default)]
    pub contact: bool,
    #[serde(default)]
    pub secondary: Option<SecondaryEffect>,
}

impl MoveData {
    pub fn new(
        name: impl Into<String>,
        move_type: MonsterType,
        category: MoveCategory,
        power: u16,
    ) -> Self {
        Self {
            name: name.into(),
            move_type,
            category,
            power: Some(power),
            accuracy: Some(100),
            priority: 0,
            crit_stage: 0,
            contact: category == MoveCategory::Physical,
            secondary: None,
        }
    }

    pub fn with_accuracy(mut self, accuracy: Option<u8>) -> Self {
        self.accuracy = accuracy;
        self
    }

    pub fn with_priority(mut self, priority: i8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_crit_stage(mut self, crit_stage: u8) -> Self {
        self.crit_stage = crit_stage;
        self
    }

    pub fn with_contact(mut self, contact: bool) -> Self {
        self.contact = contact;
        self
    }

    pub fn with_secondary(mut self, status: StatusKind, chance: u8) -> Self {
        self.secondary = Some(SecondaryEffect { status, chance });
        self
    }

    /// Status-category moves and zero-power moves never enter the damage formula.
    pub fn is_damaging(&self) -> bool {
        self.category != MoveCategory::Status && self.power.unwrap_or(0) > 0
    }

    /// Priority bracket used for ordering, clamped to `-7..=7`.
    pub fn ordering_priority(&self) -> i8 {
        if !(-7..=7).contains(&self.priority) {
            warn!(
                move_name = %self.name,
                priority = self.priority,
                "move priority out of range, clamping"
            );
        }
        self.priority.clamp(-7, 7)
    }

    /// Accuracy as a percentage clamped to `0..=100`, or `None` for sure-hit moves.
    pub fn clamped_accuracy(&self) -> Option<u8> {
        self.accuracy.map(|accuracy| {
            if accuracy > 100 {
                warn!(move_name = %self.name, accuracy, "accuracy above 100, clamping");
            }
            accuracy.min(100)
        })
    }
}
