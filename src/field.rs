//! Weather and terrain: damage multipliers, residual damage and the field timers.

use schema::{MonsterType, Terrain, Weather};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Damage multiplier for a move of `move_type` under `weather`.
pub fn weather_type_multiplier(weather: Weather, move_type: MonsterType) -> f64 {
    match (weather, move_type) {
        (Weather::Rain, MonsterType::Water) => 1.5,
        (Weather::Rain, MonsterType::Fire) => 0.5,
        (Weather::Sunny, MonsterType::Fire) => 1.5,
        (Weather::Sunny, MonsterType::Water) => 0.5,
        (Weather::Snow, MonsterType::Ice) => 1.2,
        _ => 1.0,
    }
}

/// Damage multiplier for a move of `move_type` on `terrain`.
pub fn terrain_type_multiplier(terrain: Terrain, move_type: MonsterType) -> f64 {
    match (terrain, move_type) {
        (Terrain::Electric, MonsterType::Electric)
        | (Terrain::Grassy, MonsterType::Grass)
        | (Terrain::Misty, MonsterType::Fairy)
        | (Terrain::Psychic, MonsterType::Psychic) => 1.3,
        _ => 1.0,
    }
}

/// Combined weather and terrain multiplier applied in the damage formula.
pub fn type_multiplier(weather: Weather, terrain: Terrain, move_type: MonsterType) -> f64 {
    weather_type_multiplier(weather, move_type) * terrain_type_multiplier(terrain, move_type)
}

/// Types that take no residual damage from `weather`.
pub fn weather_immune_types(weather: Weather) -> &'static [MonsterType] {
    match weather {
        Weather::Sandstorm => &[MonsterType::Rock, MonsterType::Ground, MonsterType::Steel],
        Weather::Hail => &[MonsterType::Ice],
        _ => &[],
    }
}

/// Fraction of max HP lost at end of turn to `weather`; 0 if any of the
/// defender's types is immune.
pub fn residual_damage_fraction(weather: Weather, defender_types: &[MonsterType]) -> f64 {
    let base = match weather {
        Weather::Sandstorm | Weather::Hail => 1.0 / 16.0,
        _ => return 0.0,
    };
    let immune = weather_immune_types(weather);
    if defender_types.iter().any(|t| immune.contains(t)) {
        0.0
    } else {
        base
    }
}

/// Accuracy multiplier applied to every move under `weather`.
pub fn weather_accuracy_multiplier(weather: Weather) -> f64 {
    match weather {
        Weather::Sandstorm => 0.8,
        Weather::Hail => 0.9,
        Weather::Fog => 0.6,
        _ => 1.0,
    }
}

/// Fraction of max HP restored to every combatant at end of turn by `terrain`.
pub fn terrain_heal_fraction(terrain: Terrain) -> f64 {
    match terrain {
        Terrain::Grassy => 1.0 / 16.0,
        _ => 0.0,
    }
}

/// Which field-wide condition changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Weather(Weather),
    Terrain(Terrain),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Weather(weather) => write!(f, "{} weather", weather),
            FieldKind::Terrain(terrain) => write!(f, "{} terrain", terrain),
        }
    }
}

/// A field timer change produced by setting or ticking a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldChange {
    pub kind: FieldKind,
    /// Turns left; `None` for an indefinite condition, 0 once reverted.
    pub remaining: Option<u8>,
}

/// Field-wide state shared by both sides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldState {
    pub weather: Weather,
    /// `None` while clear or for weather that never expires.
    pub weather_turns: Option<u8>,
    pub terrain: Terrain,
    pub terrain_turns: Option<u8>,
}

impl FieldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weather(mut self, weather: Weather, turns: Option<u8>) -> Self {
        self.set_weather(weather, turns);
        self
    }

    pub fn with_terrain(mut self, terrain: Terrain, turns: Option<u8>) -> Self {
        self.set_terrain(terrain, turns);
        self
    }

    /// Replace the weather. Setting `Clear` drops any timer.
    pub fn set_weather(&mut self, weather: Weather, turns: Option<u8>) -> FieldChange {
        self.weather = weather;
        self.weather_turns = if weather == Weather::Clear { None } else { turns };
        FieldChange {
            kind: FieldKind::Weather(weather),
            remaining: self.weather_turns,
        }
    }

    /// Replace the terrain. Setting `Normal` drops any timer.
    pub fn set_terrain(&mut self, terrain: Terrain, turns: Option<u8>) -> FieldChange {
        self.terrain = terrain;
        self.terrain_turns = if terrain == Terrain::Normal { None } else { turns };
        FieldChange {
            kind: FieldKind::Terrain(terrain),
            remaining: self.terrain_turns,
        }
    }

    /// End-of-turn countdown. Timed conditions lose a turn; one that reaches 0
    /// reverts to clear weather or normal terrain.
    pub fn tick(&mut self) -> Vec<FieldChange> {
        let mut changes = Vec::new();

        if let Some(turns) = self.weather_turns {
            let remaining = turns.saturating_sub(1);
            if remaining == 0 {
                self.set_weather(Weather::Clear, None);
                changes.push(FieldChange {
                    kind: FieldKind::Weather(Weather::Clear),
                    remaining: Some(0),
                });
            } else {
                self.weather_turns = Some(remaining);
                changes.push(FieldChange {
                    kind: FieldKind::Weather(self.weather),
                    remaining: Some(remaining),
                });
            }
        }

        if let Some(turns) = self.terrain_turns {
            let remaining = turns.saturating_sub(1);
            if remaining == 0 {
                self.set_terrain(Terrain::Normal, None);
                changes.push(FieldChange {
                    kind: FieldKind::Terrain(Terrain::Normal),
                    remaining: Some(0),
                });
            } else {
                self.terrain_turns = Some(remaining);
                changes.push(FieldChange {
                    kind: FieldKind::Terrain(self.terrain),
                    remaining: Some(remaining),
                });
            }
        }

        changes
    }
}
