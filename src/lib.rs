//! Battle Resolution Engine
//!
//! Deterministic, in-process resolution of turn-based monster battles: type
//! effectiveness, stat stages, a registry of primary and volatile statuses,
//! weather and terrain, a sealed catalog of non-damaging move effects, damage
//! calculation, and a turn engine that emits an ordered event log.
//!
//! Every random decision goes through an injected [`BattleRng`], so a turn is a
//! pure function of its inputs and seed.

// --- MODULE DECLARATIONS ---
pub mod battle;
pub mod combatant;
pub mod config;
pub mod errors;
pub mod field;
pub mod move_catalog;
pub mod move_data;
pub mod status;
pub mod type_chart;

// --- PUBLIC API RE-EXPORTS ---

// --- From the `schema` crate ---
pub use schema::{
    Gender, Hazard, MonsterType, MoveCategory, SideCondition, StatKind, StatusKind, Terrain,
    Weather,
};

// --- From this crate's modules (`src/`) ---

// Turn resolution.
pub use battle::action_stack::{ItemKind, TurnAction};
pub use battle::calculators::{DamageCalculator, DamageHooks, DamageOutcome, NoHooks};
pub use battle::engine::{TurnEngine, TurnReport};
pub use battle::rng::{BattleRng, ScriptedRng, TurnRng};
pub use battle::state::{
    BattleEvent, BattleOutcome, BattleState, CombatantRef, EventBus, FailureReason, Side, SideId,
};

// Combatants and lookup tables.
pub use combatant::{ActiveStatus, Combatant, StatBlock, StatStages};
pub use config::BattleRules;
pub use field::FieldState;
pub use move_catalog::{MoveEffectCatalog, MoveEffectDescriptor, MoveEffectEntry};
pub use move_data::{MoveData, SecondaryEffect};
pub use status::{StatusEffectDefinition, StatusRegistry};
pub use type_chart::{effectiveness, Effectiveness};

// Crate-specific error and result types.
pub use errors::{ConfigError, ConfigResult, EngineError, EngineResult, LookupError};
