// Battle Engine Schema - Shared type definitions
// This crate contains the closed enums shared between the battle engine,
// its content data files and any caller that persists battle snapshots.

pub use battle_data::*;
pub use monster_types::*;
pub use status_kinds::*;

pub mod battle_data;
pub mod monster_types;
pub mod status_kinds;
