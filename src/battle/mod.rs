pub mod action_stack;
pub mod calculators;
pub mod commands;
pub mod conditions;
pub mod engine;
pub mod move_effects;
pub mod rng;
pub mod state;
pub mod stats;
pub mod switching;

#[cfg(test)]
mod tests;
