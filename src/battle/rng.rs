use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use tracing::trace;

/// Source of every random decision made while resolving a turn.
///
/// Implementors only supply uniform draws in `[0, 1]`; the helpers built on top
/// skip the draw entirely when the outcome is already certain, so a guaranteed
/// critical hit or a fixed duration never consumes randomness.
pub trait BattleRng {
    /// A uniform draw in `[0, 1]`. `reason` names the roll for tracing.
    fn next_unit(&mut self, reason: &str) -> f64;

    /// True with the given probability.
    fn chance(&mut self, probability: f64, reason: &str) -> bool {
        if probability >= 1.0 {
            return true;
        }
        if probability <= 0.0 {
            return false;
        }
        self.next_unit(reason) < probability
    }

    /// Uniform integer in `min..=max`.
    fn range_inclusive(&mut self, min: u8, max: u8, reason: &str) -> u8 {
        if min >= max {
            return min;
        }
        let span = (max - min) as f64 + 1.0;
        let offset = (self.next_unit(reason) * span).floor() as u8;
        min + offset.min(max - min)
    }

    /// Uniform real in `[low, high]`.
    fn factor_in(&mut self, low: f64, high: f64, reason: &str) -> f64 {
        if low >= high {
            return low;
        }
        low + self.next_unit(reason) * (high - low)
    }

    /// Uniform index into a collection of `len` elements.
    fn pick_index(&mut self, len: usize, reason: &str) -> usize {
        if len <= 1 {
            return 0;
        }
        let index = (self.next_unit(reason) * len as f64).floor() as usize;
        index.min(len - 1)
    }
}

/// Seedable random source for live battles and replays.
#[derive(Debug, Clone)]
pub struct TurnRng {
    inner: StdRng,
}

impl TurnRng {
    /// Same seed, same battle.
    pub fn from_seed_u64(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            inner: StdRng::from_os_rng(),
        }
    }
}

impl BattleRng for TurnRng {
    fn next_unit(&mut self, reason: &str) -> f64 {
        let value: f64 = self.inner.random();
        trace!(reason, value, "rng draw");
        value
    }
}

/// A fixed queue of draws for tests and exact replays.
///
/// Once the queue runs dry every further draw returns the fallback, which
/// defaults to 0.5.
#[derive(Debug, Clone)]
pub struct ScriptedRng {
    draws: VecDeque<f64>,
    fallback: f64,
    consumed: usize,
}

impl ScriptedRng {
    pub fn new(draws: Vec<f64>) -> Self {
        Self {
            draws: draws.into_iter().map(|d| d.clamp(0.0, 1.0)).collect(),
            fallback: 0.5,
            consumed: 0,
        }
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback.clamp(0.0, 1.0);
        self
    }

    /// Draws not yet consumed.
    pub fn remaining(&self) -> usize {
        self.draws.len()
    }

    /// Draws handed out so far, including fallbacks.
    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

impl BattleRng for ScriptedRng {
    fn next_unit(&mut self, reason: &str) -> f64 {
        let value = self.draws.pop_front().unwrap_or(self.fallback);
        self.consumed += 1;
        trace!(reason, value, "scripted draw");
        value
    }
}
