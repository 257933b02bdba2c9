//! ---
//! cm_section: "07-fault-injection"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Random sources backing the attack level and assault selection."
//! cm_version: "v0.0.0-prealpha"
//! cm_owner: "tbd"
//! ---
use std::fmt;

use anyhow::{bail, Result};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform integer source used for every random decision of the engine.
pub trait RandomSource: Send + Sync + fmt::Debug {
    /// Draw uniformly from the inclusive range `[low, high]`.
    fn draw(&self, low: u64, high: u64) -> Result<u64>;
}

/// Thread-local generator; no shared state, so concurrent callers never contend.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn draw(&self, low: u64, high: u64) -> Result<u64> {
        if low > high {
            bail!("empty draw range {}..={}", low, high);
        }
        Ok(rand::thread_rng().gen_range(low..=high))
    }
}

/// Deterministic generator for drills and reproducible experiments.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn draw(&self, low: u64, high: u64) -> Result<u64> {
        if low > high {
            bail!("empty draw range {}..={}", low, high);
        }
        Ok(self.rng.lock().gen_range(low..=high))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_stay_in_range() {
        let sources: [&dyn RandomSource; 2] = [&ThreadRandom, &SeededRandom::new(7)];
        for source in sources {
            for _ in 0..1_000 {
                let value = source.draw(50, 150).unwrap();
                assert!((50..=150).contains(&value));
            }
            assert_eq!(source.draw(100, 100).unwrap(), 100);
        }
    }

    #[test]
    fn empty_range_is_an_error() {
        assert!(ThreadRandom.draw(2, 1).is_err());
        assert!(SeededRandom::new(1).draw(2, 1).is_err());
    }

    #[test]
    fn seeded_source_is_reproducible() {
        let a = SeededRandom::new(0xC0FFEE);
        let b = SeededRandom::new(0xC0FFEE);
        let left: Vec<u64> = (0..32).map(|_| a.draw(1, 1_000).unwrap()).collect();
        let right: Vec<u64> = (0..32).map(|_| b.draw(1, 1_000).unwrap()).collect();
        assert_eq!(left, right);
    }
}
