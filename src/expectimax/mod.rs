//! Depth-limited expectimax policy for the generalized game.
//!
//! Max layers enumerate the player's actions (sliding without a spawn); chance
//! layers enumerate tile spawns. Leaves are scored with [`evaluate`].
//!
//! Notes
//! - Chance layers model two spawned tiles. When more than two cells are
//!   empty, a random subset of at most `spawn_sample_cap` cells is expanded,
//!   so the returned value is a Monte-Carlo estimate of the expectation.
//!   Randomness comes only from the `rng` passed to each call.
//! - Each branch works on its own copy of the board; the caller's board is
//!   never touched.
//!
//! Quick start
//! ```
//! use gen_2048::engine::{Board, GameConfig};
//! use gen_2048::expectimax::{Expectimax, ExpectimaxConfig};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(123);
//! let b0 = Board::new(GameConfig::default(), &mut rng).unwrap();
//!
//! let cfg = ExpectimaxConfig { max_depth: 2, ..Default::default() };
//! let mut ex = Expectimax::with_config(cfg).unwrap();
//! let action = ex.best_action(&b0, &mut rng).unwrap();
//! assert!(b0.is_action_available(action));
//! ```

mod heuristic;
mod search;

pub use heuristic::{evaluate, HeuristicWeights};
pub use search::{Expectimax, Layer};

use crate::engine::Power;
use crate::policy::SearchError;

/// Outcomes of a single spawned tile: `(power, probability)`.
pub(crate) const SINGLE_SPAWNS: [(Power, f64); 2] = [(1, 0.9), (2, 0.1)];

/// Outcomes of two spawned tiles: `(first power, second power, probability)`.
pub(crate) const PAIR_SPAWNS: [(Power, Power, f64); 4] = [(1, 1, 0.81), (1, 2, 0.09), (2, 1, 0.09), (2, 2, 0.01)];

/// Configurable knobs for Expectimax. Defaults preserve documented behavior.
///
/// - `max_depth`: number of player moves looked ahead (must be at least 1).
/// - `spawn_sample_cap`: empty cells expanded per chance layer (at least 2;
///   `usize::MAX` enumerates every pair).
/// - `weights`: leaf evaluation weights.
#[derive(Debug, Clone)]
pub struct ExpectimaxConfig {
    pub max_depth: u32,
    pub spawn_sample_cap: usize,
    pub weights: HeuristicWeights,
}

impl Default for ExpectimaxConfig {
    fn default() -> Self { Self { max_depth: 5, spawn_sample_cap: 2, weights: HeuristicWeights::default() } }
}

impl ExpectimaxConfig {
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.max_depth == 0 {
            return Err(SearchError::InvalidConfig("max_depth must be at least 1".into()));
        }
        if self.spawn_sample_cap < 2 {
            return Err(SearchError::InvalidConfig(format!(
                "spawn_sample_cap must be at least 2, got {}",
                self.spawn_sample_cap
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_tables_are_distributions() {
        let single: f64 = SINGLE_SPAWNS.iter().map(|s| s.1).sum();
        let pair: f64 = PAIR_SPAWNS.iter().map(|s| s.2).sum();
        assert!((single - 1.0).abs() < 1e-12);
        assert!((pair - 1.0).abs() < 1e-12);
    }

    #[test]
    fn config_validation() {
        assert!(ExpectimaxConfig::default().validate().is_ok());
        assert!(ExpectimaxConfig { max_depth: 0, ..Default::default() }.validate().is_err());
        assert!(ExpectimaxConfig { spawn_sample_cap: 1, ..Default::default() }.validate().is_err());
        assert!(ExpectimaxConfig { spawn_sample_cap: usize::MAX, ..Default::default() }.validate().is_ok());
    }
}
