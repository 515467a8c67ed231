//! Flat Monte-Carlo policy: one-ply lookahead scored by random playouts.
//!
//! For every available action the board is copied, the action applied (with
//! its real random spawn), and `rollouts` uniformly random games are played
//! to the end from there. The action with the highest mean final score wins.
//! Nothing is kept between decisions and there is no exploration term.

use log::debug;
use rand::Rng;

use crate::engine::{Action, Board};
use crate::policy::{best_branch, BranchEval, Policy, SearchError, SearchStats};

/// Configurable knobs for the Monte-Carlo searcher.
///
/// - `rollouts`: random playouts per candidate action (`K`, at least 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonteCarloConfig {
    pub rollouts: usize,
}

impl Default for MonteCarloConfig {
    fn default() -> Self { Self { rollouts: 50 } }
}

impl MonteCarloConfig {
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.rollouts == 0 {
            return Err(SearchError::InvalidConfig("rollouts must be at least 1".into()));
        }
        Ok(())
    }
}

/// A finished random game.
#[derive(Debug, Clone, Copy)]
pub struct Playout {
    /// Terminal board.
    pub board: Board,
    /// Moves played to reach it.
    pub moves: u64,
}

/// Play uniformly random available actions from `board` until none remain.
///
/// ```
/// use gen_2048::engine::{Board, GameConfig};
/// use gen_2048::montecarlo::random_playout;
/// use rand::{rngs::StdRng, SeedableRng};
/// let mut rng = StdRng::seed_from_u64(5);
/// let b = Board::new(GameConfig::new(3, 2, 1).unwrap(), &mut rng).unwrap();
/// let end = random_playout(&b, &mut rng);
/// assert!(end.board.game_over());
/// assert!(end.board.score() >= b.score());
/// ```
pub fn random_playout<R: Rng + ?Sized>(board: &Board, rng: &mut R) -> Playout {
    let mut board = *board;
    let mut moves = 0;
    while let Some(action) = board.available_actions().choose(rng) {
        board.apply(action, rng);
        moves += 1;
    }
    Playout { board, moves }
}

/// Flat Monte-Carlo search.
#[derive(Debug, Clone)]
pub struct MonteCarlo {
    cfg: MonteCarloConfig,
    stats: SearchStats,
}

impl MonteCarlo {
    pub fn new() -> Self { Self { cfg: MonteCarloConfig::default(), stats: SearchStats::default() } }

    pub fn with_config(cfg: MonteCarloConfig) -> Result<Self, SearchError> {
        cfg.validate()?;
        Ok(Self { cfg, stats: SearchStats::default() })
    }

    #[inline]
    pub fn config(&self) -> &MonteCarloConfig { &self.cfg }

    /// Action with the highest mean playout score; earlier actions win ties.
    ///
    /// ```
    /// use gen_2048::engine::{Board, GameConfig};
    /// use gen_2048::montecarlo::{MonteCarlo, MonteCarloConfig};
    /// use rand::{rngs::StdRng, SeedableRng};
    /// let mut rng = StdRng::seed_from_u64(21);
    /// let b = Board::new(GameConfig::new(3, 2, 1).unwrap(), &mut rng).unwrap();
    /// let mut mc = MonteCarlo::with_config(MonteCarloConfig { rollouts: 5 }).unwrap();
    /// let a = mc.best_action(&b, &mut rng).unwrap();
    /// assert!(b.is_action_available(a));
    /// ```
    pub fn best_action<R: Rng + ?Sized>(&mut self, board: &Board, rng: &mut R) -> Result<Action, SearchError> {
        let means = self.action_means(board, rng);
        let best = best_branch(&means).ok_or(SearchError::TerminalBoard)?;
        debug!(
            "monte-carlo chose {} (mean {:.1} over {} playouts, {} playout moves)",
            best.action, best.ev, self.cfg.rollouts, self.stats.nodes
        );
        Ok(best.action)
    }

    /// Mean final score of `rollouts` playouts after each action, in
    /// `Action::ALL` order. Unavailable actions are marked `legal=false`.
    pub fn action_means<R: Rng + ?Sized>(&mut self, board: &Board, rng: &mut R) -> [BranchEval; 4] {
        let mut moves = 0u64;
        let mut out = BranchEval::blank();
        for (slot, action) in out.iter_mut().zip(Action::ALL) {
            if !board.is_action_available(action) {
                continue;
            }
            let mut after = *board;
            after.apply(action, rng);
            let mut total = 0.0;
            for _ in 0..self.cfg.rollouts {
                let end = random_playout(&after, rng);
                total += end.board.score() as f64;
                moves += end.moves;
            }
            *slot = BranchEval { action, ev: total / self.cfg.rollouts as f64, legal: true };
        }
        self.stats.record(moves);
        out
    }

    #[inline]
    pub fn last_stats(&self) -> SearchStats { self.stats }

    #[inline]
    pub fn reset_stats(&mut self) { self.stats = SearchStats::default(); }
}

impl Default for MonteCarlo {
    fn default() -> Self { Self::new() }
}

impl Policy for MonteCarlo {
    fn name(&self) -> &'static str { "montecarlo" }

    fn best_action<R: Rng + ?Sized>(&mut self, board: &Board, rng: &mut R) -> Result<Action, SearchError> {
        MonteCarlo::best_action(self, board, rng)
    }

    fn last_stats(&self) -> SearchStats { self.stats }
}
