//! The decision-policy seam shared by every player.
//!
//! A [`Policy`] turns a board into an action. The searchers in
//! [`crate::expectimax`] and [`crate::montecarlo`] implement it, as does the
//! [`RandomPolicy`] baseline used for comparisons.

use rand::Rng;

use crate::engine::{Action, Board};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("no action is available on a finished board")]
    TerminalBoard,
    #[error("invalid search configuration: {0}")]
    InvalidConfig(String),
}

/// Chooses the next action for a board.
///
/// Implementations must not mutate the caller's board; any randomness is
/// drawn from the supplied `rng`.
pub trait Policy {
    /// Short identifier used in logs and result headers.
    fn name(&self) -> &'static str;

    /// Pick an action, or fail with [`SearchError::TerminalBoard`] when the
    /// board has no available action.
    fn best_action<R: Rng + ?Sized>(&mut self, board: &Board, rng: &mut R) -> Result<Action, SearchError>;

    /// Statistics of the last decision. Policies without a search report zeros.
    fn last_stats(&self) -> SearchStats { SearchStats::default() }
}

/// Per-branch value at the root.
///
/// - `ev` is the estimated value of taking `action` from the current board.
/// - `legal` is false when the action does not change the board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchEval {
    pub action: Action,
    pub ev: f64,
    pub legal: bool,
}

impl BranchEval {
    pub(crate) fn illegal(action: Action) -> Self { Self { action, ev: 0.0, legal: false } }

    pub(crate) fn blank() -> [BranchEval; 4] { Action::ALL.map(BranchEval::illegal) }
}

/// Pick the strictly best legal branch; earlier actions win ties.
pub fn best_branch(branches: &[BranchEval]) -> Option<&BranchEval> {
    branches.iter().filter(|b| b.legal).fold(None, |best: Option<&BranchEval>, b| match best {
        Some(cur) if cur.ev >= b.ev => Some(cur),
        _ => Some(b),
    })
}

/// Basic search stats for a single decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Nodes (expectimax) or playout moves (Monte-Carlo) of the last call.
    pub nodes: u64,
    /// Largest `nodes` value seen since the last reset.
    pub peak_nodes: u64,
}

impl SearchStats {
    pub(crate) fn record(&mut self, nodes: u64) {
        self.nodes = nodes;
        self.peak_nodes = self.peak_nodes.max(nodes);
    }
}

/// Plays a uniformly random available action.
///
/// ```
/// use gen_2048::engine::{Board, GameConfig};
/// use gen_2048::policy::{Policy, RandomPolicy};
/// use rand::{rngs::StdRng, SeedableRng};
/// let mut rng = StdRng::seed_from_u64(3);
/// let b = Board::new(GameConfig::default(), &mut rng).unwrap();
/// let a = RandomPolicy.best_action(&b, &mut rng).unwrap();
/// assert!(b.is_action_available(a));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPolicy;

impl Policy for RandomPolicy {
    fn name(&self) -> &'static str { "random" }

    fn best_action<R: Rng + ?Sized>(&mut self, board: &Board, rng: &mut R) -> Result<Action, SearchError> {
        board.available_actions().choose(rng).ok_or(SearchError::TerminalBoard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GameConfig;
    use rand::{rngs::StdRng, SeedableRng};

    fn eval(action: Action, ev: f64, legal: bool) -> BranchEval { BranchEval { action, ev, legal } }

    #[test]
    fn best_branch_prefers_first_on_ties() {
        let branches = [
            eval(Action::Left, 3.0, true),
            eval(Action::Up, 5.0, true),
            eval(Action::Right, 5.0, true),
            eval(Action::Down, 9.0, false),
        ];
        assert_eq!(best_branch(&branches).map(|b| b.action), Some(Action::Up));
        assert_eq!(best_branch(&BranchEval::blank()), None);
    }

    #[test]
    fn random_policy_only_picks_available() {
        let cfg = GameConfig::new(2, 2, 1).unwrap();
        let board = Board::from_grid(cfg, &[0, 1, 0, 2], 0).unwrap();
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..20 {
            assert_eq!(RandomPolicy.best_action(&board, &mut rng), Ok(Action::Left));
        }
        let done = Board::from_grid(cfg, &[1, 2, 2, 1], 0).unwrap();
        assert_eq!(RandomPolicy.best_action(&done, &mut rng), Err(SearchError::TerminalBoard));
    }

    #[test]
    fn stats_track_peak() {
        let mut stats = SearchStats::default();
        stats.record(10);
        stats.record(4);
        assert_eq!(stats, SearchStats { nodes: 4, peak_nodes: 10 });
    }
}
