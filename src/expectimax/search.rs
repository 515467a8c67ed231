use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::engine::{Action, Board, Coord};
use crate::policy::{best_branch, BranchEval, Policy, SearchError, SearchStats};

use super::heuristic::evaluate;
use super::{ExpectimaxConfig, PAIR_SPAWNS, SINGLE_SPAWNS};

/// Kind of node a search starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// The player picks an action.
    Max,
    /// Tiles spawn at random.
    Chance,
}

/// Single-threaded, depth-limited Expectimax search.
#[derive(Debug, Clone)]
pub struct Expectimax {
    cfg: ExpectimaxConfig,
    stats: SearchStats,
}

impl Expectimax {
    pub fn new() -> Self { Self { cfg: ExpectimaxConfig::default(), stats: SearchStats::default() } }

    pub fn with_config(cfg: ExpectimaxConfig) -> Result<Self, SearchError> {
        cfg.validate()?;
        Ok(Self { cfg, stats: SearchStats::default() })
    }

    #[inline]
    pub fn config(&self) -> &ExpectimaxConfig { &self.cfg }

    /// Compute the best action using expectimax.
    ///
    /// Fails with [`SearchError::TerminalBoard`] when no action is available.
    ///
    /// Example
    /// ```
    /// use gen_2048::engine::{Board, GameConfig};
    /// use gen_2048::expectimax::{Expectimax, ExpectimaxConfig};
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(7);
    /// let b = Board::new(GameConfig::default(), &mut rng).unwrap();
    /// let mut ex = Expectimax::with_config(ExpectimaxConfig { max_depth: 2, ..Default::default() }).unwrap();
    /// assert!(ex.best_action(&b, &mut rng).is_ok());
    /// ```
    pub fn best_action<R: Rng + ?Sized>(&mut self, board: &Board, rng: &mut R) -> Result<Action, SearchError> {
        let mut nodes = 0u64;
        let (value, action) = self.max_layer(board, 0, rng, &mut nodes);
        self.stats.record(nodes);
        let action = action.ok_or(SearchError::TerminalBoard)?;
        debug!("expectimax chose {action} (value {value:.2}, {nodes} nodes)");
        Ok(action)
    }

    /// Value of `board` when entered as a `layer` node at `depth`.
    pub fn evaluate_at<R: Rng + ?Sized>(&mut self, board: &Board, depth: u32, layer: Layer, rng: &mut R) -> f64 {
        let mut nodes = 0u64;
        let value = match layer {
            Layer::Max => self.max_layer(board, depth, rng, &mut nodes).0,
            Layer::Chance => self.chance_layer(board, depth, rng, &mut nodes),
        };
        self.stats.record(nodes);
        value
    }

    /// Compute EV for each action at the root.
    ///
    /// Returns a fixed array in `Action::ALL` order and marks actions that do
    /// not change the board as `legal=false`. Consumes `rng` exactly like
    /// [`Self::best_action`], so both agree under the same seed.
    ///
    /// ```
    /// use gen_2048::engine::{Board, GameConfig};
    /// use gen_2048::expectimax::{Expectimax, ExpectimaxConfig};
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(9);
    /// let b = Board::new(GameConfig::default(), &mut rng).unwrap();
    /// let mut ex = Expectimax::with_config(ExpectimaxConfig { max_depth: 1, ..Default::default() }).unwrap();
    /// let branches = ex.branch_evals(&b, &mut rng);
    /// assert_eq!(branches.len(), 4);
    /// assert!(branches.iter().any(|br| br.legal));
    /// ```
    pub fn branch_evals<R: Rng + ?Sized>(&mut self, board: &Board, rng: &mut R) -> [BranchEval; 4] {
        let mut nodes = 1u64;
        let mut out = BranchEval::blank();
        for (slot, action) in out.iter_mut().zip(Action::ALL) {
            if let Some(child) = board.shifted(action) {
                let ev = self.chance_layer(&child, 0, rng, &mut nodes);
                *slot = BranchEval { action, ev, legal: true };
            }
        }
        self.stats.record(nodes);
        out
    }

    /// EV at the root: the best branch EV, or the leaf evaluation of a
    /// finished board.
    pub fn state_value<R: Rng + ?Sized>(&mut self, board: &Board, rng: &mut R) -> f64 {
        let branches = self.branch_evals(board, rng);
        best_branch(&branches).map_or_else(|| evaluate(board, &self.cfg.weights), |b| b.ev)
    }

    /// Statistics collected from the last search call.
    #[inline]
    pub fn last_stats(&self) -> SearchStats { self.stats }

    /// Reset accumulated stats to zero.
    #[inline]
    pub fn reset_stats(&mut self) { self.stats = SearchStats::default(); }

    fn max_layer<R: Rng + ?Sized>(
        &self,
        board: &Board,
        depth: u32,
        rng: &mut R,
        nodes: &mut u64,
    ) -> (f64, Option<Action>) {
        *nodes += 1;
        if depth >= self.cfg.max_depth {
            return (evaluate(board, &self.cfg.weights), None);
        }
        let mut best_value = f64::NEG_INFINITY;
        let mut best_action = None;
        for action in Action::ALL {
            let Some(child) = board.shifted(action) else { continue };
            let value = self.chance_layer(&child, depth, rng, nodes);
            if value > best_value {
                best_value = value;
                best_action = Some(action);
            }
        }
        match best_action {
            Some(_) => (best_value, best_action),
            None => (evaluate(board, &self.cfg.weights), None),
        }
    }

    fn chance_layer<R: Rng + ?Sized>(&self, board: &Board, depth: u32, rng: &mut R, nodes: &mut u64) -> f64 {
        *nodes += 1;
        let spawn_points = board.spawn_points();
        match spawn_points.len() {
            0 => evaluate(board, &self.cfg.weights),
            1 => {
                let cell = spawn_points[0];
                let mut total = 0.0;
                for (power, prob) in SINGLE_SPAWNS {
                    let mut child = *board;
                    child.place(cell, power);
                    total += prob * self.max_layer(&child, depth + 1, rng, nodes).0;
                }
                total
            }
            empty => {
                let considered = empty.min(self.cfg.spawn_sample_cap);
                let chosen: Vec<Coord> = spawn_points.choose_multiple(rng, considered).copied().collect();
                let pairs = (considered * (considered - 1) / 2) as f64;
                let mut total = 0.0;
                for (i, &first) in chosen.iter().enumerate() {
                    for &second in &chosen[i + 1..] {
                        for (p1, p2, prob) in PAIR_SPAWNS {
                            let mut child = *board;
                            child.place(first, p1);
                            child.place(second, p2);
                            total += prob / pairs * self.max_layer(&child, depth + 1, rng, nodes).0;
                        }
                    }
                }
                total
            }
        }
    }
}

impl Default for Expectimax {
    fn default() -> Self { Self::new() }
}

impl Policy for Expectimax {
    fn name(&self) -> &'static str { "expectimax" }

    fn best_action<R: Rng + ?Sized>(&mut self, board: &Board, rng: &mut R) -> Result<Action, SearchError> {
        Expectimax::best_action(self, board, rng)
    }

    fn last_stats(&self) -> SearchStats { self.stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{GameConfig, Power};
    use crate::expectimax::HeuristicWeights;
    use rand::{rngs::StdRng, SeedableRng};

    fn depth(max_depth: u32) -> Expectimax {
        Expectimax::with_config(ExpectimaxConfig { max_depth, ..Default::default() }).unwrap()
    }

    fn exhaustive(max_depth: u32) -> Expectimax {
        Expectimax::with_config(ExpectimaxConfig { max_depth, spawn_sample_cap: usize::MAX, ..Default::default() })
            .unwrap()
    }

    fn pair_value(b: &Board, first: Coord, second: Coord, w: &HeuristicWeights) -> f64 {
        PAIR_SPAWNS
            .iter()
            .map(|&(p1, p2, prob)| {
                let mut child = *b;
                child.set_cell_power(first, p1).unwrap();
                child.set_cell_power(second, p2).unwrap();
                prob * evaluate(&child, w)
            })
            .sum()
    }

    fn board(size: usize, grid: &[Power]) -> Board {
        Board::from_grid(GameConfig::new(size, 2, 1).unwrap(), grid, 0).unwrap()
    }

    #[test]
    fn rejects_terminal_board() {
        let mut rng = StdRng::seed_from_u64(1);
        let done = board(2, &[1, 2, 2, 1]);
        assert_eq!(depth(3).best_action(&done, &mut rng), Err(SearchError::TerminalBoard));
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = ExpectimaxConfig { max_depth: 0, ..Default::default() };
        assert!(matches!(Expectimax::with_config(cfg), Err(SearchError::InvalidConfig(_))));
    }

    #[test]
    fn leaf_depth_returns_evaluation() {
        let mut rng = StdRng::seed_from_u64(1);
        let b = board(3, &[1, 1, 0, 0, 2, 0, 0, 0, 3]);
        let mut ex = depth(2);
        let expected = evaluate(&b, &HeuristicWeights::default());
        assert_eq!(ex.evaluate_at(&b, 2, Layer::Max, &mut rng), expected);
        assert_eq!(ex.last_stats().nodes, 1);
    }

    #[test]
    fn chance_layer_with_one_empty_cell() {
        let mut rng = StdRng::seed_from_u64(2);
        let b = board(2, &[1, 2, 3, 0]);
        let w = HeuristicWeights::default();
        let mut low = b;
        low.set_cell_power((1, 1), 1).unwrap();
        let mut high = b;
        high.set_cell_power((1, 1), 2).unwrap();
        let expected = 0.9 * evaluate(&low, &w) + 0.1 * evaluate(&high, &w);
        let got = depth(1).evaluate_at(&b, 0, Layer::Chance, &mut rng);
        assert!((got - expected).abs() < 1e-9, "{got} vs {expected}");
    }

    #[test]
    fn chance_layer_with_two_empty_cells() {
        let mut rng = StdRng::seed_from_u64(3);
        let b = board(2, &[0, 2, 3, 0]);
        let w = HeuristicWeights::default();
        let expected: f64 = PAIR_SPAWNS
            .iter()
            .map(|&(p1, p2, prob)| {
                let mut child = b;
                child.set_cell_power((0, 0), p1).unwrap();
                child.set_cell_power((1, 1), p2).unwrap();
                prob * evaluate(&child, &w)
            })
            .sum();
        let got = depth(1).evaluate_at(&b, 0, Layer::Chance, &mut rng);
        assert!((got - expected).abs() < 1e-9, "{got} vs {expected}");
    }

    #[test]
    fn default_cap_expands_one_sampled_pair() {
        let b = board(3, &[0, 2, 0, 3, 0, 1, 0, 4, 0]);
        let w = HeuristicWeights::default();
        assert_eq!(b.empty_count(), 5);

        let mut replay = StdRng::seed_from_u64(6);
        let chosen: Vec<Coord> = b.spawn_points().choose_multiple(&mut replay, 2).copied().collect();
        let expected = pair_value(&b, chosen[0], chosen[1], &w);

        let got = depth(1).evaluate_at(&b, 0, Layer::Chance, &mut StdRng::seed_from_u64(6));
        assert!((got - expected).abs() < 1e-9, "{got} vs {expected}");

        let empties = b.spawn_points();
        let mut pair_values = Vec::new();
        for (i, &first) in empties.iter().enumerate() {
            for &second in &empties[i + 1..] {
                pair_values.push(pair_value(&b, first, second, &w));
            }
        }
        let mean = pair_values.iter().sum::<f64>() / pair_values.len() as f64;
        assert!(pair_values.iter().any(|v| (v - got).abs() < 1e-9));
        let full = exhaustive(1).evaluate_at(&b, 0, Layer::Chance, &mut StdRng::seed_from_u64(6));
        assert!((full - mean).abs() < 1e-9, "{full} vs {mean}");
    }

    #[test]
    fn full_enumeration_matches_sampling_on_two_cells() {
        let b = board(2, &[0, 2, 3, 0]);
        let mut sampled = depth(2);
        let mut full = exhaustive(2);
        let a = sampled.evaluate_at(&b, 0, Layer::Chance, &mut StdRng::seed_from_u64(4));
        let c = full.evaluate_at(&b, 0, Layer::Chance, &mut StdRng::seed_from_u64(4));
        assert!((a - c).abs() < 1e-9);
    }

    #[test]
    fn full_enumeration_averages_all_pairs() {
        let mut rng = StdRng::seed_from_u64(5);
        let b = board(2, &[0, 0, 0, 4]);
        let w = HeuristicWeights::default();
        let empties = b.spawn_points();
        let mut expected = 0.0;
        for (i, &first) in empties.iter().enumerate() {
            for &second in &empties[i + 1..] {
                for (p1, p2, prob) in PAIR_SPAWNS {
                    let mut child = b;
                    child.set_cell_power(first, p1).unwrap();
                    child.set_cell_power(second, p2).unwrap();
                    expected += prob / 3.0 * evaluate(&child, &w);
                }
            }
        }
        let got = exhaustive(1).evaluate_at(&b, 0, Layer::Chance, &mut rng);
        assert!((got - expected).abs() < 1e-9, "{got} vs {expected}");
    }

    #[test]
    fn single_move_board_picks_it() {
        let mut rng = StdRng::seed_from_u64(6);
        let b = board(2, &[0, 1, 0, 2]);
        assert_eq!(depth(3).best_action(&b, &mut rng), Ok(Action::Left));
    }

    #[test]
    fn does_not_touch_callers_board() {
        let mut rng = StdRng::seed_from_u64(7);
        let b = Board::new(GameConfig::default(), &mut rng).unwrap();
        let before = b;
        depth(2).best_action(&b, &mut rng).unwrap();
        assert_eq!(b, before);
    }

    #[test]
    fn seeded_search_is_reproducible() {
        let mut rng = StdRng::seed_from_u64(8);
        let b = Board::new(GameConfig::new(5, 3, 2).unwrap(), &mut rng).unwrap();
        let run = |seed| depth(2).best_action(&b, &mut StdRng::seed_from_u64(seed));
        assert_eq!(run(99), run(99));
    }

    #[test]
    fn branch_evals_mark_illegal_moves() {
        let mut rng = StdRng::seed_from_u64(9);
        let b = board(2, &[0, 1, 0, 2]);
        let branches = depth(1).branch_evals(&b, &mut rng);
        let legal: Vec<Action> = branches.iter().filter(|br| br.legal).map(|br| br.action).collect();
        assert_eq!(legal, vec![Action::Left]);
        assert_eq!(branches.map(|br| br.action), Action::ALL);
    }

    #[test]
    fn state_value_of_finished_board_is_its_evaluation() {
        let mut rng = StdRng::seed_from_u64(10);
        let done = board(2, &[1, 2, 2, 1]);
        let expected = evaluate(&done, &HeuristicWeights::default());
        assert_eq!(depth(2).state_value(&done, &mut rng), expected);
    }

    #[test]
    fn end_to_end_depth_one_choice_is_best_branch() {
        let cfg = GameConfig::new(4, 2, 1).unwrap();
        let board = Board::new(cfg, &mut StdRng::seed_from_u64(2024)).unwrap();
        let mut ex = depth(1);
        let action = ex.best_action(&board, &mut StdRng::seed_from_u64(77)).unwrap();
        assert!(board.available_actions().contains(action));

        let branches = ex.branch_evals(&board, &mut StdRng::seed_from_u64(77));
        let chosen = branches[action.index()];
        assert!(chosen.legal);
        assert!(branches.iter().filter(|br| br.legal).all(|br| chosen.ev >= br.ev));
        assert!(ex.last_stats().nodes > 1);
    }
}
