use crate::engine::Board;

/// Weights of the leaf evaluation. Defaults preserve documented behavior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicWeights {
    pub score: f64,
    pub merges: f64,
    pub empty: f64,
    pub max_tile: f64,
    pub smoothness: f64,
}

impl Default for HeuristicWeights {
    fn default() -> Self { Self { score: 0.5, merges: 1.0, empty: 10.0, max_tile: 4.0, smoothness: 1.0 } }
}

/// Utility of a board at a search leaf.
///
/// Weighted sum of score, adjacent equal pairs, empty cells, largest face
/// value and smoothness (which is never positive).
///
/// ```
/// use gen_2048::engine::{Board, GameConfig};
/// use gen_2048::expectimax::{evaluate, HeuristicWeights};
/// let cfg = GameConfig::new(2, 2, 1).unwrap();
/// let b = Board::from_grid(cfg, &[1, 1, 0, 0], 0).unwrap();
/// // 1 merge + 2 empty cells * 10 + max tile 2 * 4
/// assert_eq!(evaluate(&b, &HeuristicWeights::default()), 29.0);
/// ```
#[inline]
pub fn evaluate(board: &Board, weights: &HeuristicWeights) -> f64 {
    weights.score * board.score() as f64
        + weights.merges * board.available_merge_count() as f64
        + weights.empty * board.empty_count() as f64
        + weights.max_tile * board.max_tile() as f64
        + weights.smoothness * board.smoothness() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GameConfig;

    fn board(grid: &[u8], score: u64) -> Board {
        let n = (grid.len() as f64).sqrt() as usize;
        Board::from_grid(GameConfig::new(n, 2, 1).unwrap(), grid, score).unwrap()
    }

    #[test]
    fn weighs_each_term() {
        let w = HeuristicWeights::default();
        // score 40 * 0.5, 0 merges, 0 empty, max tile 8 * 4, smoothness -(1+1+1+1)
        let b = board(&[1, 2, 2, 3], 40);
        assert_eq!(b.smoothness(), -4);
        assert_eq!(evaluate(&b, &w), 20.0 + 0.0 + 0.0 + 32.0 - 4.0);
    }

    #[test]
    fn custom_weights_isolate_terms() {
        let only_empty = HeuristicWeights { score: 0.0, merges: 0.0, empty: 1.0, max_tile: 0.0, smoothness: 0.0 };
        assert_eq!(evaluate(&board(&[0, 0, 0, 5, 0, 0, 0, 0, 0], 999), &only_empty), 8.0);
        let only_score = HeuristicWeights { score: 1.0, ..only_empty };
        assert_eq!(evaluate(&board(&[0, 0, 0, 0], 12), &only_score), 12.0 + 4.0);
    }

    #[test]
    fn more_room_scores_higher() {
        let w = HeuristicWeights::default();
        let crowded = board(&[1, 2, 1, 2, 2, 1, 2, 1, 1, 2, 1, 2, 2, 1, 2, 0], 0);
        let open = board(&[1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0], 0);
        assert!(evaluate(&open, &w) > evaluate(&crowded, &w));
    }
}
