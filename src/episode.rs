//! Episode driver: play games to the end with a policy and collect results.
//!
//! Each finished episode yields an [`EpisodeResult`], whose text form is the
//! `<score> <max_tile>` line consumed by downstream plotting. Batches run in
//! parallel on the rayon pool; every episode owns its board, its policy and
//! a `StdRng` seeded from `seed + index`, so results do not depend on
//! scheduling.

use std::fmt;
use std::io::{self, Write};
use std::num::ParseIntError;
use std::str::FromStr;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::engine::{Board, EngineError, GameConfig, Score};
use crate::policy::{Policy, SearchError};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EpisodeError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Search(#[from] SearchError),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseResultError {
    #[error("expected `<score> <max_tile>`, got {0:?}")]
    Shape(String),
    #[error("invalid integer in result line: {0}")]
    Int(#[from] ParseIntError),
}

/// Outcome of one finished episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeResult {
    pub score: Score,
    pub max_tile: Score,
    /// Moves played. Not part of the text form; parsed results carry 0.
    pub moves: u64,
}

impl EpisodeResult {
    pub fn from_board(board: &Board, moves: u64) -> Self {
        Self { score: board.score(), max_tile: board.max_tile(), moves }
    }
}

impl fmt::Display for EpisodeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.score, self.max_tile)
    }
}

impl FromStr for EpisodeResult {
    type Err = ParseResultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split_whitespace();
        match (fields.next(), fields.next(), fields.next()) {
            (Some(score), Some(max_tile), None) => {
                Ok(Self { score: score.parse()?, max_tile: max_tile.parse()?, moves: 0 })
            }
            _ => Err(ParseResultError::Shape(s.to_string())),
        }
    }
}

/// Write one `<score> <max_tile>` line per result.
pub fn write_results<W: Write>(mut out: W, results: &[EpisodeResult]) -> io::Result<()> {
    for r in results {
        writeln!(out, "{r}")?;
    }
    out.flush()
}

/// Parse a results file body, skipping blank lines.
pub fn parse_results(text: &str) -> Result<Vec<EpisodeResult>, ParseResultError> {
    text.lines().filter(|l| !l.trim().is_empty()).map(str::parse).collect()
}

/// Play a fresh game to the end.
///
/// ```
/// use gen_2048::engine::GameConfig;
/// use gen_2048::episode::play_episode;
/// use gen_2048::policy::RandomPolicy;
/// use rand::{rngs::StdRng, SeedableRng};
/// let mut rng = StdRng::seed_from_u64(1234);
/// let cfg = GameConfig::new(3, 2, 1).unwrap();
/// let result = play_episode(cfg, &mut RandomPolicy, &mut rng).unwrap();
/// assert!(result.max_tile >= 2);
/// ```
pub fn play_episode<P, R>(config: GameConfig, policy: &mut P, rng: &mut R) -> Result<EpisodeResult, EpisodeError>
where
    P: Policy,
    R: Rng + ?Sized,
{
    play_episode_limited(config, policy, rng, None)
}

/// Like [`play_episode`] but stops after `max_moves` moves if given.
pub fn play_episode_limited<P, R>(
    config: GameConfig,
    policy: &mut P,
    rng: &mut R,
    max_moves: Option<u64>,
) -> Result<EpisodeResult, EpisodeError>
where
    P: Policy,
    R: Rng + ?Sized,
{
    let board = Board::new(config, rng)?;
    Ok(play_from(board, policy, rng, max_moves)?)
}

/// Drive `board` with `policy` until the game ends or `max_moves` is reached.
pub fn play_from<P, R>(
    mut board: Board,
    policy: &mut P,
    rng: &mut R,
    max_moves: Option<u64>,
) -> Result<EpisodeResult, SearchError>
where
    P: Policy,
    R: Rng + ?Sized,
{
    let mut moves = 0u64;
    while !board.game_over() {
        if max_moves.is_some_and(|limit| moves >= limit) {
            break;
        }
        let action = policy.best_action(&board, rng)?;
        board.apply(action, rng);
        moves += 1;
    }
    let result = EpisodeResult::from_board(&board, moves);
    debug!(
        "{} episode finished: score {} max tile {} in {} moves",
        policy.name(),
        result.score,
        result.max_tile,
        moves
    );
    Ok(result)
}

/// Parameters of a batch of independent episodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    pub game: GameConfig,
    pub episodes: usize,
    /// Episode `i` uses `StdRng::seed_from_u64(seed + i)`.
    pub seed: u64,
    pub max_moves: Option<u64>,
}

impl Default for BatchConfig {
    fn default() -> Self { Self { game: GameConfig::default(), episodes: 1, seed: 1234, max_moves: None } }
}

/// Run a batch in parallel; results come back in episode order.
pub fn run_episodes<P, F>(batch: &BatchConfig, make_policy: F) -> Result<Vec<EpisodeResult>, EpisodeError>
where
    P: Policy,
    F: Fn() -> P + Sync,
{
    run_episodes_with_progress(batch, make_policy, |_| {})
}

/// [`run_episodes`] with a callback invoked as each episode finishes (from
/// whichever worker finished it).
pub fn run_episodes_with_progress<P, F, G>(
    batch: &BatchConfig,
    make_policy: F,
    on_done: G,
) -> Result<Vec<EpisodeResult>, EpisodeError>
where
    P: Policy,
    F: Fn() -> P + Sync,
    G: Fn(&EpisodeResult) + Sync,
{
    batch.game.validate()?;
    let results: Vec<EpisodeResult> = (0..batch.episodes)
        .into_par_iter()
        .map(|idx| {
            let mut rng = StdRng::seed_from_u64(batch.seed.wrapping_add(idx as u64));
            let mut policy = make_policy();
            let result = play_episode_limited(batch.game, &mut policy, &mut rng, batch.max_moves)?;
            on_done(&result);
            Ok(result)
        })
        .collect::<Result<_, EpisodeError>>()?;
    let summary = Summary::from_results(&results);
    info!("{summary}");
    Ok(results)
}

/// Aggregate figures over a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub episodes: usize,
    pub mean_score: f64,
    pub best_score: Score,
    pub highest_tile: Score,
    pub mean_moves: f64,
}

impl Summary {
    pub fn from_results(results: &[EpisodeResult]) -> Self {
        let n = results.len();
        let denom = n.max(1) as f64;
        Self {
            episodes: n,
            mean_score: results.iter().map(|r| r.score as f64).sum::<f64>() / denom,
            best_score: results.iter().map(|r| r.score).max().unwrap_or(0),
            highest_tile: results.iter().map(|r| r.max_tile).max().unwrap_or(0),
            mean_moves: results.iter().map(|r| r.moves as f64).sum::<f64>() / denom,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Episodes: {} | mean score: {:.1} | best score: {} | highest tile: {} | mean moves: {:.1}",
            self.episodes, self.mean_score, self.best_score, self.highest_tile, self.mean_moves
        )
    }
}
