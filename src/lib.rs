//! gen-2048: a generalized 2048 engine + search policies
//!
//! The game is parameterized by board size `n`, merge arity `t` (how many
//! equal tiles merge at once; classic 2048 is `t = 2`) and spawn count `r`
//! (tiles added after every accepted move).
//!
//! This crate provides:
//! - A compact, `Copy` `Board` with moves, spawns and derived queries (`engine` module)
//! - A depth-limited Expectimax policy with a heuristic leaf evaluation (`expectimax` module)
//! - A flat Monte-Carlo policy scored by random playouts (`montecarlo` module)
//! - The `Policy` trait and a random baseline (`policy` module)
//! - An episode driver producing `<score> <max_tile>` result lines (`episode` module)
//!
//! All randomness flows through an explicitly passed `rand::Rng`; seed a
//! `StdRng` for reproducible games.
//!
//! Quick start:
//! ```
//! use gen_2048::engine::{Action, Board, GameConfig};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let cfg = GameConfig::new(4, 2, 1).unwrap();
//! let mut b = Board::new(cfg, &mut rng).unwrap();
//! let before = b.score();
//! let reward = b.apply(Action::Left, &mut rng);
//! assert_eq!(b.score(), before + reward);
//! ```
//!
//! Full loop (simplest possible)
//! ```
//! use gen_2048::engine::{Board, GameConfig};
//! use gen_2048::expectimax::{Expectimax, ExpectimaxConfig};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! // 1) Policy and a seeded RNG
//! let mut policy = Expectimax::with_config(ExpectimaxConfig { max_depth: 2, ..Default::default() }).unwrap();
//! let mut rng = StdRng::seed_from_u64(123);
//!
//! // 2) Start board with two random tiles
//! let mut b = Board::new(GameConfig::default(), &mut rng).unwrap();
//! let mut moves = 0u32;
//!
//! // 3) Loop a few moves to demonstrate flow (keep doctests fast)
//! while !b.game_over() && moves < 4 {
//!     let action = policy.best_action(&b, &mut rng).unwrap();
//!     b.apply(action, &mut rng);
//!     moves += 1;
//! }
//!
//! // 4) Inspect final state
//! println!("{} {}", b.score(), b.max_tile());
//! assert!(moves > 0);
//! ```
//!
pub mod engine;
pub mod episode;
pub mod expectimax;
pub mod montecarlo;
pub mod policy;
