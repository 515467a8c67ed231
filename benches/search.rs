use criterion::{criterion_group, criterion_main, Criterion};
use gen_2048::engine::{Action, Board, GameConfig};
use gen_2048::expectimax::{Expectimax, ExpectimaxConfig};
use gen_2048::montecarlo::{MonteCarlo, MonteCarloConfig};
use rand::{rngs::StdRng, SeedableRng};
use std::hint::black_box;

fn corpus() -> Vec<Board> {
    let mut rng = StdRng::seed_from_u64(4242);
    let mut boards = Vec::new();
    let mut b = Board::new(GameConfig::default(), &mut rng).unwrap();
    boards.push(b);
    for i in 0..32 {
        b.apply(Action::ALL[i % 4], &mut rng);
        if b.game_over() { break; }
        boards.push(b);
    }
    boards
}

fn bench_expectimax(c: &mut Criterion) {
    let boards = corpus();
    let cfg = ExpectimaxConfig { max_depth: 3, ..Default::default() };
    let mut ex = Expectimax::with_config(cfg).unwrap();

    c.bench_function("expectimax/branch_evals", |bch| {
        let mut rng = StdRng::seed_from_u64(1);
        bch.iter(|| {
            let mut acc = 0.0;
            for bd in &boards {
                for be in ex.branch_evals(bd, &mut rng) { if be.legal { acc += be.ev; } }
            }
            black_box(acc)
        })
    });

    c.bench_function("expectimax/best_action", |bch| {
        let mut rng = StdRng::seed_from_u64(2);
        bch.iter(|| {
            let mut acc = 0usize;
            for bd in &boards {
                acc ^= ex.best_action(bd, &mut rng).map_or(0, |a| a.index());
            }
            black_box(acc)
        })
    });
}

fn bench_montecarlo(c: &mut Criterion) {
    let boards = corpus();
    let mut mc = MonteCarlo::with_config(MonteCarloConfig { rollouts: 10 }).unwrap();
    c.bench_function("montecarlo/best_action", |bch| {
        let mut rng = StdRng::seed_from_u64(3);
        bch.iter(|| {
            let mut acc = 0usize;
            for bd in boards.iter().take(8) {
                acc ^= mc.best_action(bd, &mut rng).map_or(0, |a| a.index());
            }
            black_box(acc)
        })
    });
}

fn bench_e2e(c: &mut Criterion) {
    let cfg = ExpectimaxConfig { max_depth: 3, ..Default::default() };
    let mut ex = Expectimax::with_config(cfg).unwrap();
    c.bench_function("e2e/64_moves", |bch| {
        bch.iter(|| {
            let mut rng = StdRng::seed_from_u64(7);
            let mut b = Board::new(GameConfig::default(), &mut rng).unwrap();
            let mut steps = 0;
            while steps < 64 && !b.game_over() {
                match ex.best_action(&b, &mut rng) {
                    Ok(action) => { b.apply(action, &mut rng); }
                    Err(_) => break,
                }
                steps += 1;
            }
            black_box((b.score(), steps))
        })
    });
}

criterion_group!(search, bench_expectimax, bench_montecarlo, bench_e2e);
criterion_main!(search);
