use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use gen_2048::engine::{Action, Board, GameConfig};
use rand::{rngs::StdRng, SeedableRng};
use std::hint::black_box;

fn corpus(cfg: GameConfig) -> Vec<Board> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut boards = Vec::new();
    let mut b = Board::new(cfg, &mut rng).unwrap();
    boards.push(b);
    // Derive a variety of densities deterministically
    for i in 0..20 {
        b.apply(Action::ALL[i % 4], &mut rng);
        boards.push(b);
    }
    boards
}

fn bench_slide(c: &mut Criterion) {
    for (name, cfg) in [("4x4_t2", GameConfig::default()), ("9x9_t3", GameConfig::new(9, 3, 2).unwrap())] {
        let boards = corpus(cfg);
        for action in Action::ALL {
            c.bench_function(&format!("slide/{name}/{action}"), |bch| {
                bch.iter(|| {
                    let mut acc = 0u64;
                    for bd in &boards {
                        acc = acc.wrapping_add(bd.shifted(action).map_or(0, |n| n.score()));
                    }
                    black_box(acc)
                })
            });
        }
    }
}

fn bench_apply_and_spawn(c: &mut Criterion) {
    c.bench_function("board/spawn_random_tile", |bch| {
        bch.iter_batched(
            || (Board::empty(GameConfig::default()).unwrap(), StdRng::seed_from_u64(7)),
            |(mut bd, mut rng)| {
                for _ in 0..16 { bd.spawn_random_tile(&mut rng); }
                black_box(bd)
            },
            BatchSize::SmallInput,
        )
    });
    c.bench_function("board/apply_left", |bch| {
        bch.iter_batched(
            || {
                let mut rng = StdRng::seed_from_u64(9);
                let bd = Board::new(GameConfig::default(), &mut rng).unwrap();
                (bd, rng)
            },
            |(mut bd, mut rng)| {
                for _ in 0..64 { bd.apply(Action::Left, &mut rng); }
                black_box(bd)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_queries(c: &mut Criterion) {
    let boards = corpus(GameConfig::default());
    c.bench_function("query/available_actions", |bch| {
        bch.iter(|| boards.iter().map(|bd| bd.available_actions().len()).sum::<usize>())
    });
    c.bench_function("query/smoothness", |bch| {
        bch.iter(|| boards.iter().map(|bd| bd.smoothness()).sum::<i64>())
    });
    c.bench_function("query/available_merge_count", |bch| {
        bch.iter(|| boards.iter().map(|bd| bd.available_merge_count()).sum::<u32>())
    });
    c.bench_function("query/max_tile", |bch| {
        bch.iter(|| boards.iter().fold(0u64, |acc, bd| acc ^ bd.max_tile()))
    });
}

criterion_group!(engine_ops, bench_slide, bench_apply_and_spawn, bench_queries);
criterion_main!(engine_ops);
