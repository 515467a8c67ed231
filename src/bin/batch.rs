use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use gen_2048::engine::GameConfig;
use gen_2048::episode::{self, BatchConfig, EpisodeResult, Summary};
use gen_2048::expectimax::{Expectimax, ExpectimaxConfig};
use gen_2048::montecarlo::{MonteCarlo, MonteCarloConfig};
use gen_2048::policy::{Policy, RandomPolicy};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let game = GameConfig::new(args.size, args.arity, args.spawns)?;
    let batch = BatchConfig { game, episodes: args.episodes, seed: args.seed, max_moves: args.steps };
    info!("{:?} policy, {:?}", args.policy, batch);

    let pool = rayon::ThreadPoolBuilder::new().num_threads(args.threads.unwrap_or(0)).build()?;

    let pb = if !args.quiet {
        let pb = ProgressBar::new(args.episodes as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner} {elapsed_precise} [{bar:40}] {pos}/{len} episodes | {msg}")?
                .tick_chars("⠁⠃⠇⠧⠷⠿⠻⠟⠯⠷⠧⠇⠃")
                .progress_chars("=> "),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();
    let results = pool.install(|| -> anyhow::Result<Vec<EpisodeResult>> {
        match args.policy {
            PolicyKind::Expectimax => {
                let cfg = ExpectimaxConfig {
                    max_depth: args.depth,
                    spawn_sample_cap: args.spawn_sample_cap,
                    ..Default::default()
                };
                let proto = Expectimax::with_config(cfg)?;
                run(&batch, || proto.clone(), pb.as_ref())
            }
            PolicyKind::Montecarlo => {
                let proto = MonteCarlo::with_config(MonteCarloConfig { rollouts: args.rollouts })?;
                run(&batch, || proto.clone(), pb.as_ref())
            }
            PolicyKind::Random => run(&batch, || RandomPolicy, pb.as_ref()),
        }
    })?;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    match &args.out {
        Some(path) => episode::write_results(BufWriter::new(File::create(path)?), &results)?,
        None => episode::write_results(io::stdout().lock(), &results)?,
    }

    if !args.quiet {
        let elapsed = start.elapsed().as_secs_f64().max(1e-6);
        eprintln!("{} | {:.2} episodes/sec", Summary::from_results(&results), results.len() as f64 / elapsed);
    }
    Ok(())
}

fn run<P, F>(batch: &BatchConfig, make_policy: F, pb: Option<&ProgressBar>) -> anyhow::Result<Vec<EpisodeResult>>
where
    P: Policy,
    F: Fn() -> P + Sync,
{
    let results = episode::run_episodes_with_progress(batch, make_policy, |r| {
        if let Some(pb) = pb {
            pb.inc(1);
            pb.set_message(format!("last: {r}"));
        }
    })?;
    Ok(results)
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyKind {
    Expectimax,
    Montecarlo,
    Random,
}

#[derive(Debug, Parser)]
#[command(name = "batch", about = "Run independent generalized-2048 episodes and print `<score> <max_tile>` lines")]
struct Args {
    /// Decision policy
    #[arg(long, value_enum, default_value_t = PolicyKind::Expectimax)]
    policy: PolicyKind,

    /// Number of episodes to play
    #[arg(long, default_value_t = 10)]
    episodes: usize,

    /// Board dimension n
    #[arg(long, default_value_t = 4)]
    size: usize,

    /// Merge arity t (tiles needed to merge)
    #[arg(long, default_value_t = 2)]
    arity: u32,

    /// Tiles spawned after every accepted move
    #[arg(long, default_value_t = 1)]
    spawns: usize,

    /// Expectimax search depth
    #[arg(long, default_value_t = 5)]
    depth: u32,

    /// Empty cells expanded per expectimax chance layer
    #[arg(long, default_value_t = 2)]
    spawn_sample_cap: usize,

    /// Random playouts per action for the Monte-Carlo policy
    #[arg(long, default_value_t = 50)]
    rollouts: usize,

    /// Base seed; episode i uses seed + i
    #[arg(long, default_value_t = 1234)]
    seed: u64,

    /// Stop each episode after this many moves
    #[arg(long)]
    steps: Option<u64>,

    /// Worker threads (defaults to one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Write result lines to this path instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,

    /// Suppress the progress bar and summary
    #[arg(long)]
    quiet: bool,
}
