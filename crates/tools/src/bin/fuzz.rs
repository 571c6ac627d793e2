use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use dungeon_core::blueprint::LayoutIssue;
use dungeon_core::grammar::{default_registry, default_start_phrase};
use dungeon_core::{GeneratorConfig, LayoutConfig, generate_dungeon};
use log::info;
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Seed for the stream of run seeds
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
    #[arg(short, long, default_value_t = 200)]
    runs: u32,
    /// Half extent of the layout area around the origin
    #[arg(short, long)]
    bound: Option<i32>,
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    tools::init_logging(args.verbose)?;

    println!("Sweeping {} runs from seed {}...", args.runs, args.seed);
    let registry = default_registry().context("Built-in registry is invalid")?;
    let phrase = default_start_phrase();
    let config = GeneratorConfig {
        layout: LayoutConfig { bound: args.bound, ..LayoutConfig::default() },
        error_tolerance: usize::MAX,
        ..GeneratorConfig::default()
    };
    let clearance = config.layout.clearance;
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);

    let mut totals: BTreeMap<LayoutIssue, usize> = BTreeMap::new();
    let mut clean_runs = 0;
    let mut exhausted_runs = 0;
    let mut rooms = 0;
    for _ in 0..args.runs {
        let run_seed = rng.next_u64();
        let dungeon = generate_dungeon(&registry, &phrase, run_seed, config.clone())
            .with_context(|| format!("Generation failed on seed {run_seed}"))?;
        dungeon
            .blueprint
            .verify(clearance)
            .with_context(|| format!("Invariant failed on seed {run_seed}"))?;

        let diagnostics = dungeon.blueprint.diagnostics();
        for (&issue, &count) in diagnostics.counts() {
            *totals.entry(issue).or_default() += count;
        }
        if diagnostics.is_clean() {
            clean_runs += 1;
        }
        if dungeon.graph.budget_exhausted() {
            exhausted_runs += 1;
        }
        rooms += dungeon.blueprint.rooms().len();
        info!("seed {run_seed}: {} rooms, {diagnostics}", dungeon.blueprint.rooms().len());
    }

    println!("Clean layouts: {clean_runs}/{}", args.runs);
    println!("Expansions cut short: {exhausted_runs}");
    println!("Rooms generated: {rooms}");
    for issue in LayoutIssue::ALL {
        println!("{issue}: {}", totals.get(&issue).copied().unwrap_or(0));
    }
    println!("Fuzzing completed successfully.");
    Ok(())
}
