use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use dungeon_core::blueprint::{LayoutIssue, Rect, TileGrid};
use dungeon_core::grammar::{default_registry, default_start_phrase};
use dungeon_core::{DungeonGenerator, GeneratedDungeon, GeneratorConfig, Pos, TermId, TermRegistry};
use serde::Serialize;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run seed
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
    /// Term registry file (.toml or .json); the built-in grammar is used otherwise
    #[arg(short, long)]
    registry: Option<PathBuf>,
    /// Generator config file (.toml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Comma separated start phrase, e.g. `Start,Hall,Exit`
    #[arg(short, long)]
    phrase: Option<String>,
    /// Print a JSON summary instead of the ASCII map
    #[arg(long)]
    json: bool,
    /// Log verbosity, repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct Summary {
    seed: u64,
    attempts: u32,
    fingerprint: String,
    unresolved: usize,
    rooms: Vec<RoomSummary>,
    passages: Vec<PassageSummary>,
    diagnostics: BTreeMap<&'static str, usize>,
}

#[derive(Serialize)]
struct RoomSummary {
    term: String,
    name: String,
    category: String,
    bounds: Option<Rect>,
    data: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct PassageSummary {
    from: usize,
    to: usize,
    length: usize,
    waypoints: Vec<Pos>,
}

fn summarize(dungeon: &GeneratedDungeon) -> Summary {
    let blueprint = &dungeon.blueprint;
    let position = |id| blueprint.rooms().iter().position(|room| room.id() == id).unwrap_or(usize::MAX);
    Summary {
        seed: dungeon.seed,
        attempts: dungeon.attempts,
        fingerprint: format!("{:016x}", dungeon.fingerprint()),
        unresolved: dungeon.graph.unresolved(),
        rooms: blueprint
            .rooms()
            .iter()
            .map(|room| RoomSummary {
                term: room.term().to_string(),
                name: room.name().to_string(),
                category: room.category().to_string(),
                bounds: room.bounds(),
                data: room.data().clone(),
            })
            .collect(),
        passages: blueprint
            .passages()
            .iter()
            .map(|passage| PassageSummary {
                from: position(passage.from()),
                to: position(passage.to()),
                length: passage.len(),
                waypoints: passage.waypoints(),
            })
            .collect(),
        diagnostics: LayoutIssue::ALL
            .iter()
            .map(|&issue| (issue.label(), blueprint.diagnostics().count(issue)))
            .collect(),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    tools::init_logging(args.verbose)?;

    let registry = match &args.registry {
        Some(path) => TermRegistry::load(path)
            .with_context(|| format!("Failed to load registry: {}", path.display()))?,
        None => default_registry().context("Built-in registry is invalid")?,
    };
    let config = match &args.config {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => GeneratorConfig::default(),
    };
    let phrase: Vec<TermId> = match &args.phrase {
        Some(phrase) => phrase
            .split(',')
            .map(str::trim)
            .filter(|symbol| !symbol.is_empty())
            .map(TermId::from)
            .collect(),
        None => default_start_phrase(),
    };

    let dungeon = DungeonGenerator::new(&registry, args.seed, config)
        .generate(&phrase)
        .context("Generation failed")?;

    if args.json {
        let summary = serde_json::to_string_pretty(&summarize(&dungeon))
            .context("Failed to serialize summary")?;
        println!("{summary}");
    } else {
        print!("{}", TileGrid::for_blueprint(&dungeon.blueprint).render_ascii());
        println!(
            "seed {} | attempts {} | rooms {} | passages {} | {}",
            dungeon.seed,
            dungeon.attempts,
            dungeon.blueprint.rooms().len(),
            dungeon.blueprint.passages().len(),
            dungeon.blueprint.diagnostics()
        );
    }
    Ok(())
}
