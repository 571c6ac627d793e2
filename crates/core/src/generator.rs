//! Runs grammar expansion and layout together, regenerating with derived
//! seeds while a layout has more issues than the configured tolerance.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

use crate::blueprint::{Blueprint, LayoutConfig, LayoutError, layout};
use crate::grammar::{DEFAULT_MAX_ITERATIONS, GrammarEngine, GrammarError, PhraseGraph, TermId, TermLookup};
use crate::random::{SeededRandom, derive_attempt_seed};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("invalid generator config: {0}")]
    InvalidConfig(String),
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Rewrites allowed per expansion before the graph is returned as is.
    pub max_iterations: usize,
    pub layout: LayoutConfig,
    /// Highest diagnostic total accepted without regenerating.
    pub error_tolerance: usize,
    /// Extra attempts after the first one.
    pub max_regenerations: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            layout: LayoutConfig::default(),
            error_tolerance: 0,
            max_regenerations: 4,
        }
    }
}

impl GeneratorConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, GenerateError> {
        let config: Self =
            toml::from_str(source).map_err(|error| GenerateError::InvalidConfig(error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(source: &str) -> Result<Self, GenerateError> {
        let config: Self = serde_json::from_str(source)
            .map_err(|error| GenerateError::InvalidConfig(error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a `.toml` or `.json` config file.
    pub fn load(path: &Path) -> Result<Self, GenerateError> {
        let content = fs::read_to_string(path)
            .map_err(|source| GenerateError::Io { path: path.to_path_buf(), source })?;
        match path.extension().and_then(|extension| extension.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Err(GenerateError::InvalidConfig(format!(
                "unsupported config format: {}",
                path.display()
            ))),
        }
    }

    pub fn validate(&self) -> Result<(), GenerateError> {
        if self.max_iterations == 0 {
            return Err(GenerateError::InvalidConfig("max_iterations must be positive".into()));
        }
        self.layout.validate()?;
        Ok(())
    }
}

/// Result of one generation run: the accepted (or least broken) attempt.
#[derive(Clone, Debug)]
pub struct GeneratedDungeon {
    /// Seed the returned attempt was built from.
    pub seed: u64,
    /// Attempts made, including the returned one.
    pub attempts: u32,
    pub graph: PhraseGraph,
    pub blueprint: Blueprint,
}

impl GeneratedDungeon {
    pub fn error_count(&self) -> usize {
        self.blueprint.diagnostics().total()
    }

    /// Hash of the graph and blueprint encodings.
    pub fn fingerprint(&self) -> u64 {
        let mut bytes = self.graph.canonical_bytes();
        bytes.extend(self.blueprint.canonical_bytes());
        xxh3_64(&bytes)
    }
}

pub struct DungeonGenerator<'r, L: TermLookup + ?Sized> {
    registry: &'r L,
    run_seed: u64,
    config: GeneratorConfig,
}

impl<'r, L: TermLookup + ?Sized> DungeonGenerator<'r, L> {
    pub fn new(registry: &'r L, run_seed: u64, config: GeneratorConfig) -> Self {
        Self { registry, run_seed, config }
    }

    pub fn run_seed(&self) -> u64 {
        self.run_seed
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Expands and lays out `start_phrase`, retrying with a fresh seed while
    /// the layout reports more issues than tolerated. When no attempt is
    /// good enough the one with the fewest issues is returned. Fatal grammar
    /// or layout errors stop the run immediately.
    pub fn generate(&self, start_phrase: &[TermId]) -> Result<GeneratedDungeon, GenerateError> {
        self.config.validate()?;

        let mut best = self.attempt(start_phrase, 0)?;
        let mut attempts = 1;
        while best.error_count() > self.config.error_tolerance
            && attempts <= self.config.max_regenerations
        {
            warn!(
                "attempt {attempts} with seed {} has {} layout issues ({}), regenerating",
                best.seed,
                best.error_count(),
                best.blueprint.diagnostics()
            );
            let candidate = self.attempt(start_phrase, attempts)?;
            attempts += 1;
            if candidate.error_count() < best.error_count() {
                best = candidate;
            }
        }

        best.attempts = attempts;
        debug!(
            "generated {} rooms after {attempts} attempts, fingerprint {:016x}",
            best.graph.len(),
            best.fingerprint()
        );
        Ok(best)
    }

    fn attempt(&self, start_phrase: &[TermId], attempt: u32) -> Result<GeneratedDungeon, GenerateError> {
        let seed = derive_attempt_seed(self.run_seed, attempt);
        let mut rng = SeededRandom::new(seed);
        let graph = GrammarEngine::new(self.registry, self.config.max_iterations)
            .expand(start_phrase, &mut rng)?;
        let blueprint = layout(&graph, &mut rng, &self.config.layout)?;
        Ok(GeneratedDungeon { seed, attempts: attempt + 1, graph, blueprint })
    }
}

/// One-shot helper around [`DungeonGenerator`].
pub fn generate_dungeon<L: TermLookup + ?Sized>(
    registry: &L,
    start_phrase: &[TermId],
    seed: u64,
    config: GeneratorConfig,
) -> Result<GeneratedDungeon, GenerateError> {
    DungeonGenerator::new(registry, seed, config).generate(start_phrase)
}
