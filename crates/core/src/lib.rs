pub mod blueprint;
pub mod generator;
pub mod grammar;
pub mod random;
pub mod types;

pub use blueprint::{Blueprint, Diagnostics, LayoutConfig, LayoutError, LayoutIssue, layout};
pub use generator::{DungeonGenerator, GenerateError, GeneratedDungeon, GeneratorConfig, generate_dungeon};
pub use grammar::{GrammarEngine, GrammarError, PhraseGraph, TermId, TermRegistry, expand};
pub use random::{RandomSource, SeededRandom};
pub use types::*;
