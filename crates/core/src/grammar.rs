//! Graph-rewriting grammar that turns a start phrase into a phrase graph.

pub mod builtin;
pub mod modifier;
pub mod term;

mod engine;
mod graph;
mod registry;

pub use builtin::{default_registry, default_start_phrase};
pub use engine::{DEFAULT_MAX_ITERATIONS, GrammarEngine, GrammarError};
pub use graph::{PhraseGraph, PhraseRoom};
pub use modifier::{Changeset, Modifier, ModifierContext, NodeRef, WeightedTerm};
pub use registry::{RegistryError, TermLookup, TermRegistry};
pub use term::{Condition, RoomMeta, Rule, RuleContext, RuleShape, Term, TermId};

use crate::random::RandomSource;

pub fn expand<L: TermLookup + ?Sized>(
    registry: &L,
    start_phrase: &[TermId],
    rng: &mut dyn RandomSource,
    max_iterations: usize,
) -> Result<PhraseGraph, GrammarError> {
    GrammarEngine::new(registry, max_iterations).expand(start_phrase, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededRandom;

    #[test]
    fn expand_matches_engine_output() {
        let registry = default_registry().expect("built-in registry");
        let start = default_start_phrase();
        let from_helper =
            expand(&registry, &start, &mut SeededRandom::new(123), DEFAULT_MAX_ITERATIONS)
                .expect("expands");
        let from_engine = GrammarEngine::new(&registry, DEFAULT_MAX_ITERATIONS)
            .expand(&start, &mut SeededRandom::new(123))
            .expect("expands");
        assert_eq!(from_helper.canonical_bytes(), from_engine.canonical_bytes());
    }
}
