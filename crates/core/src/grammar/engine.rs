//! Bounded worklist rewriting of a start phrase into a phrase graph.

use std::collections::VecDeque;

use log::{debug, trace, warn};
use thiserror::Error;

use crate::random::RandomSource;
use crate::types::RoomId;

use super::graph::PhraseGraph;
use super::modifier::{Changeset, ModifierContext, NodeRef};
use super::registry::TermLookup;
use super::term::{Rule, RuleContext, RuleShape, Term, TermId};

pub const DEFAULT_MAX_ITERATIONS: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("unknown term `{0}`")]
    UnknownTerm(TermId),
    #[error("term `{term}` cannot pick a rule: {reason}")]
    InvalidRule { term: TermId, reason: String },
}

pub struct GrammarEngine<'r, L: TermLookup + ?Sized> {
    registry: &'r L,
    max_iterations: usize,
}

impl<'r, L: TermLookup + ?Sized> GrammarEngine<'r, L> {
    pub fn new(registry: &'r L, max_iterations: usize) -> Self {
        Self { registry, max_iterations }
    }

    /// Chains the start phrase into rooms, then rewrites pending rooms in
    /// FIFO order until none remain or the iteration cap is reached.
    ///
    /// Hitting the cap is not an error: the partial graph is returned and
    /// [`PhraseGraph::unresolved`] reports how much work was left.
    pub fn expand(
        &self,
        start_phrase: &[TermId],
        rng: &mut dyn RandomSource,
    ) -> Result<PhraseGraph, GrammarError> {
        let mut graph = PhraseGraph::new();
        if start_phrase.is_empty() {
            debug!("empty start phrase, nothing to expand");
            return Ok(graph);
        }

        let mut pending = VecDeque::with_capacity(start_phrase.len());
        let mut previous: Option<RoomId> = None;
        for id in start_phrase {
            let room = self.instantiate(&mut graph, id, 0)?;
            match previous {
                None => graph.set_start(room),
                Some(previous) => {
                    graph.link(previous, room);
                }
            }
            previous = Some(room);
            pending.push_back(room);
        }

        let mut iterations = 0_usize;
        while let Some(room) = pending.pop_front() {
            if iterations >= self.max_iterations {
                pending.push_front(room);
                break;
            }
            iterations += 1;
            self.rewrite(&mut graph, room, &mut pending, rng)?;
        }

        if !pending.is_empty() {
            warn!(
                "grammar expansion stopped at {} iterations with {} rooms unresolved",
                iterations,
                pending.len()
            );
        }
        graph.set_unresolved(pending.len());
        debug!(
            "expanded {} start terms into {} rooms and {} links in {} iterations",
            start_phrase.len(),
            graph.len(),
            graph.link_count(),
            iterations
        );
        Ok(graph)
    }

    fn lookup(&self, id: &TermId) -> Result<&'r Term, GrammarError> {
        self.registry.lookup(id).ok_or_else(|| GrammarError::UnknownTerm(id.clone()))
    }

    fn instantiate(
        &self,
        graph: &mut PhraseGraph,
        id: &TermId,
        depth: u32,
    ) -> Result<RoomId, GrammarError> {
        let term = self.lookup(id)?;
        let room = graph.add_room(term.id.clone(), term.meta.clone(), depth);
        if term.exit && graph.exit().is_none() {
            graph.set_exit(room);
        }
        Ok(room)
    }

    fn rewrite(
        &self,
        graph: &mut PhraseGraph,
        room: RoomId,
        pending: &mut VecDeque<RoomId>,
        rng: &mut dyn RandomSource,
    ) -> Result<(), GrammarError> {
        let Some(current) = graph.room(room) else {
            return Ok(());
        };
        let depth = current.depth;
        let term = self.lookup(&current.term)?;

        let context = RuleContext { depth, room_count: graph.len() };
        let applicable: Vec<&Rule> =
            term.rules.iter().filter(|rule| rule.applies(&context)).collect();
        if !applicable.is_empty() {
            let weights: Vec<u32> = applicable.iter().map(|rule| rule.weight).collect();
            let picked = rng.weighted_pick(&weights).ok_or_else(|| GrammarError::InvalidRule {
                term: term.id.clone(),
                reason: "applicable rule weights sum to zero".to_string(),
            })?;
            self.substitute(graph, room, applicable[picked], depth + 1, pending)?;
        } else if !term.is_terminal() {
            trace!("no rule of `{}` applies at depth {depth}, leaving it as is", term.id);
        }

        for modifier in &term.modifiers {
            let changes = {
                let context = ModifierContext { term, room, graph: &*graph };
                if !modifier.test(&context, rng) {
                    continue;
                }
                modifier.apply(&context, rng)
            };
            if let Some(changes) = changes {
                trace!("`{}`: {}", term.id, modifier.describe());
                self.apply_changeset(graph, changes, depth + 1, pending)?;
            }
        }
        Ok(())
    }

    fn substitute(
        &self,
        graph: &mut PhraseGraph,
        room: RoomId,
        rule: &Rule,
        depth: u32,
        pending: &mut VecDeque<RoomId>,
    ) -> Result<(), GrammarError> {
        match rule.shape {
            RuleShape::Chain => {
                if rule.symbols.is_empty() {
                    return Ok(());
                }
                let created = rule
                    .symbols
                    .iter()
                    .map(|symbol| self.instantiate(graph, symbol, depth))
                    .collect::<Result<Vec<_>, _>>()?;
                let former_children = graph.outgoing(room).to_vec();
                for &child in &former_children {
                    graph.unlink(room, child);
                }
                let mut tail = room;
                for &next in &created {
                    graph.link(tail, next);
                    tail = next;
                }
                for &child in &former_children {
                    graph.link(tail, child);
                }
                pending.extend(created);
            }
            RuleShape::Branch => {
                for symbol in &rule.symbols {
                    let child = self.instantiate(graph, symbol, depth)?;
                    graph.link(room, child);
                    pending.push_back(child);
                }
            }
        }
        Ok(())
    }

    fn apply_changeset(
        &self,
        graph: &mut PhraseGraph,
        changes: Changeset,
        depth: u32,
        pending: &mut VecDeque<RoomId>,
    ) -> Result<(), GrammarError> {
        let mut added = Vec::with_capacity(changes.added.len());
        for term in &changes.added {
            let room = self.instantiate(graph, term, depth)?;
            added.push(room);
            pending.push_back(room);
        }
        for (from, to) in changes.unlinks {
            graph.unlink(from, to);
        }
        let resolve = |node: NodeRef| match node {
            NodeRef::Existing(id) => Some(id),
            NodeRef::Added(index) => added.get(index).copied(),
        };
        for (from, to) in changes.links {
            if let (Some(from), Some(to)) = (resolve(from), resolve(to)) {
                graph.link(from, to);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::builtin::{default_registry, default_start_phrase};
    use crate::grammar::modifier::{Modifier, WeightedTerm};
    use crate::grammar::registry::TermRegistry;
    use crate::grammar::term::{Condition, RoomMeta};
    use crate::random::SeededRandom;

    fn phrase(terms: &[&str]) -> Vec<TermId> {
        terms.iter().copied().map(TermId::from).collect()
    }

    fn terminal(id: &str) -> Term {
        Term::terminal(id, RoomMeta::default())
    }

    fn terms_in_order(graph: &PhraseGraph) -> Vec<String> {
        graph
            .traversal_order()
            .into_iter()
            .filter_map(|id| graph.room(id))
            .map(|room| room.term.to_string())
            .collect()
    }

    #[test]
    fn empty_phrase_yields_empty_graph() {
        let registry = TermRegistry::new();
        let graph = GrammarEngine::new(&registry, 10)
            .expand(&[], &mut SeededRandom::new(0))
            .expect("empty phrase is valid");
        assert!(graph.is_empty());
        assert_eq!(graph.start(), None);
        assert!(!graph.budget_exhausted());
    }

    #[test]
    fn unknown_start_term_is_fatal() {
        let registry = TermRegistry::from_terms([terminal("Start")]).expect("valid");
        let result = GrammarEngine::new(&registry, 10)
            .expand(&phrase(&["Start", "Nowhere"]), &mut SeededRandom::new(0));
        assert_eq!(result.unwrap_err(), GrammarError::UnknownTerm(TermId::from("Nowhere")));
    }

    #[test]
    fn unknown_production_symbol_is_fatal() {
        let mut registry = TermRegistry::new();
        registry.insert(terminal("Start").with_rule(Rule::chain(&["Ghost"])));
        let result =
            GrammarEngine::new(&registry, 10).expand(&phrase(&["Start"]), &mut SeededRandom::new(0));
        assert_eq!(result.unwrap_err(), GrammarError::UnknownTerm(TermId::from("Ghost")));
    }

    #[test]
    fn terminal_phrase_becomes_linear_chain() {
        let registry = TermRegistry::from_terms(
            ["Start", "Blank", "Exit"].map(terminal).into_iter().map(|term| {
                if term.id.as_str() == "Exit" { term.as_exit() } else { term }
            }),
        )
        .expect("valid");
        let graph = GrammarEngine::new(&registry, 100)
            .expand(&phrase(&["Start", "Blank", "Blank", "Blank", "Exit"]), &mut SeededRandom::new(5))
            .expect("expands");

        assert_eq!(graph.len(), 5);
        assert_eq!(graph.link_count(), 4);
        assert_eq!(terms_in_order(&graph), ["Start", "Blank", "Blank", "Blank", "Exit"]);
        let exit = graph.exit().expect("exit marked");
        assert!(graph.outgoing(exit).is_empty());
        assert_eq!(graph.traversal_order().last(), Some(&exit));
    }

    #[test]
    fn branch_injection_gives_room_a_second_outgoing_link() {
        let registry = TermRegistry::from_terms([
            terminal("Hub").with_modifier(Modifier::InjectBranch {
                terms: vec![WeightedTerm::new("Treasure", 1)],
                chance: 1.0,
            }),
            terminal("Next"),
            terminal("Treasure"),
        ])
        .expect("valid");
        let graph = GrammarEngine::new(&registry, 100)
            .expand(&phrase(&["Hub", "Next"]), &mut SeededRandom::new(1))
            .expect("expands");

        let hub = graph.start().expect("start");
        assert_eq!(graph.outgoing(hub).len(), 2);
        assert_eq!(terms_in_order(&graph), ["Hub", "Next", "Treasure"]);
    }

    #[test]
    fn intermediate_injection_sits_between_room_and_children() {
        let registry = TermRegistry::from_terms([
            terminal("Boss").with_modifier(Modifier::InjectIntermediate {
                terms: vec![WeightedTerm::new("Shrine", 1)],
                chance: 1.0,
            }),
            terminal("Shrine"),
            terminal("Exit"),
        ])
        .expect("valid");
        let graph = GrammarEngine::new(&registry, 100)
            .expand(&phrase(&["Boss", "Exit"]), &mut SeededRandom::new(1))
            .expect("expands");

        assert_eq!(terms_in_order(&graph), ["Boss", "Shrine", "Exit"]);
        assert_eq!(graph.link_count(), 2);
    }

    #[test]
    fn chain_rule_is_spliced_before_existing_children() {
        let registry = TermRegistry::from_terms([
            terminal("Hall").with_rule(Rule::chain(&["Blank", "Blank"])),
            terminal("Blank"),
            terminal("Exit"),
        ])
        .expect("valid");
        let graph = GrammarEngine::new(&registry, 100)
            .expand(&phrase(&["Hall", "Exit"]), &mut SeededRandom::new(3))
            .expect("expands");

        assert_eq!(terms_in_order(&graph), ["Hall", "Blank", "Blank", "Exit"]);
        assert_eq!(graph.link_count(), 3);
    }

    #[test]
    fn branch_rule_fans_out_from_rewritten_room() {
        let registry = TermRegistry::from_terms([
            terminal("Hub").with_rule(Rule::branch(&["Blank", "Blank", "Blank"])),
            terminal("Blank"),
        ])
        .expect("valid");
        let graph = GrammarEngine::new(&registry, 100)
            .expand(&phrase(&["Hub"]), &mut SeededRandom::new(3))
            .expect("expands");

        let hub = graph.start().expect("start");
        assert_eq!(graph.outgoing(hub).len(), 3);
        assert!(graph.outgoing(hub).iter().all(|&child| graph.outgoing(child).is_empty()));
    }

    #[test]
    fn self_referential_rule_stops_at_iteration_cap() {
        let registry =
            TermRegistry::from_terms([terminal("Loop").with_rule(Rule::chain(&["Loop"]))])
                .expect("valid");
        let graph = GrammarEngine::new(&registry, 10)
            .expand(&phrase(&["Loop"]), &mut SeededRandom::new(0))
            .expect("cap is not fatal");

        assert_eq!(graph.len(), 11);
        assert_eq!(graph.unresolved(), 1);
        assert!(graph.budget_exhausted());
        assert!(graph.is_connected());
    }

    #[test]
    fn depth_conditions_bound_recursive_rules() {
        let registry = TermRegistry::from_terms([
            terminal("Hall")
                .with_rule(Rule::chain(&["Hall"]).when(Condition::DepthBelow { depth: 4 })),
        ])
        .expect("valid");
        let graph = GrammarEngine::new(&registry, 1_000)
            .expand(&phrase(&["Hall"]), &mut SeededRandom::new(0))
            .expect("expands");

        assert_eq!(graph.len(), 5);
        assert!(!graph.budget_exhausted());
        assert!(graph.rooms().all(|(_, room)| room.depth <= 4));
    }

    #[test]
    fn default_grammar_is_deterministic_per_seed() {
        let registry = default_registry().expect("built-in registry");
        let start = default_start_phrase();
        for seed in [1_u64, 42, 2_026, 987_654] {
            let engine = GrammarEngine::new(&registry, DEFAULT_MAX_ITERATIONS);
            let left = engine.expand(&start, &mut SeededRandom::new(seed)).expect("expands");
            let right = engine.expand(&start, &mut SeededRandom::new(seed)).expect("expands");
            assert_eq!(left.canonical_bytes(), right.canonical_bytes(), "seed {seed}");
            assert!(left.is_connected());
            assert!(left.exit().is_some());
            assert!(!left.budget_exhausted());
            for (_, room) in left.rooms() {
                assert!(registry.lookup(&room.term).is_some());
            }
        }
    }
}
