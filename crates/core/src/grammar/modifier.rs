//! Post-expansion graph edits attached to terms.
//!
//! A modifier never touches the graph directly. It inspects the room being
//! rewritten and returns a [`Changeset`] that the engine applies once the
//! modifier has returned.

use serde::{Deserialize, Serialize};

use crate::random::RandomSource;
use crate::types::RoomId;

use super::graph::PhraseGraph;
use super::term::{Term, TermId};

fn default_weight() -> u32 {
    1
}

fn always() -> f32 {
    1.0
}

fn default_shortcut_hops() -> u32 {
    3
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightedTerm {
    pub term: TermId,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl WeightedTerm {
    pub fn new(term: &str, weight: u32) -> Self {
        Self { term: TermId::from(term), weight }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Modifier {
    /// Hangs a new room off the current room as an extra outgoing link.
    InjectBranch {
        terms: Vec<WeightedTerm>,
        #[serde(default = "always")]
        chance: f32,
    },
    /// Inserts a new room that takes over every outgoing link of the current room.
    InjectIntermediate {
        terms: Vec<WeightedTerm>,
        #[serde(default = "always")]
        chance: f32,
    },
    /// Links the current room to a nearby room it is not yet adjacent to.
    Shortcut {
        #[serde(default = "always")]
        chance: f32,
        #[serde(default = "default_shortcut_hops")]
        max_hops: u32,
    },
}

/// What a modifier sees while it decides on its edit.
pub struct ModifierContext<'a> {
    pub term: &'a Term,
    pub room: RoomId,
    pub graph: &'a PhraseGraph,
}

/// Refers either to a room already in the graph or to a room added by the
/// same changeset (by position in [`Changeset::added`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeRef {
    Existing(RoomId),
    Added(usize),
}

/// Graph edit produced by a modifier. Applied in order: additions, unlinks, links.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Changeset {
    pub added: Vec<TermId>,
    pub unlinks: Vec<(RoomId, RoomId)>,
    pub links: Vec<(NodeRef, NodeRef)>,
}

impl Changeset {
    pub fn add_room(&mut self, term: TermId) -> NodeRef {
        self.added.push(term);
        NodeRef::Added(self.added.len() - 1)
    }

    pub fn link(&mut self, from: NodeRef, to: NodeRef) {
        self.links.push((from, to));
    }

    pub fn unlink(&mut self, from: RoomId, to: RoomId) {
        self.unlinks.push((from, to));
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.unlinks.is_empty() && self.links.is_empty()
    }
}

impl Modifier {
    /// Decides whether the modifier fires for this room. Draws from `rng`
    /// only when the modifier is structurally applicable.
    pub fn test(&self, context: &ModifierContext<'_>, rng: &mut dyn RandomSource) -> bool {
        match self {
            Modifier::InjectBranch { chance, .. } => rng.roll(*chance),
            Modifier::InjectIntermediate { chance, .. } => {
                !context.graph.outgoing(context.room).is_empty() && rng.roll(*chance)
            }
            Modifier::Shortcut { chance, .. } => rng.roll(*chance),
        }
    }

    pub fn apply(
        &self,
        context: &ModifierContext<'_>,
        rng: &mut dyn RandomSource,
    ) -> Option<Changeset> {
        let current = NodeRef::Existing(context.room);
        let mut changes = Changeset::default();
        match self {
            Modifier::InjectBranch { terms, .. } => {
                let branch = changes.add_room(pick_term(terms, rng)?);
                changes.link(current, branch);
            }
            Modifier::InjectIntermediate { terms, .. } => {
                let intermediate = changes.add_room(pick_term(terms, rng)?);
                for &child in context.graph.outgoing(context.room) {
                    changes.unlink(context.room, child);
                    changes.link(intermediate, NodeRef::Existing(child));
                }
                changes.link(current, intermediate);
            }
            Modifier::Shortcut { max_hops, .. } => {
                let candidates: Vec<RoomId> = context
                    .graph
                    .rooms_within(context.room, *max_hops)
                    .into_iter()
                    .filter(|&(_, distance)| distance >= 2)
                    .map(|(id, _)| id)
                    .collect();
                if candidates.is_empty() {
                    return None;
                }
                let target = candidates[rng.next_int(candidates.len() as u32) as usize];
                changes.link(current, NodeRef::Existing(target));
            }
        }
        Some(changes)
    }

    pub fn describe(&self) -> String {
        match self {
            Modifier::InjectBranch { terms, chance } => {
                format!("branch to one of [{}] ({:.0}%)", term_list(terms), chance * 100.0)
            }
            Modifier::InjectIntermediate { terms, chance } => {
                format!("intermediate from [{}] ({:.0}%)", term_list(terms), chance * 100.0)
            }
            Modifier::Shortcut { chance, max_hops } => {
                format!("shortcut within {max_hops} hops ({:.0}%)", chance * 100.0)
            }
        }
    }

    pub fn referenced_terms(&self) -> impl Iterator<Item = &TermId> {
        let terms: &[WeightedTerm] = match self {
            Modifier::InjectBranch { terms, .. } | Modifier::InjectIntermediate { terms, .. } => {
                terms
            }
            Modifier::Shortcut { .. } => &[],
        };
        terms.iter().map(|weighted| &weighted.term)
    }

    /// Sum of candidate weights; zero means the modifier can never pick a term.
    pub(crate) fn total_weight(&self) -> Option<u64> {
        match self {
            Modifier::InjectBranch { terms, .. } | Modifier::InjectIntermediate { terms, .. } => {
                Some(terms.iter().map(|weighted| u64::from(weighted.weight)).sum())
            }
            Modifier::Shortcut { .. } => None,
        }
    }
}

fn pick_term(terms: &[WeightedTerm], rng: &mut dyn RandomSource) -> Option<TermId> {
    let weights: Vec<u32> = terms.iter().map(|weighted| weighted.weight).collect();
    let index = rng.weighted_pick(&weights)?;
    Some(terms[index].term.clone())
}

fn term_list(terms: &[WeightedTerm]) -> String {
    terms.iter().map(|weighted| weighted.term.as_str()).collect::<Vec<_>>().join(", ")
}
