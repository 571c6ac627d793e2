//! Terms, their production rules, and the room metadata they stamp onto rooms.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::modifier::Modifier;

/// Identifier of a room-type symbol.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermId(String);

impl TermId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TermId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata copied from a term onto every room instantiated from it.
///
/// `width`/`height` are the footprint in grid cells. They are signed so that
/// a bad definition survives loading and is rejected by the layout stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomMeta {
    pub name: String,
    pub category: String,
    pub colour: u32,
    pub width: i32,
    pub height: i32,
    /// Free-form values read by downstream content assignment.
    pub data: BTreeMap<String, String>,
}

impl Default for RoomMeta {
    fn default() -> Self {
        Self {
            name: String::new(),
            category: "room".to_string(),
            colour: 0x00A0_A0A0,
            width: 5,
            height: 5,
            data: BTreeMap::new(),
        }
    }
}

impl RoomMeta {
    pub fn sized(name: &str, category: &str, colour: u32, width: i32, height: i32) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            colour,
            width,
            height,
            data: BTreeMap::new(),
        }
    }

    pub fn with_data(mut self, key: &str, value: &str) -> Self {
        self.data.insert(key.to_string(), value.to_string());
        self
    }

    pub fn has_valid_footprint(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// How the symbols of a rule attach to the room being rewritten.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleShape {
    /// Symbols form a forward chain spliced between the rewritten room and its
    /// former children.
    #[default]
    Chain,
    /// Every symbol hangs off the rewritten room as its own side branch.
    Branch,
}

/// What a [`Condition`] is evaluated against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuleContext {
    /// Number of rewrites between the room and the start phrase.
    pub depth: u32,
    /// Rooms currently in the graph.
    pub room_count: usize,
}

/// Applicability predicate attached to a rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    DepthAtLeast { depth: u32 },
    DepthBelow { depth: u32 },
    RoomCountBelow { count: usize },
}

impl Condition {
    pub fn test(&self, context: &RuleContext) -> bool {
        match *self {
            Condition::DepthAtLeast { depth } => context.depth >= depth,
            Condition::DepthBelow { depth } => context.depth < depth,
            Condition::RoomCountBelow { count } => context.room_count < count,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Condition::DepthAtLeast { depth } => format!("depth >= {depth}"),
            Condition::DepthBelow { depth } => format!("depth < {depth}"),
            Condition::RoomCountBelow { count } => format!("rooms < {count}"),
        }
    }
}

fn default_weight() -> u32 {
    1
}

/// One weighted alternative expansion of a term.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default = "default_weight")]
    pub weight: u32,
    pub symbols: Vec<TermId>,
    #[serde(default)]
    pub shape: RuleShape,
    #[serde(default)]
    pub condition: Option<Condition>,
}

impl Rule {
    pub fn chain(symbols: &[&str]) -> Self {
        Self {
            weight: 1,
            symbols: symbols.iter().copied().map(TermId::from).collect(),
            shape: RuleShape::Chain,
            condition: None,
        }
    }

    pub fn branch(symbols: &[&str]) -> Self {
        Self { shape: RuleShape::Branch, ..Self::chain(symbols) }
    }

    pub fn weighted(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn applies(&self, context: &RuleContext) -> bool {
        self.condition.is_none_or(|condition| condition.test(context))
    }
}

/// A room-type symbol with its production rules and modifiers.
///
/// A term without rules is terminal and is never rewritten.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub id: TermId,
    #[serde(default)]
    pub meta: RoomMeta,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    /// Marks the term whose first room becomes the graph's exit.
    #[serde(default)]
    pub exit: bool,
}

impl Term {
    pub fn terminal(id: &str, meta: RoomMeta) -> Self {
        Self { id: TermId::from(id), meta, rules: Vec::new(), modifiers: Vec::new(), exit: false }
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn as_exit(mut self) -> Self {
        self.exit = true;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every term id this term can introduce into a graph.
    pub fn referenced_terms(&self) -> impl Iterator<Item = &TermId> {
        self.rules
            .iter()
            .flat_map(|rule| rule.symbols.iter())
            .chain(self.modifiers.iter().flat_map(|modifier| modifier.referenced_terms()))
    }
}
