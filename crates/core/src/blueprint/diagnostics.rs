//! Recoverable layout problems, counted per category.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::types::RoomId;

use super::model::PassageId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutIssue {
    /// A room exhausted its placement attempts.
    UnplacedRoom,
    /// A link between two placed rooms could not be routed.
    NoValidPath,
    /// Two passages share at least one cell.
    IntersectingPassages,
    /// A passage runs through a room it does not connect.
    Tunnel,
}

impl LayoutIssue {
    pub const ALL: [LayoutIssue; 4] = [
        LayoutIssue::UnplacedRoom,
        LayoutIssue::NoValidPath,
        LayoutIssue::IntersectingPassages,
        LayoutIssue::Tunnel,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LayoutIssue::UnplacedRoom => "unplaced room",
            LayoutIssue::NoValidPath => "no valid path",
            LayoutIssue::IntersectingPassages => "intersecting passages",
            LayoutIssue::Tunnel => "tunnel",
        }
    }
}

impl fmt::Display for LayoutIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueRecord {
    UnplacedRoom { room: RoomId },
    NoValidPath { from: RoomId, to: RoomId },
    IntersectingPassages { first: PassageId, second: PassageId },
    Tunnel { passage: PassageId, room: RoomId },
}

impl IssueRecord {
    pub fn issue(&self) -> LayoutIssue {
        match self {
            IssueRecord::UnplacedRoom { .. } => LayoutIssue::UnplacedRoom,
            IssueRecord::NoValidPath { .. } => LayoutIssue::NoValidPath,
            IssueRecord::IntersectingPassages { .. } => LayoutIssue::IntersectingPassages,
            IssueRecord::Tunnel { .. } => LayoutIssue::Tunnel,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    counts: BTreeMap<LayoutIssue, usize>,
    records: Vec<IssueRecord>,
}

impl Diagnostics {
    pub fn record(&mut self, record: IssueRecord) {
        *self.counts.entry(record.issue()).or_default() += 1;
        self.records.push(record);
    }

    pub fn count(&self, issue: LayoutIssue) -> usize {
        self.counts.get(&issue).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn is_clean(&self) -> bool {
        self.records.is_empty()
    }

    pub fn counts(&self) -> &BTreeMap<LayoutIssue, usize> {
        &self.counts
    }

    pub fn records(&self) -> &[IssueRecord] {
        &self.records
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return f.write_str("no layout issues");
        }
        let parts: Vec<String> =
            self.counts.iter().map(|(issue, count)| format!("{count} {issue}")).collect();
        f.write_str(&parts.join(", "))
    }
}
