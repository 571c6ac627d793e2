//! Spatial layout: turns a phrase graph into placed rooms and routed passages.

pub mod config;
pub mod diagnostics;
pub mod geometry;
pub mod materialize;
pub mod model;

mod builder;
mod placement;
mod routing;

use thiserror::Error;

use crate::grammar::TermId;

pub use builder::layout;
pub use config::{LayoutConfig, MAX_LAYOUT_EXTENT, MAX_PLACEMENT_GAP};
pub use diagnostics::{Diagnostics, IssueRecord, LayoutIssue};
pub use geometry::Rect;
pub use materialize::{Tile, TileGrid, TileSink, materialize};
pub use model::{Blueprint, BlueprintRoom, LayoutViolation, Passage, PassageId};

/// Failures that stop a layout outright. Recoverable trouble (rooms that do
/// not fit, links that cannot be routed) is reported through [`Diagnostics`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("invalid layout config: {0}")]
    InvalidConfig(String),
    #[error("phrase graph has rooms but no start room")]
    MissingStart,
    #[error("{unreachable} of {total} rooms are not connected to the start room")]
    Disconnected { unreachable: usize, total: usize },
    #[error("term `{term}` has a non-positive footprint {width}x{height}")]
    InvalidFootprint { term: TermId, width: i32, height: i32 },
}
