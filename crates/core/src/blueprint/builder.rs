//! Lays a phrase graph out as a blueprint.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};
use slotmap::SecondaryMap;

use crate::grammar::PhraseGraph;
use crate::random::RandomSource;
use crate::types::Pos;

use super::LayoutError;
use super::config::LayoutConfig;
use super::diagnostics::{Diagnostics, IssueRecord};
use super::model::{Blueprint, BlueprintRoom, Passage, PassageId};
use super::placement::Placer;
use super::routing::Router;

/// Embeds `graph` on the grid.
///
/// Rooms are placed in traversal order starting from the graph's start room,
/// then every link whose rooms were both placed gets a passage. Placement and
/// routing failures are recorded in the blueprint's diagnostics; only an
/// unusable config or graph is an error.
pub fn layout(
    graph: &PhraseGraph,
    rng: &mut dyn RandomSource,
    config: &LayoutConfig,
) -> Result<Blueprint, LayoutError> {
    config.validate()?;
    if graph.is_empty() {
        return Ok(Blueprint::default());
    }
    let start = graph.start().ok_or(LayoutError::MissingStart)?;

    let order = graph.traversal_order();
    if order.len() != graph.len() {
        return Err(LayoutError::Disconnected {
            unreachable: graph.len() - order.len(),
            total: graph.len(),
        });
    }

    let mut rooms = Vec::with_capacity(order.len());
    for id in order {
        let Some(room) = graph.room(id) else {
            continue;
        };
        if !room.meta.has_valid_footprint() {
            return Err(LayoutError::InvalidFootprint {
                term: room.term.clone(),
                width: room.meta.width,
                height: room.meta.height,
            });
        }
        rooms.push(BlueprintRoom::unplaced(id, room.term.clone(), room.meta.clone()));
    }

    let mut diagnostics = Diagnostics::default();
    Placer::new(graph, config).place_all(&mut rooms, rng, &mut diagnostics);
    let passages = route_links(graph, &mut rooms, config, rng, &mut diagnostics);
    audit_passages(&rooms, &passages, &mut diagnostics);

    debug!(
        "laid out {} of {} rooms with {} passages ({})",
        rooms.iter().filter(|room| room.is_placed()).count(),
        rooms.len(),
        passages.len(),
        diagnostics
    );
    Ok(Blueprint::from_parts(rooms, passages, diagnostics, Some(start), graph.exit()))
}

fn route_links(
    graph: &PhraseGraph,
    rooms: &mut [BlueprintRoom],
    config: &LayoutConfig,
    rng: &mut dyn RandomSource,
    diagnostics: &mut Diagnostics,
) -> Vec<Passage> {
    let mut positions = SecondaryMap::new();
    let mut bounds = SecondaryMap::new();
    for (position, room) in rooms.iter().enumerate() {
        positions.insert(room.id, position);
        if let Some(rect) = room.bounds {
            bounds.insert(room.id, rect);
        }
    }

    let mut router = Router::new(config, bounds.values().copied().collect());
    let mut passages = Vec::new();
    for (from, to) in graph.links() {
        let (Some(&from_rect), Some(&to_rect)) = (bounds.get(from), bounds.get(to)) else {
            trace!("skipping link with an unplaced end");
            continue;
        };
        let Some(cells) = router.route(from_rect, to_rect, rng) else {
            diagnostics.record(IssueRecord::NoValidPath { from, to });
            continue;
        };

        router.commit(&cells);
        let id = PassageId(passages.len() as u32);
        for end in [from, to] {
            if let Some(&position) = positions.get(end) {
                rooms[position].passages.push(id);
            }
        }
        passages.push(Passage { id, from, to, cells });
    }
    passages
}

/// Counts passages that share cells and passages that run through a room.
fn audit_passages(rooms: &[BlueprintRoom], passages: &[Passage], diagnostics: &mut Diagnostics) {
    let mut owners: BTreeMap<Pos, BTreeSet<PassageId>> = BTreeMap::new();
    for passage in passages {
        for &cell in &passage.cells {
            owners.entry(cell).or_default().insert(passage.id);
        }
    }
    let mut pairs = BTreeSet::new();
    for shared in owners.values().filter(|owners| owners.len() > 1) {
        let shared: Vec<PassageId> = shared.iter().copied().collect();
        for (index, &first) in shared.iter().enumerate() {
            for &second in &shared[index + 1..] {
                pairs.insert((first, second));
            }
        }
    }
    for (first, second) in pairs {
        diagnostics.record(IssueRecord::IntersectingPassages { first, second });
    }

    for passage in passages {
        for room in rooms {
            let Some(bounds) = room.bounds else {
                continue;
            };
            if passage.cells.iter().any(|&cell| bounds.contains(cell)) {
                diagnostics.record(IssueRecord::Tunnel { passage: passage.id, room: room.id });
            }
        }
    }
}
