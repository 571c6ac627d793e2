//! Places room footprints next to already placed neighbours.

use log::{debug, trace};
use slotmap::SecondaryMap;

use crate::grammar::PhraseGraph;
use crate::random::{RandomSource, shuffle};
use crate::types::{Direction, Pos, RoomId};

use super::config::LayoutConfig;
use super::diagnostics::{Diagnostics, IssueRecord};
use super::geometry::Rect;
use super::model::BlueprintRoom;

/// Rows or columns a child shares with its anchor when both rooms are large enough.
const PREFERRED_SHARED_SPAN: i32 = 3;

pub(super) struct Placer<'a> {
    graph: &'a PhraseGraph,
    config: &'a LayoutConfig,
    occupied: Vec<Rect>,
    placed: SecondaryMap<RoomId, Rect>,
}

impl<'a> Placer<'a> {
    pub(super) fn new(graph: &'a PhraseGraph, config: &'a LayoutConfig) -> Self {
        Self { graph, config, occupied: Vec::new(), placed: SecondaryMap::new() }
    }

    /// Places `rooms` in order. The first room is centered on the origin;
    /// every later room is tried against its placed neighbours. Rooms that
    /// run out of attempts stay unplaced and are recorded in `diagnostics`.
    pub(super) fn place_all(
        mut self,
        rooms: &mut [BlueprintRoom],
        rng: &mut dyn RandomSource,
        diagnostics: &mut Diagnostics,
    ) {
        for (position, room) in rooms.iter_mut().enumerate() {
            let (width, height) = (room.meta.width, room.meta.height);
            let bounds = if position == 0 {
                let candidate = Rect::centered_at(Pos::ORIGIN, width, height);
                self.fits(candidate).then_some(candidate)
            } else {
                let anchors = self.anchors_for(room.id, rng);
                self.place_near(&anchors, width, height, rng)
            };

            match bounds {
                Some(bounds) => {
                    trace!("placed `{}` at {:?}", room.term, bounds);
                    self.occupied.push(bounds);
                    self.placed.insert(room.id, bounds);
                    room.bounds = Some(bounds);
                }
                None => {
                    debug!("could not place `{}` ({}x{})", room.term, width, height);
                    diagnostics.record(IssueRecord::UnplacedRoom { room: room.id });
                }
            }
        }
    }

    /// Placed rooms linked to `room`, or the placed rooms closest to it in
    /// the graph when no direct neighbour is placed. Either way the anchors
    /// come back in an order drawn from `rng`.
    fn anchors_for(&self, room: RoomId, rng: &mut dyn RandomSource) -> Vec<Rect> {
        let mut anchors: Vec<Rect> = self
            .graph
            .incoming(room)
            .iter()
            .chain(self.graph.outgoing(room))
            .filter_map(|&neighbor| self.placed.get(neighbor).copied())
            .collect();
        if anchors.is_empty() {
            let placed: Vec<(Rect, u32)> = self
                .graph
                .rooms_within(room, u32::MAX)
                .into_iter()
                .filter_map(|(other, distance)| Some((*self.placed.get(other)?, distance)))
                .collect();
            if let Some(nearest) = placed.iter().map(|&(_, distance)| distance).min() {
                anchors = placed
                    .into_iter()
                    .filter(|&(_, distance)| distance == nearest)
                    .map(|(bounds, _)| bounds)
                    .collect();
            }
        }
        shuffle(&mut anchors, rng);
        anchors
    }

    fn place_near(
        &self,
        anchors: &[Rect],
        width: i32,
        height: i32,
        rng: &mut dyn RandomSource,
    ) -> Option<Rect> {
        let config = self.config;
        for round in 0..=config.backoff_rounds {
            let extra_gap = config.backoff_gap_step.saturating_mul(round as i32);
            for &anchor in anchors {
                for _ in 0..config.placement_attempts {
                    let direction = Direction::ALL[rng.weighted_pick(&config.direction_weights)?];
                    let gap = rng
                        .range_inclusive(config.min_gap, config.max_gap)
                        .saturating_add(extra_gap);
                    let candidate = candidate_beside(anchor, width, height, direction, gap, rng);
                    if self.fits(candidate) {
                        return Some(candidate);
                    }
                }
            }
            trace!("placement round {round} failed against {} anchors", anchors.len());
        }
        None
    }

    fn fits(&self, candidate: Rect) -> bool {
        if let Some(bound) = self.config.bound
            && (candidate.x < -bound
                || candidate.y < -bound
                || candidate.right() > bound
                || candidate.bottom() > bound)
        {
            return false;
        }
        let clearance = self.config.clearance;
        self.occupied.iter().all(|placed| !candidate.intersects(&placed.expanded(clearance)))
    }
}

/// A `width` x `height` box `gap` cells away from `anchor` toward `direction`,
/// slid sideways at random while still sharing rows or columns with it.
fn candidate_beside(
    anchor: Rect,
    width: i32,
    height: i32,
    direction: Direction,
    gap: i32,
    rng: &mut dyn RandomSource,
) -> Rect {
    if direction.is_vertical() {
        let shared = PREFERRED_SHARED_SPAN.min(width).min(anchor.width);
        let x = rng.range_inclusive(
            anchor.x.saturating_sub(width - shared),
            anchor.right().saturating_sub(shared),
        );
        let y = match direction {
            Direction::North => anchor.y.saturating_sub(gap).saturating_sub(height),
            _ => anchor.bottom().saturating_add(gap),
        };
        Rect::new(x, y, width, height)
    } else {
        let shared = PREFERRED_SHARED_SPAN.min(height).min(anchor.height);
        let y = rng.range_inclusive(
            anchor.y.saturating_sub(height - shared),
            anchor.bottom().saturating_sub(shared),
        );
        let x = match direction {
            Direction::West => anchor.x.saturating_sub(gap).saturating_sub(width),
            _ => anchor.right().saturating_add(gap),
        };
        Rect::new(x, y, width, height)
    }
}
