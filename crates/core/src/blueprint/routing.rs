//! Carves passages between placed rooms.
//!
//! Routes are tried cheapest first: straight runs through shared rows or
//! columns, then single-bend paths, then a breadth-first detour bounded
//! around both rooms. A route never enters a room. Crossing an earlier
//! passage is accepted only when nothing cleaner exists.

use std::collections::{HashMap, HashSet, VecDeque};

use log::trace;

use crate::random::{RandomSource, shuffle};
use crate::types::Pos;

use super::config::LayoutConfig;
use super::geometry::{Rect, straight_run};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RouteQuality {
    Clean,
    Crossing,
    Blocked,
}

pub(super) struct Router<'a> {
    config: &'a LayoutConfig,
    rooms: Vec<Rect>,
    carved: HashSet<Pos>,
}

impl<'a> Router<'a> {
    pub(super) fn new(config: &'a LayoutConfig, rooms: Vec<Rect>) -> Self {
        Self { config, rooms, carved: HashSet::new() }
    }

    /// Marks `cells` as taken so later routes try to steer around them.
    pub(super) fn commit(&mut self, cells: &[Pos]) {
        self.carved.extend(cells.iter().copied());
    }

    /// Cells leading from just outside `from` to just outside `to`, or `None`
    /// when every strategy is blocked by rooms.
    pub(super) fn route(&self, from: Rect, to: Rect, rng: &mut dyn RandomSource) -> Option<Vec<Pos>> {
        let mut fallback = None;
        let candidates = self
            .straight_candidates(from, to, rng)
            .into_iter()
            .chain(self.bent_candidates(from, to, rng));
        for candidate in candidates {
            match self.classify(&candidate) {
                RouteQuality::Clean => return Some(candidate),
                RouteQuality::Crossing if fallback.is_none() => fallback = Some(candidate),
                _ => {}
            }
        }

        if let Some(detour) = self.detour(from, to, true, rng) {
            return Some(detour);
        }
        if fallback.is_some() {
            trace!("accepting a crossing route between {from:?} and {to:?}");
            return fallback;
        }
        self.detour(from, to, false, rng)
    }

    fn classify(&self, cells: &[Pos]) -> RouteQuality {
        if cells.is_empty() || cells.iter().any(|&cell| self.in_room(cell)) {
            RouteQuality::Blocked
        } else if cells.iter().any(|cell| self.carved.contains(cell)) {
            RouteQuality::Crossing
        } else {
            RouteQuality::Clean
        }
    }

    fn in_room(&self, cell: Pos) -> bool {
        self.rooms.iter().any(|room| room.contains(cell))
    }

    /// One vertical or horizontal run per shared column or row, starting
    /// from a random one. Columns on either room's outline are kept last.
    fn straight_candidates(&self, from: Rect, to: Rect, rng: &mut dyn RandomSource) -> Vec<Vec<Pos>> {
        if let Some(shared) = from.column_overlap(to) {
            let (start, end) = if from.bottom() <= to.y {
                (from.bottom(), to.y - 1)
            } else {
                (from.y - 1, to.bottom())
            };
            if !gap_is_open(start, end, from.bottom() <= to.y) {
                return Vec::new();
            }
            return rotated_lanes(shared, (from.x, from.right()), (to.x, to.right()), rng)
                .into_iter()
                .map(|x| straight_run(Pos { y: start, x }, Pos { y: end, x }))
                .collect();
        }
        if let Some(shared) = from.row_overlap(to) {
            let (start, end) = if from.right() <= to.x {
                (from.right(), to.x - 1)
            } else {
                (from.x - 1, to.right())
            };
            if !gap_is_open(start, end, from.right() <= to.x) {
                return Vec::new();
            }
            return rotated_lanes(shared, (from.y, from.bottom()), (to.y, to.bottom()), rng)
                .into_iter()
                .map(|y| straight_run(Pos { y, x: start }, Pos { y, x: end }))
                .collect();
        }
        Vec::new()
    }

    /// Single-bend paths for rooms that share no rows or columns. Both bend
    /// orientations are sampled, in random order.
    fn bent_candidates(&self, from: Rect, to: Rect, rng: &mut dyn RandomSource) -> Vec<Vec<Pos>> {
        if from.column_overlap(to).is_some() || from.row_overlap(to).is_some() {
            return Vec::new();
        }
        let to_east = to.x >= from.right();
        let to_south = to.y >= from.bottom();
        let horizontal_first = rng.next_int(2) == 0;

        let mut candidates = Vec::new();
        for horizontal in [horizontal_first, !horizontal_first] {
            for _ in 0..self.config.route_attempts {
                let (start, corner, end) = if horizontal {
                    let y = interior(rng, from.y, from.bottom());
                    let x = interior(rng, to.x, to.right());
                    (
                        Pos { y, x: if to_east { from.right() } else { from.x - 1 } },
                        Pos { y, x },
                        Pos { y: if to_south { to.y - 1 } else { to.bottom() }, x },
                    )
                } else {
                    let x = interior(rng, from.x, from.right());
                    let y = interior(rng, to.y, to.bottom());
                    (
                        Pos { y: if to_south { from.bottom() } else { from.y - 1 }, x },
                        Pos { y, x },
                        Pos { y, x: if to_east { to.x - 1 } else { to.right() } },
                    )
                };
                let mut cells = straight_run(start, corner);
                cells.extend(straight_run(corner, end).into_iter().skip(1));
                candidates.push(cells);
            }
        }
        candidates
    }

    /// Shortest path between the rooms' outer ports inside a box around both
    /// rooms. Sources are seeded in random order and ties between equally
    /// close goals are broken at random.
    fn detour(
        &self,
        from: Rect,
        to: Rect,
        avoid_passages: bool,
        rng: &mut dyn RandomSource,
    ) -> Option<Vec<Pos>> {
        let area = from.union(to).expanded(self.config.detour_margin + 1);
        let blocked = |cell: Pos| {
            !area.contains(cell)
                || self.in_room(cell)
                || (avoid_passages && self.carved.contains(&cell))
        };
        let goals: HashSet<Pos> = to.ports().into_iter().filter(|&cell| !blocked(cell)).collect();
        if goals.is_empty() {
            return None;
        }

        let mut sources = from.ports();
        shuffle(&mut sources, rng);
        let mut parents: HashMap<Pos, Option<Pos>> = HashMap::new();
        let mut open = VecDeque::new();
        for port in sources {
            if !blocked(port) && !parents.contains_key(&port) {
                parents.insert(port, None);
                open.push_back((port, 0_u32));
            }
        }

        let mut reached = Vec::new();
        let mut reached_distance = None;
        while let Some((cell, distance)) = open.pop_front() {
            if reached_distance.is_some_and(|best| distance > best) {
                break;
            }
            if goals.contains(&cell) {
                reached_distance = Some(distance);
                reached.push(cell);
                continue;
            }
            if parents.len() >= self.config.route_cell_budget {
                continue;
            }
            for next in cell.neighbors() {
                if parents.contains_key(&next) || blocked(next) {
                    continue;
                }
                parents.insert(next, Some(cell));
                open.push_back((next, distance + 1));
            }
        }

        if reached.is_empty() {
            trace!(
                "detour between {from:?} and {to:?} found nothing after {} cells",
                parents.len()
            );
            return None;
        }
        let goal = reached[rng.next_int(reached.len() as u32) as usize];
        let mut path = vec![goal];
        let mut cursor = goal;
        while let Some(&Some(parent)) = parents.get(&cursor) {
            path.push(parent);
            cursor = parent;
        }
        path.reverse();
        Some(path)
    }
}

/// Lanes inside the half-open `shared` span, rotated to start at a random
/// lane. Lanes off both rooms' outlines come first.
fn rotated_lanes(
    shared: (i32, i32),
    from_span: (i32, i32),
    to_span: (i32, i32),
    rng: &mut dyn RandomSource,
) -> Vec<i32> {
    let is_inner = |lane: i32| {
        lane > from_span.0 && lane < from_span.1 - 1 && lane > to_span.0 && lane < to_span.1 - 1
    };
    let (inner, outline): (Vec<i32>, Vec<i32>) = (shared.0..shared.1).partition(|&lane| is_inner(lane));
    let mut lanes = Vec::with_capacity(inner.len() + outline.len());
    for group in [inner, outline] {
        if group.is_empty() {
            continue;
        }
        let offset = rng.next_int(group.len() as u32) as usize;
        lanes.extend(group.iter().cycle().skip(offset).take(group.len()));
    }
    lanes
}

/// False when the rooms touch, leaving no cell between them.
fn gap_is_open(start: i32, end: i32, forward: bool) -> bool {
    if forward { start <= end } else { start >= end }
}

/// A random coordinate in `[low, high)`, avoiding the outline when the span allows.
fn interior(rng: &mut dyn RandomSource, low: i32, high: i32) -> i32 {
    if high - low >= 3 {
        rng.range_inclusive(low + 1, high - 2)
    } else {
        rng.range_inclusive(low, high - 1)
    }
}
