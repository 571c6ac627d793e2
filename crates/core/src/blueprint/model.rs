//! Finalized spatial embedding of a phrase graph.

use std::collections::BTreeMap;

use slotmap::SecondaryMap;
use thiserror::Error;

use crate::grammar::{RoomMeta, TermId};
use crate::types::{Pos, RoomId};

use super::diagnostics::{Diagnostics, LayoutIssue};
use super::geometry::{Rect, waypoints};

/// Index of a passage inside its blueprint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PassageId(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub struct BlueprintRoom {
    pub(super) id: RoomId,
    pub(super) term: TermId,
    pub(super) meta: RoomMeta,
    pub(super) bounds: Option<Rect>,
    pub(super) passages: Vec<PassageId>,
}

impl BlueprintRoom {
    pub(super) fn unplaced(id: RoomId, term: TermId, meta: RoomMeta) -> Self {
        Self { id, term, meta, bounds: None, passages: Vec::new() }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn term(&self) -> &TermId {
        &self.term
    }

    pub fn meta(&self) -> &RoomMeta {
        &self.meta
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn category(&self) -> &str {
        &self.meta.category
    }

    pub fn data(&self) -> &BTreeMap<String, String> {
        &self.meta.data
    }

    /// `None` when the room could not be placed.
    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    pub fn is_placed(&self) -> bool {
        self.bounds.is_some()
    }

    pub fn passages(&self) -> &[PassageId] {
        &self.passages
    }
}

/// Routed connection between two placed rooms.
///
/// `cells` run from the cell next to `from`'s border to the cell next to
/// `to`'s border and never lie inside either room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Passage {
    pub(super) id: PassageId,
    pub(super) from: RoomId,
    pub(super) to: RoomId,
    pub(super) cells: Vec<Pos>,
}

impl Passage {
    pub fn id(&self) -> PassageId {
        self.id
    }

    pub fn from(&self) -> RoomId {
        self.from
    }

    pub fn to(&self) -> RoomId {
        self.to
    }

    pub fn cells(&self) -> &[Pos] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn connects(&self, room: RoomId) -> bool {
        self.from == room || self.to == room
    }

    /// End points and corners of the route.
    pub fn waypoints(&self) -> Vec<Pos> {
        waypoints(&self.cells)
    }
}

/// A broken layout guarantee found by [`Blueprint::verify`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LayoutViolation {
    #[error("rooms {first:?} and {second:?} are closer than the clearance")]
    Crowded { first: RoomId, second: RoomId },
    #[error("passage {0:?} has no cells")]
    EmptyPassage(PassageId),
    #[error("passage {0:?} is not contiguous")]
    BrokenPassage(PassageId),
    #[error("passage {passage:?} does not end beside room {room:?}")]
    DetachedPassage { passage: PassageId, room: RoomId },
    #[error("passage {passage:?} runs through room {room:?}")]
    PassageInRoom { passage: PassageId, room: RoomId },
}

#[derive(Clone, Debug, Default)]
pub struct Blueprint {
    rooms: Vec<BlueprintRoom>,
    index: SecondaryMap<RoomId, usize>,
    passages: Vec<Passage>,
    diagnostics: Diagnostics,
    start: Option<RoomId>,
    exit: Option<RoomId>,
}

impl Blueprint {
    pub(super) fn from_parts(
        rooms: Vec<BlueprintRoom>,
        passages: Vec<Passage>,
        diagnostics: Diagnostics,
        start: Option<RoomId>,
        exit: Option<RoomId>,
    ) -> Self {
        let mut index = SecondaryMap::new();
        for (position, room) in rooms.iter().enumerate() {
            index.insert(room.id, position);
        }
        Self { rooms, index, passages, diagnostics, start, exit }
    }

    /// Rooms in placement order, placed or not.
    pub fn rooms(&self) -> &[BlueprintRoom] {
        &self.rooms
    }

    pub fn room(&self, id: RoomId) -> Option<&BlueprintRoom> {
        self.index.get(id).map(|&position| &self.rooms[position])
    }

    pub fn placed_rooms(&self) -> impl Iterator<Item = (&BlueprintRoom, Rect)> {
        self.rooms.iter().filter_map(|room| room.bounds.map(|bounds| (room, bounds)))
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn passage(&self, id: PassageId) -> Option<&Passage> {
        self.passages.get(id.0 as usize)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn start(&self) -> Option<RoomId> {
        self.start
    }

    pub fn exit(&self) -> Option<RoomId> {
        self.exit
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Smallest box covering every placed room and passage cell.
    pub fn extent(&self) -> Option<Rect> {
        let rooms = self.placed_rooms().map(|(_, bounds)| bounds);
        let cells = self
            .passages
            .iter()
            .flat_map(|passage| passage.cells.iter())
            .map(|&cell| Rect::new(cell.x, cell.y, 1, 1));
        rooms.chain(cells).reduce(Rect::union)
    }

    /// Checks the guarantees layout keeps whatever the diagnostics say: placed
    /// rooms stay `clearance` apart, and every passage is a contiguous run
    /// from a port of its source room to a port of its target room that
    /// never enters a room.
    pub fn verify(&self, clearance: i32) -> Result<(), LayoutViolation> {
        let placed: Vec<(RoomId, Rect)> =
            self.placed_rooms().map(|(room, bounds)| (room.id, bounds)).collect();
        for (index, &(first, left)) in placed.iter().enumerate() {
            for &(second, right) in &placed[index + 1..] {
                if left.expanded(clearance).intersects(&right) {
                    return Err(LayoutViolation::Crowded { first, second });
                }
            }
        }

        for passage in &self.passages {
            let (Some(&first), Some(&last)) = (passage.cells.first(), passage.cells.last()) else {
                return Err(LayoutViolation::EmptyPassage(passage.id));
            };
            if passage.cells.windows(2).any(|pair| pair[0].manhattan(pair[1]) != 1) {
                return Err(LayoutViolation::BrokenPassage(passage.id));
            }
            for (end, room) in [(first, passage.from), (last, passage.to)] {
                let touches = self
                    .room(room)
                    .and_then(BlueprintRoom::bounds)
                    .is_some_and(|bounds| bounds.ports().contains(&end));
                if !touches {
                    return Err(LayoutViolation::DetachedPassage { passage: passage.id, room });
                }
            }
            for &(room, bounds) in &placed {
                if passage.cells.iter().any(|&cell| bounds.contains(cell)) {
                    return Err(LayoutViolation::PassageInRoom { passage: passage.id, room });
                }
            }
        }
        Ok(())
    }

    /// Stable encoding of rooms, passages and diagnostic counts, independent
    /// of arena keys.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend((self.rooms.len() as u32).to_le_bytes());
        for room in &self.rooms {
            bytes.extend((room.term.as_str().len() as u32).to_le_bytes());
            bytes.extend(room.term.as_str().as_bytes());
            match room.bounds {
                Some(bounds) => {
                    bytes.push(1);
                    for value in [bounds.x, bounds.y, bounds.width, bounds.height] {
                        bytes.extend(value.to_le_bytes());
                    }
                }
                None => bytes.push(0),
            }
        }

        bytes.extend((self.passages.len() as u32).to_le_bytes());
        for passage in &self.passages {
            let from = self.index.get(passage.from).copied().unwrap_or(usize::MAX);
            let to = self.index.get(passage.to).copied().unwrap_or(usize::MAX);
            bytes.extend((from as u32).to_le_bytes());
            bytes.extend((to as u32).to_le_bytes());
            bytes.extend((passage.cells.len() as u32).to_le_bytes());
            for cell in &passage.cells {
                bytes.extend(cell.y.to_le_bytes());
                bytes.extend(cell.x.to_le_bytes());
            }
        }

        for issue in LayoutIssue::ALL {
            bytes.extend((self.diagnostics.count(issue) as u32).to_le_bytes());
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::PhraseGraph;

    fn rooms_at(bounds: &[Rect]) -> Vec<BlueprintRoom> {
        let mut graph = PhraseGraph::new();
        bounds
            .iter()
            .map(|&rect| {
                let id = graph.add_room(TermId::from("Room"), RoomMeta::default(), 0);
                let mut room = BlueprintRoom::unplaced(id, TermId::from("Room"), RoomMeta::default());
                room.bounds = Some(rect);
                room
            })
            .collect()
    }

    fn passage(rooms: &[BlueprintRoom], cells: Vec<Pos>) -> Passage {
        Passage { id: PassageId(0), from: rooms[0].id, to: rooms[1].id, cells }
    }

    fn across(y: i32, from: i32, to: i32) -> Vec<Pos> {
        (from..=to).map(|x| Pos { y, x }).collect()
    }

    #[test]
    fn well_formed_blueprint_verifies() {
        let rooms = rooms_at(&[Rect::new(0, 0, 3, 3), Rect::new(6, 0, 3, 3)]);
        let passages = vec![passage(&rooms, across(1, 3, 5))];
        let blueprint = Blueprint::from_parts(rooms, passages, Diagnostics::default(), None, None);
        assert_eq!(blueprint.verify(1), Ok(()));
        assert_eq!(blueprint.extent(), Some(Rect::new(0, 0, 9, 3)));
    }

    #[test]
    fn crowded_rooms_fail_verification() {
        let rooms = rooms_at(&[Rect::new(0, 0, 3, 3), Rect::new(4, 0, 3, 3)]);
        let (first, second) = (rooms[0].id, rooms[1].id);
        let blueprint = Blueprint::from_parts(rooms, Vec::new(), Diagnostics::default(), None, None);
        assert_eq!(blueprint.verify(1), Ok(()));
        assert_eq!(blueprint.verify(2), Err(LayoutViolation::Crowded { first, second }));
    }

    #[test]
    fn malformed_passages_fail_verification() {
        let bounds = [Rect::new(0, 0, 3, 3), Rect::new(10, 0, 3, 3), Rect::new(5, 0, 3, 3)];
        let check = |cells: Vec<Pos>| {
            let rooms = rooms_at(&bounds);
            let passages = vec![passage(&rooms, cells)];
            Blueprint::from_parts(rooms, passages, Diagnostics::default(), None, None).verify(1)
        };

        assert_eq!(check(Vec::new()), Err(LayoutViolation::EmptyPassage(PassageId(0))));

        let mut gapped = across(4, 3, 9);
        gapped.remove(2);
        assert_eq!(check(gapped), Err(LayoutViolation::BrokenPassage(PassageId(0))));

        assert!(matches!(
            check(across(4, 4, 9)),
            Err(LayoutViolation::DetachedPassage { .. })
        ));
        assert!(matches!(
            check(across(1, 3, 9)),
            Err(LayoutViolation::PassageInRoom { .. })
        ));
    }
}
