//! Arena-backed phrase graph produced by grammar expansion.

use std::collections::VecDeque;

use slotmap::{SecondaryMap, SlotMap};

use crate::types::RoomId;

use super::term::{RoomMeta, TermId};

/// A room in the abstract graph. Links are ids into the owning graph.
#[derive(Clone, Debug, PartialEq)]
pub struct PhraseRoom {
    pub term: TermId,
    pub meta: RoomMeta,
    /// Number of rewrites between this room and the start phrase.
    pub depth: u32,
    outgoing: Vec<RoomId>,
    incoming: Vec<RoomId>,
}

impl PhraseRoom {
    pub fn outgoing(&self) -> &[RoomId] {
        &self.outgoing
    }

    pub fn incoming(&self) -> &[RoomId] {
        &self.incoming
    }
}

#[derive(Clone, Debug, Default)]
pub struct PhraseGraph {
    rooms: SlotMap<RoomId, PhraseRoom>,
    start: Option<RoomId>,
    exit: Option<RoomId>,
    unresolved: usize,
}

impl PhraseGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn start(&self) -> Option<RoomId> {
        self.start
    }

    pub fn exit(&self) -> Option<RoomId> {
        self.exit
    }

    pub fn set_start(&mut self, room: RoomId) {
        self.start = Some(room);
    }

    pub fn set_exit(&mut self, room: RoomId) {
        self.exit = Some(room);
    }

    /// Rooms still waiting to be rewritten when expansion stopped. Non-zero
    /// only when the iteration cap was hit.
    pub fn unresolved(&self) -> usize {
        self.unresolved
    }

    pub fn budget_exhausted(&self) -> bool {
        self.unresolved > 0
    }

    pub(crate) fn set_unresolved(&mut self, unresolved: usize) {
        self.unresolved = unresolved;
    }

    pub fn room(&self, id: RoomId) -> Option<&PhraseRoom> {
        self.rooms.get(id)
    }

    pub fn room_mut(&mut self, id: RoomId) -> Option<&mut PhraseRoom> {
        self.rooms.get_mut(id)
    }

    pub fn rooms(&self) -> impl Iterator<Item = (RoomId, &PhraseRoom)> {
        self.rooms.iter()
    }

    pub fn add_room(&mut self, term: TermId, meta: RoomMeta, depth: u32) -> RoomId {
        self.rooms.insert(PhraseRoom {
            term,
            meta,
            depth,
            outgoing: Vec::new(),
            incoming: Vec::new(),
        })
    }

    pub fn outgoing(&self, id: RoomId) -> &[RoomId] {
        self.rooms.get(id).map_or(&[], |room| room.outgoing.as_slice())
    }

    pub fn incoming(&self, id: RoomId) -> &[RoomId] {
        self.rooms.get(id).map_or(&[], |room| room.incoming.as_slice())
    }

    /// Adds a directed link. Self links, duplicate links and links to
    /// missing rooms are ignored and reported as `false`.
    pub fn link(&mut self, from: RoomId, to: RoomId) -> bool {
        if from == to || !self.rooms.contains_key(from) || !self.rooms.contains_key(to) {
            return false;
        }
        if self.rooms[from].outgoing.contains(&to) {
            return false;
        }
        self.rooms[from].outgoing.push(to);
        self.rooms[to].incoming.push(from);
        true
    }

    pub fn unlink(&mut self, from: RoomId, to: RoomId) -> bool {
        let Some(source) = self.rooms.get_mut(from) else {
            return false;
        };
        let Some(position) = source.outgoing.iter().position(|&child| child == to) else {
            return false;
        };
        source.outgoing.remove(position);
        if let Some(target) = self.rooms.get_mut(to) {
            target.incoming.retain(|&parent| parent != from);
        }
        true
    }

    /// True when a link exists in either direction.
    pub fn are_adjacent(&self, a: RoomId, b: RoomId) -> bool {
        self.outgoing(a).contains(&b) || self.outgoing(b).contains(&a)
    }

    pub fn link_count(&self) -> usize {
        self.rooms.values().map(|room| room.outgoing.len()).sum()
    }

    /// Breadth-first order from the start room, following outgoing links and
    /// then incoming links in insertion order. Rooms unreachable from the
    /// start are not included.
    pub fn traversal_order(&self) -> Vec<RoomId> {
        let Some(start) = self.start else {
            return Vec::new();
        };
        let mut order = Vec::with_capacity(self.rooms.len());
        let mut seen = SecondaryMap::new();
        let mut open = VecDeque::from([start]);
        seen.insert(start, ());
        while let Some(id) = open.pop_front() {
            order.push(id);
            for &next in self.outgoing(id).iter().chain(self.incoming(id)) {
                if seen.insert(next, ()).is_none() {
                    open.push_back(next);
                }
            }
        }
        order
    }

    /// Links as `(from, to)` pairs in traversal order.
    pub fn links(&self) -> Vec<(RoomId, RoomId)> {
        self.traversal_order()
            .into_iter()
            .flat_map(|from| self.outgoing(from).iter().map(move |&to| (from, to)))
            .collect()
    }

    /// True when every room is reachable from the start ignoring link direction.
    pub fn is_connected(&self) -> bool {
        self.traversal_order().len() == self.rooms.len()
    }

    /// Rooms within `max_hops` undirected links of `origin`, with their distance,
    /// in breadth-first order. The origin itself is excluded.
    pub fn rooms_within(&self, origin: RoomId, max_hops: u32) -> Vec<(RoomId, u32)> {
        let mut found = Vec::new();
        let mut seen = SecondaryMap::new();
        let mut open = VecDeque::from([(origin, 0_u32)]);
        seen.insert(origin, ());
        while let Some((id, distance)) = open.pop_front() {
            if distance > 0 {
                found.push((id, distance));
            }
            if distance == max_hops {
                continue;
            }
            for &next in self.outgoing(id).iter().chain(self.incoming(id)) {
                if seen.insert(next, ()).is_none() {
                    open.push_back((next, distance + 1));
                }
            }
        }
        found
    }

    /// Stable encoding of the graph's shape: terms and links by traversal index.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let order = self.traversal_order();
        let mut index = SecondaryMap::new();
        for (position, &id) in order.iter().enumerate() {
            index.insert(id, position as u32);
        }

        let mut bytes = Vec::new();
        bytes.extend((self.rooms.len() as u32).to_le_bytes());
        bytes.extend((order.len() as u32).to_le_bytes());
        for &id in &order {
            let room = &self.rooms[id];
            bytes.extend((room.term.as_str().len() as u32).to_le_bytes());
            bytes.extend(room.term.as_str().as_bytes());
            bytes.extend(room.depth.to_le_bytes());
            bytes.extend((room.outgoing.len() as u32).to_le_bytes());
            for &child in &room.outgoing {
                bytes.extend(index.get(child).copied().unwrap_or(u32::MAX).to_le_bytes());
            }
        }
        let exit_index = self.exit.and_then(|exit| index.get(exit).copied());
        bytes.extend(exit_index.unwrap_or(u32::MAX).to_le_bytes());
        bytes
    }
}
