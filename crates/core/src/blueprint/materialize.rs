//! Writes a blueprint onto a tile grid.

use serde::Serialize;

use crate::types::Pos;

use super::geometry::Rect;
use super::model::Blueprint;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tile {
    #[default]
    Empty,
    Wall,
    Floor,
    Door,
    Corridor,
}

impl Tile {
    pub fn glyph(self) -> char {
        match self {
            Tile::Empty => ' ',
            Tile::Wall => '#',
            Tile::Floor => '.',
            Tile::Door => '+',
            Tile::Corridor => ':',
        }
    }
}

/// Anything a blueprint can be drawn into.
pub trait TileSink {
    fn get(&self, pos: Pos) -> Tile;
    fn set(&mut self, pos: Pos, tile: Tile);
}

/// Draws walls around each placed room, floor inside, corridor cells along
/// passages and a door where each passage meets a room.
pub fn materialize(blueprint: &Blueprint, sink: &mut dyn TileSink) {
    for (_, bounds) in blueprint.placed_rooms() {
        for cell in bounds.cells() {
            let tile = if bounds.is_on_border(cell) { Tile::Wall } else { Tile::Floor };
            sink.set(cell, tile);
        }
    }

    for passage in blueprint.passages() {
        for &cell in passage.cells() {
            sink.set(cell, Tile::Corridor);
        }
        let ends = [
            (passage.cells().first(), passage.from()),
            (passage.cells().last(), passage.to()),
        ];
        for (end, room) in ends {
            let (Some(&end), Some(bounds)) = (end, blueprint.room(room).and_then(|room| room.bounds()))
            else {
                continue;
            };
            if let Some(door) = end.neighbors().into_iter().find(|&cell| bounds.is_on_border(cell)) {
                sink.set(door, Tile::Door);
            }
        }
    }
}

/// Dense tile storage covering a fixed box of the grid. Writes outside the
/// box are dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileGrid {
    area: Rect,
    tiles: Vec<Tile>,
}

impl TileGrid {
    pub fn new(area: Rect) -> Self {
        let len = (area.width.max(0) * area.height.max(0)) as usize;
        Self { area, tiles: vec![Tile::Empty; len] }
    }

    /// A grid one cell larger than the blueprint on every side, already drawn.
    pub fn for_blueprint(blueprint: &Blueprint) -> Self {
        let area = blueprint.extent().map_or(Rect::new(0, 0, 0, 0), |extent| extent.expanded(1));
        let mut grid = Self::new(area);
        materialize(blueprint, &mut grid);
        grid
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    fn index(&self, pos: Pos) -> Option<usize> {
        self.area.contains(pos).then(|| {
            ((pos.y - self.area.y) * self.area.width + (pos.x - self.area.x)) as usize
        })
    }

    pub fn count(&self, tile: Tile) -> usize {
        self.tiles.iter().filter(|&&candidate| candidate == tile).count()
    }

    pub fn render_ascii(&self) -> String {
        let mut out = String::with_capacity(self.tiles.len() + self.area.height.max(0) as usize);
        for row in self.tiles.chunks(self.area.width.max(1) as usize) {
            out.extend(row.iter().map(|tile| tile.glyph()));
            out.push('\n');
        }
        out
    }
}

impl TileSink for TileGrid {
    fn get(&self, pos: Pos) -> Tile {
        self.index(pos).map_or(Tile::Empty, |index| self.tiles[index])
    }

    fn set(&mut self, pos: Pos, tile: Tile) {
        if let Some(index) = self.index(pos) {
            self.tiles[index] = tile;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::{LayoutConfig, layout};
    use crate::grammar::{PhraseGraph, RoomMeta, TermId};
    use crate::random::SeededRandom;

    fn two_rooms() -> Blueprint {
        let mut graph = PhraseGraph::new();
        let meta = RoomMeta { width: 5, height: 5, ..RoomMeta::default() };
        let first = graph.add_room(TermId::from("A"), meta.clone(), 0);
        let second = graph.add_room(TermId::from("B"), meta, 0);
        graph.link(first, second);
        graph.set_start(first);
        layout(&graph, &mut SeededRandom::new(21), &LayoutConfig::default()).expect("layout")
    }

    #[test]
    fn rooms_passages_and_doors_are_drawn() {
        let blueprint = two_rooms();
        let grid = TileGrid::for_blueprint(&blueprint);
        let passage = &blueprint.passages()[0];

        assert_eq!(grid.count(Tile::Door), 2);
        assert_eq!(grid.count(Tile::Corridor), passage.len());
        assert_eq!(grid.count(Tile::Floor), 2 * 9);
        assert_eq!(grid.count(Tile::Wall), 2 * 16 - 2);
        for &cell in passage.cells() {
            assert_eq!(grid.get(cell), Tile::Corridor);
        }
    }

    #[test]
    fn ascii_has_one_line_per_row() {
        let grid = TileGrid::for_blueprint(&two_rooms());
        let ascii = grid.render_ascii();
        let lines: Vec<&str> = ascii.lines().collect();
        assert_eq!(lines.len(), grid.area().height as usize);
        assert!(lines.iter().all(|line| line.chars().count() == grid.area().width as usize));
        assert!(ascii.contains('+'));
    }

    #[test]
    fn writes_outside_the_grid_are_ignored() {
        let mut grid = TileGrid::new(Rect::new(0, 0, 2, 2));
        grid.set(Pos { y: 5, x: 5 }, Tile::Wall);
        grid.set(Pos { y: 1, x: 0 }, Tile::Floor);
        assert_eq!(grid.get(Pos { y: 5, x: 5 }), Tile::Empty);
        assert_eq!(grid.render_ascii(), "  \n. \n");
    }

    #[test]
    fn empty_blueprint_renders_nothing() {
        let grid = TileGrid::for_blueprint(&Blueprint::default());
        assert_eq!(grid.render_ascii(), "");
    }
}
