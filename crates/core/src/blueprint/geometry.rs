//! Integer rectangles and axis-aligned cell paths.

use serde::{Deserialize, Serialize};

use crate::types::Pos;

/// Axis-aligned box covering cells `x..x + width` by `y..y + height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Box of the given size whose center cell is `center`.
    pub fn centered_at(center: Pos, width: i32, height: i32) -> Self {
        Self { x: center.x - width / 2, y: center.y - height / 2, width, height }
    }

    /// Exclusive right edge.
    pub fn right(self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(self) -> i32 {
        self.y + self.height
    }

    pub fn center(self) -> Pos {
        Pos { y: self.y + self.height / 2, x: self.x + self.width / 2 }
    }

    pub fn expanded(self, margin: i32) -> Self {
        Self {
            x: self.x - margin,
            y: self.y - margin,
            width: self.width + 2 * margin,
            height: self.height + 2 * margin,
        }
    }

    pub fn intersects(self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn contains(self, pos: Pos) -> bool {
        pos.x >= self.x && pos.x < self.right() && pos.y >= self.y && pos.y < self.bottom()
    }

    /// True for cells inside the box that touch its outline.
    pub fn is_on_border(self, pos: Pos) -> bool {
        self.contains(pos)
            && (pos.x == self.x
                || pos.x == self.right() - 1
                || pos.y == self.y
                || pos.y == self.bottom() - 1)
    }

    pub fn union(self, other: Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    /// Half-open range of columns shared by both boxes.
    pub fn column_overlap(self, other: Rect) -> Option<(i32, i32)> {
        let from = self.x.max(other.x);
        let to = self.right().min(other.right());
        (from < to).then_some((from, to))
    }

    /// Half-open range of rows shared by both boxes.
    pub fn row_overlap(self, other: Rect) -> Option<(i32, i32)> {
        let from = self.y.max(other.y);
        let to = self.bottom().min(other.bottom());
        (from < to).then_some((from, to))
    }

    /// Cells just outside each side, corners excluded. North side first,
    /// then east, south and west, each scanned in increasing coordinate order.
    pub fn ports(self) -> Vec<Pos> {
        let mut ports = Vec::with_capacity(2 * (self.width + self.height).max(0) as usize);
        ports.extend((self.x..self.right()).map(|x| Pos { y: self.y - 1, x }));
        ports.extend((self.y..self.bottom()).map(|y| Pos { y, x: self.right() }));
        ports.extend((self.x..self.right()).map(|x| Pos { y: self.bottom(), x }));
        ports.extend((self.y..self.bottom()).map(|y| Pos { y, x: self.x - 1 }));
        ports
    }

    pub fn cells(self) -> impl Iterator<Item = Pos> {
        (self.y..self.bottom()).flat_map(move |y| (self.x..self.right()).map(move |x| Pos { y, x }))
    }
}

/// Inclusive run of cells from `from` to `to`, horizontal leg first.
pub fn straight_run(from: Pos, to: Pos) -> Vec<Pos> {
    let mut cells = vec![from];
    let mut cursor = from;
    while cursor.x != to.x {
        cursor.x += (to.x - cursor.x).signum();
        cells.push(cursor);
    }
    while cursor.y != to.y {
        cursor.y += (to.y - cursor.y).signum();
        cells.push(cursor);
    }
    cells
}

/// Compresses an orthogonal cell path into its end points and corners.
pub fn waypoints(cells: &[Pos]) -> Vec<Pos> {
    let mut points = Vec::new();
    for (index, &cell) in cells.iter().enumerate() {
        let is_end = index == 0 || index + 1 == cells.len();
        let is_corner = !is_end && {
            let previous = cells[index - 1];
            let next = cells[index + 1];
            (cell.x - previous.x, cell.y - previous.y) != (next.x - cell.x, next.y - cell.y)
        };
        if is_end || is_corner {
            points.push(cell);
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_is_half_open() {
        let left = Rect::new(0, 0, 4, 4);
        let touching = Rect::new(4, 0, 4, 4);
        let overlapping = Rect::new(3, 3, 4, 4);
        assert!(!left.intersects(&touching), "shared edge coordinate is not overlap");
        assert!(left.intersects(&overlapping));
        assert!(left.expanded(1).intersects(&touching));
    }

    #[test]
    fn expanded_grows_every_side() {
        let rect = Rect::new(2, 3, 4, 5).expanded(2);
        assert_eq!(rect, Rect::new(0, 1, 8, 9));
    }

    #[test]
    fn contains_and_border_follow_exclusive_edges() {
        let rect = Rect::new(0, 0, 3, 3);
        assert!(rect.contains(Pos { y: 2, x: 2 }));
        assert!(!rect.contains(Pos { y: 3, x: 0 }));
        assert!(rect.is_on_border(Pos { y: 0, x: 1 }));
        assert!(!rect.is_on_border(Pos { y: 1, x: 1 }));
    }

    #[test]
    fn ports_surround_the_box_without_corners() {
        let rect = Rect::new(0, 0, 2, 3);
        let ports = rect.ports();
        assert_eq!(ports.len(), 10);
        assert!(ports.iter().all(|&port| !rect.contains(port)));
        assert!(ports.iter().all(|&port| rect.expanded(1).contains(port)));
        assert!(!ports.contains(&Pos { y: -1, x: -1 }));
    }

    #[test]
    fn overlap_ranges_report_shared_columns_and_rows() {
        let a = Rect::new(0, 0, 5, 5);
        let b = Rect::new(3, 10, 5, 5);
        assert_eq!(a.column_overlap(b), Some((3, 5)));
        assert_eq!(a.row_overlap(b), None);
        assert_eq!(a.union(b), Rect::new(0, 0, 8, 15));
        assert_eq!(a.cells().count(), 25);
    }

    #[test]
    fn waypoints_keep_only_ends_and_corners() {
        let cells = straight_run(Pos { y: 0, x: 0 }, Pos { y: 3, x: 4 });
        assert_eq!(cells.len(), 8);
        assert_eq!(
            waypoints(&cells),
            vec![Pos { y: 0, x: 0 }, Pos { y: 0, x: 4 }, Pos { y: 3, x: 4 }]
        );
        assert_eq!(waypoints(&[Pos { y: 1, x: 1 }]), vec![Pos { y: 1, x: 1 }]);
    }
}
