//! Outlines of irregular footprints.
//!
//! [`trace`] follows the boundary of every occupied blob of a
//! [`FootprintMask`] clockwise (occupied area on the right hand side), so
//! holes come out counter-clockwise. Coordinates are tile corners: the
//! north-west corner of tile `(row, col)` is the point `(row, col)`.

use serde::{Deserialize, Serialize};

use crate::footprint::FootprintMask;
use crate::geometry::TileCoords;

/// One side of a tile. Discriminants double as bits of an [`EdgeSet`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Edge {
    Top = 1,
    Right = 2,
    Bottom = 4,
    Left = 8,
}

impl Edge {
    pub const CLOCKWISE: [Edge; 4] = [Edge::Top, Edge::Right, Edge::Bottom, Edge::Left];

    pub fn clockwise(self) -> Edge {
        match self {
            Edge::Top => Edge::Right,
            Edge::Right => Edge::Bottom,
            Edge::Bottom => Edge::Left,
            Edge::Left => Edge::Top,
        }
    }

    pub fn counter_clockwise(self) -> Edge {
        match self {
            Edge::Top => Edge::Left,
            Edge::Right => Edge::Top,
            Edge::Bottom => Edge::Right,
            Edge::Left => Edge::Bottom,
        }
    }

    /// Direction in which this edge is drawn, e.g. skirting along the top
    /// edge heads east.
    pub fn step(self) -> Step {
        match self {
            Edge::Top => Step::East,
            Edge::Right => Step::South,
            Edge::Bottom => Step::West,
            Edge::Left => Step::North,
        }
    }

    /// `(rows, cols)` offset to the tile on the other side of this edge.
    fn across(self) -> (isize, isize) {
        match self {
            Edge::Top => (-1, 0),
            Edge::Right => (0, 1),
            Edge::Bottom => (1, 0),
            Edge::Left => (0, -1),
        }
    }
}

/// Set of the edges of a single tile.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct EdgeSet(u8);

impl EdgeSet {
    /// Boundary edges of a cell: those facing an unoccupied or out of bounds
    /// neighbour. Unoccupied cells have none.
    pub fn boundary_of(mask: &FootprintMask, row: isize, col: isize) -> EdgeSet {
        let mut edges = EdgeSet::default();
        if !mask.get(row, col) {
            return edges;
        }
        for edge in Edge::CLOCKWISE {
            let (dr, dc) = edge.across();
            if !mask.get(row + dr, col + dc) {
                edges.insert(edge);
            }
        }
        edges
    }

    pub fn contains(&self, edge: Edge) -> bool {
        self.0 & edge as u8 != 0
    }

    pub fn insert(&mut self, edge: Edge) {
        self.0 |= edge as u8;
    }

    pub fn remove(&mut self, edge: Edge) {
        self.0 &= !(edge as u8);
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }
}

/// Unit of travel along a contour.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Step {
    /// +1 col
    East,
    /// +1 row
    South,
    /// -1 col
    West,
    /// -1 row
    North,
}

impl Step {
    /// `(rows, cols)` travelled by one unit step.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Step::East => (0, 1),
            Step::South => (1, 0),
            Step::West => (0, -1),
            Step::North => (-1, 0),
        }
    }
}

/// A straight run of `length` unit steps.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Segment {
    pub step: Step,
    pub length: u32,
}

/// A closed outline: a start corner and the runs that lead back to it.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Contour {
    pub start: TileCoords,
    pub segments: Vec<Segment>,
}

impl Contour {
    fn new(start: TileCoords) -> Self {
        Contour {
            start,
            segments: Vec::new(),
        }
    }

    /// Appends a unit step, extending the last run if it heads the same way.
    fn push(&mut self, step: Step) {
        match self.segments.last_mut() {
            Some(last) if last.step == step => last.length += 1,
            _ => self.segments.push(Segment { step, length: 1 }),
        }
    }

    /// Total number of unit steps.
    pub fn perimeter(&self) -> u32 {
        self.segments.iter().map(|segment| segment.length).sum()
    }

    /// Every unit step as `(corner it starts from, direction)`.
    pub fn unit_steps(&self) -> Vec<(TileCoords, Step)> {
        let mut corner = self.start;
        let mut steps = Vec::with_capacity(self.perimeter() as usize);
        for Segment { step, length } in self.segments.iter().copied() {
            let (dr, dc) = step.delta();
            for _ in 0..length {
                steps.push((corner, step));
                corner = corner.offset(dr, dc);
            }
        }
        steps
    }

    /// Corners where the contour changes direction, starting with `start`.
    pub fn vertices(&self) -> Vec<TileCoords> {
        let mut corner = self.start;
        let mut vertices = Vec::with_capacity(self.segments.len());
        for Segment { step, length } in self.segments.iter().copied() {
            vertices.push(corner);
            let (dr, dc) = step.delta();
            corner = corner.offset(dr * length as i32, dc * length as i32);
        }
        vertices
    }

    /// SVG path data, e.g. `M0,0h30v20h-30v-20z` for a 3x2 rectangle drawn
    /// with 10 unit tiles.
    pub fn to_path_data(&self, tile_side: u32) -> String {
        let side = tile_side as i64;
        let mut d = format!(
            "M{},{}",
            self.start.col as i64 * side,
            self.start.row as i64 * side
        );
        for Segment { step, length } in self.segments.iter() {
            let length = *length as i64 * side;
            let (axis, length) = match step {
                Step::East => ('h', length),
                Step::West => ('h', -length),
                Step::South => ('v', length),
                Step::North => ('v', -length),
            };
            d.push(axis);
            d.push_str(&length.to_string());
        }
        d.push('z');
        d
    }
}

/// Path data for every contour, one per line.
pub fn path_data(contours: &[Contour], tile_side: u32) -> String {
    contours
        .iter()
        .map(|contour| contour.to_path_data(tile_side))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Traces the outline of every occupied area of the mask, one contour per
/// boundary loop (separate blobs and holes each get their own).
pub fn trace(mask: &FootprintMask) -> Vec<Contour> {
    let mut skirting = Skirting::new(mask);
    let mut contours = Vec::new();
    for row in 0..mask.rows() as isize {
        for col in 0..mask.cols() as isize {
            if skirting.remaining(row, col).contains(Edge::Top) {
                contours.push(skirting.walk(row, col));
            }
        }
    }
    log::trace!(
        "Traced {} contour(s) for a {}x{} mask",
        contours.len(),
        mask.rows(),
        mask.cols()
    );
    contours
}

/// Edge bookkeeping for a trace. `boundaries` never changes, `remaining`
/// loses edges as they are drawn.
struct Skirting {
    cols: isize,
    boundaries: Vec<EdgeSet>,
    remaining: Vec<EdgeSet>,
}

impl Skirting {
    fn new(mask: &FootprintMask) -> Self {
        let (rows, cols) = (mask.rows() as isize, mask.cols() as isize);
        let boundaries: Vec<EdgeSet> = (0..rows)
            .flat_map(|row| (0..cols).map(move |col| (row, col)))
            .map(|(row, col)| EdgeSet::boundary_of(mask, row, col))
            .collect();
        Skirting {
            cols,
            remaining: boundaries.clone(),
            boundaries,
        }
    }

    fn index(&self, row: isize, col: isize) -> usize {
        (row * self.cols + col) as usize
    }

    fn remaining(&self, row: isize, col: isize) -> EdgeSet {
        self.remaining[self.index(row, col)]
    }

    fn is_boundary(&self, row: isize, col: isize, edge: Edge) -> bool {
        self.boundaries[self.index(row, col)].contains(edge)
    }

    fn walk(&mut self, row: isize, col: isize) -> Contour {
        let start = (row, col, Edge::Top);
        let mut contour = Contour::new(TileCoords::new(row as i32, col as i32));
        let mut current = start;
        loop {
            let (row, col, edge) = current;
            let index = self.index(row, col);
            self.remaining[index].remove(edge);
            contour.push(edge.step());
            current = self.next_edge(row, col, edge);
            if current == start {
                return contour;
            }
        }
    }

    /// The boundary edge drawn after `edge` of tile `(row, col)`.
    ///
    /// Either the next edge clockwise on the same tile (outer corner), the
    /// same edge on the neighbouring tile (straight line), or the previous edge
    /// clockwise on the diagonal tile (inner corner). The neighbour and
    /// diagonal tiles are always occupied when reached.
    fn next_edge(&self, row: isize, col: isize, edge: Edge) -> (isize, isize, Edge) {
        let turn = edge.clockwise();
        if self.is_boundary(row, col, turn) {
            return (row, col, turn);
        }
        let (dr, dc) = turn.across();
        let (row, col) = (row + dr, col + dc);
        if self.is_boundary(row, col, edge) {
            return (row, col, edge);
        }
        let (dr, dc) = edge.across();
        let (row, col) = (row + dr, col + dc);
        debug_assert!(self.is_boundary(row, col, edge.counter_clockwise()));
        (row, col, edge.counter_clockwise())
    }
}
