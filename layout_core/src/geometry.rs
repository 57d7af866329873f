use std::fmt;

use serde::{Deserialize, Serialize};

/// A single tile of the grid. Rows grow southwards, columns grow eastwards.
/// There is no bound on either value.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct TileCoords {
    pub row: i32,
    pub col: i32,
}

impl TileCoords {
    pub const ORIGIN: TileCoords = TileCoords { row: 0, col: 0 };

    pub const fn new(row: i32, col: i32) -> Self {
        TileCoords { row, col }
    }

    pub fn offset(self, rows: i32, cols: i32) -> Self {
        TileCoords {
            row: self.row + rows,
            col: self.col + cols,
        }
    }
}

impl From<(i32, i32)> for TileCoords {
    /// Tuples are read as `(row, col)`.
    fn from((row, col): (i32, i32)) -> Self {
        TileCoords { row, col }
    }
}

impl fmt::Display for TileCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(row {}, col {})", self.row, self.col)
    }
}

/// Whether a footprint is laid out with its declared width along the columns
/// ([`Orientation::Horizontal`]) or along the rows ([`Orientation::Vertical`]).
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

/// Declared width and height of a footprint, in tiles.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Dimensions {
    pub w: u32,
    pub h: u32,
}

impl Dimensions {
    pub const fn new(w: u32, h: u32) -> Self {
        Dimensions { w, h }
    }

    /// Swaps width and height for [`Orientation::Vertical`].
    pub fn oriented(self, orientation: Orientation) -> Self {
        match orientation {
            Orientation::Horizontal => self,
            Orientation::Vertical => Dimensions {
                w: self.h,
                h: self.w,
            },
        }
    }
}

/// An inclusive, axis-aligned rectangle of tiles.
///
/// `nw` is never south or east of `se`, except for [`Region::EMPTY`], which
/// stands for "no tiles at all" and is what an empty grid reports as its
/// bounds.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Region {
    nw: TileCoords,
    se: TileCoords,
}

impl Region {
    pub const EMPTY: Region = Region {
        nw: TileCoords { row: 0, col: 0 },
        se: TileCoords { row: -1, col: -1 },
    };

    /// Creates the region spanning both corners. Corners given out of order
    /// are normalized.
    pub fn new<A: Into<TileCoords>, B: Into<TileCoords>>(a: A, b: B) -> Self {
        let (a, b) = (a.into(), b.into());
        Region {
            nw: TileCoords {
                row: a.row.min(b.row),
                col: a.col.min(b.col),
            },
            se: TileCoords {
                row: a.row.max(b.row),
                col: a.col.max(b.col),
            },
        }
    }

    pub fn single(tile: TileCoords) -> Self {
        Region { nw: tile, se: tile }
    }

    pub fn nw(&self) -> TileCoords {
        self.nw
    }

    pub fn se(&self) -> TileCoords {
        self.se
    }

    pub fn is_empty(&self) -> bool {
        self.se.row < self.nw.row || self.se.col < self.nw.col
    }

    /// Number of columns. Zero for the empty region, saturating at
    /// `u32::MAX`.
    pub fn width(&self) -> u32 {
        if self.is_empty() {
            0
        } else {
            span(self.nw.col, self.se.col)
        }
    }

    /// Number of rows. Zero for the empty region, saturating at `u32::MAX`.
    pub fn height(&self) -> u32 {
        if self.is_empty() {
            0
        } else {
            span(self.nw.row, self.se.row)
        }
    }

    pub fn contains(&self, tile: TileCoords) -> bool {
        !self.is_empty()
            && tile.row >= self.nw.row
            && tile.row <= self.se.row
            && tile.col >= self.nw.col
            && tile.col <= self.se.col
    }

    /// Smallest region containing both. [`Region::EMPTY`] is the identity.
    pub fn union(&self, other: &Region) -> Region {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Region {
            nw: TileCoords {
                row: self.nw.row.min(other.nw.row),
                col: self.nw.col.min(other.nw.col),
            },
            se: TileCoords {
                row: self.se.row.max(other.se.row),
                col: self.se.col.max(other.se.col),
            },
        }
    }

    /// Tight bounding box of all given regions, or [`Region::EMPTY`].
    pub fn bounding<'a, I: IntoIterator<Item = &'a Region>>(regions: I) -> Region {
        regions
            .into_iter()
            .fold(Region::EMPTY, |acc, region| acc.union(region))
    }

    /// Row-major iterator over every tile in the region.
    pub fn tiles(&self) -> impl Iterator<Item = TileCoords> {
        let Region { nw, se } = *self;
        (nw.row..=se.row).flat_map(move |row| (nw.col..=se.col).map(move |col| TileCoords { row, col }))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "[empty]")
        } else {
            write!(
                f,
                "[{},{} .. {},{}]",
                self.nw.row, self.nw.col, self.se.row, self.se.col
            )
        }
    }
}

fn span(first: i32, last: i32) -> u32 {
    u32::try_from(i64::from(last) - i64::from(first) + 1).unwrap_or(u32::MAX)
}

/// Last tile of a run of `len` tiles starting at `start`, if it is
/// representable.
fn run_end(start: i32, len: u32) -> Option<i32> {
    i32::try_from(i64::from(start) + i64::from(len) - 1).ok()
}

/// Region occupied by a footprint of the given declared dimensions anchored at
/// `at`, or `None` when its far corner lies past `i32::MAX`.
pub fn checked_compute_region(
    dimensions: Dimensions,
    at: TileCoords,
    orientation: Orientation,
) -> Option<Region> {
    let Dimensions { w, h } = dimensions.oriented(orientation);
    Some(Region {
        nw: at,
        se: TileCoords {
            row: run_end(at.row, h)?,
            col: run_end(at.col, w)?,
        },
    })
}

/// Region occupied by a footprint of the given declared dimensions anchored at
/// `at`. The far corner is clamped to `i32::MAX`; see
/// [`checked_compute_region`].
pub fn compute_region(dimensions: Dimensions, at: TileCoords, orientation: Orientation) -> Region {
    let Dimensions { w, h } = dimensions.oriented(orientation);
    Region {
        nw: at,
        se: TileCoords {
            row: run_end(at.row, h).unwrap_or(i32::MAX),
            col: run_end(at.col, w).unwrap_or(i32::MAX),
        },
    }
}

/// Inclusive bounding-box intersection test.
pub fn overlaps(a: &Region, b: &Region) -> bool {
    !a.is_empty()
        && !b.is_empty()
        && a.se.col >= b.nw.col
        && a.se.row >= b.nw.row
        && a.nw.col <= b.se.col
        && a.nw.row <= b.se.row
}

/// Change-detection equality: two absent values are equal.
pub fn regions_equal(a: Option<&Region>, b: Option<&Region>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => tile_coords_equal(Some(&a.nw), Some(&b.nw)) && tile_coords_equal(Some(&a.se), Some(&b.se)),
        _ => false,
    }
}

pub fn tile_coords_equal(a: Option<&TileCoords>, b: Option<&TileCoords>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.row == b.row && a.col == b.col,
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use test_log::test;

    use super::*;

    #[test]
    fn compute_region_swaps_for_vertical() {
        let dims = Dimensions::new(3, 2);
        let at = TileCoords::new(1, 1);
        assert_eq!(
            compute_region(dims, at, Orientation::Horizontal),
            Region::new((1, 1), (2, 3))
        );
        assert_eq!(
            compute_region(dims, at, Orientation::Vertical),
            Region::new((1, 1), (3, 2))
        );
    }

    #[test]
    fn regions_near_the_coordinate_limits() {
        let dims = Dimensions::new(3, 2);
        let at = TileCoords::new(i32::MAX - 1, 0);
        assert_eq!(
            checked_compute_region(dims, at, Orientation::Horizontal),
            Some(Region::new((i32::MAX - 1, 0), (i32::MAX, 2)))
        );
        assert_eq!(checked_compute_region(dims, at, Orientation::Vertical), None);
        assert_eq!(
            compute_region(dims, at, Orientation::Vertical),
            Region::new((i32::MAX - 1, 0), (i32::MAX, 1))
        );
        assert_eq!(
            checked_compute_region(dims, TileCoords::new(i32::MIN, i32::MIN), Orientation::Vertical),
            Some(Region::new((i32::MIN, i32::MIN), (i32::MIN + 2, i32::MIN + 1)))
        );

        let everything = Region::new((i32::MIN, i32::MIN), (i32::MAX, i32::MAX));
        assert_eq!(everything.width(), u32::MAX);
        assert_eq!(everything.height(), u32::MAX);
        let half = Region::new((0, i32::MIN), (0, -1));
        assert_eq!(half.width(), 1 << 31);
        assert_eq!(half.height(), 1);
    }

    #[test]
    fn region_normalizes_corners() {
        let region = Region::new((4, -2), (1, 3));
        assert_eq!(region.nw(), TileCoords::new(1, -2));
        assert_eq!(region.se(), TileCoords::new(4, 3));
        assert_eq!(region.width(), 6);
        assert_eq!(region.height(), 4);
    }

    #[test]
    fn overlap_is_inclusive() {
        let a = Region::new((0, 0), (2, 2));
        assert!(overlaps(&a, &Region::new((2, 2), (3, 3))));
        assert!(!overlaps(&a, &Region::new((3, 0), (4, 2))));
        assert!(!overlaps(&a, &Region::new((0, 3), (0, 3))));
        assert!(overlaps(&a, &Region::new((-5, -5), (5, 5))));
        assert!(!overlaps(&a, &Region::EMPTY));
        assert!(!overlaps(&Region::EMPTY, &Region::EMPTY));
    }

    #[test]
    fn empty_region() {
        assert!(Region::EMPTY.is_empty());
        assert_eq!(Region::EMPTY.width(), 0);
        assert!(!Region::EMPTY.contains(TileCoords::ORIGIN));
        assert_eq!(Region::EMPTY.tiles().count(), 0);
        assert!(!Region::single(TileCoords::ORIGIN).is_empty());
    }

    #[test]
    fn bounding_fold() {
        let regions = [
            Region::new((0, 4), (1, 5)),
            Region::new((-3, 2), (-3, 2)),
            Region::new((2, 0), (7, 1)),
        ];
        assert_eq!(Region::bounding(&regions), Region::new((-3, 0), (7, 5)));
        assert_eq!(Region::bounding(Vec::<Region>::new().iter()), Region::EMPTY);
    }

    #[test]
    fn optional_equality() {
        let a = Region::new((0, 0), (1, 1));
        assert!(regions_equal(None, None));
        assert!(!regions_equal(Some(&a), None));
        assert!(!regions_equal(None, Some(&a)));
        assert!(regions_equal(Some(&a), Some(&Region::new((1, 1), (0, 0)))));
        assert!(tile_coords_equal(None, None));
        assert!(!tile_coords_equal(Some(&TileCoords::ORIGIN), None));
    }

    #[test]
    fn tiles_are_row_major() {
        let tiles: Vec<_> = Region::new((0, 0), (1, 1)).tiles().collect();
        assert_eq!(
            tiles,
            vec![
                TileCoords::new(0, 0),
                TileCoords::new(0, 1),
                TileCoords::new(1, 0),
                TileCoords::new(1, 1),
            ]
        );
    }
}
