use bitvec::vec::BitVec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{checked_compute_region, compute_region, Dimensions, Orientation, Region, TileCoords};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MaskError {
    #[error("a footprint mask needs at least one row and one column")]
    Empty,
    #[error("row {row} of the footprint mask has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("footprint mask of {rows}x{cols} is larger than a shape string can describe")]
    TooLarge { rows: usize, cols: usize },
    #[error("shape string could not be decoded: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("shape string is too short for the dimensions it declares")]
    Truncated,
}

/// Which tiles of a building's bounding region are actually occupied.
///
/// Stored row-major, one bit per tile. Never changes after construction: a
/// building that changes shape gets a new mask.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FootprintMask {
    rows: usize,
    cols: usize,
    bits: BitVec<u8>,
}

impl FootprintMask {
    pub fn new(grid: Vec<Vec<bool>>) -> Result<Self, MaskError> {
        let rows = grid.len();
        let cols = grid.first().map(Vec::len).unwrap_or(0);
        if rows == 0 || cols == 0 {
            return Err(MaskError::Empty);
        }
        if rows > u16::MAX as usize || cols > u16::MAX as usize {
            return Err(MaskError::TooLarge { rows, cols });
        }
        if let Some((row, found)) = grid
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|(_, len)| *len != cols)
        {
            return Err(MaskError::Ragged {
                row,
                expected: cols,
                found,
            });
        }
        let bits = grid.into_iter().flatten().collect();
        Ok(FootprintMask { rows, cols, bits })
    }

    /// A mask with every tile occupied.
    pub fn filled(rows: usize, cols: usize) -> Result<Self, MaskError> {
        Self::new(vec![vec![true; cols]; rows])
    }

    /// Parses rows of `#` (occupied) and any other character (free), e.g.
    /// `["##.", ".##"]`.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, MaskError> {
        Self::new(
            rows.iter()
                .map(|row| row.as_ref().chars().map(|ch| ch == '#').collect())
                .collect(),
        )
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Out of bounds cells count as unoccupied.
    pub fn get(&self, row: isize, col: isize) -> bool {
        if row < 0 || col < 0 || row as usize >= self.rows || col as usize >= self.cols {
            return false;
        }
        self.bits[row as usize * self.cols + col as usize]
    }

    /// Cell lookup as seen once the mask is laid out with `orientation`.
    /// Vertical orientation transposes the mask.
    pub fn get_oriented(&self, orientation: Orientation, row: isize, col: isize) -> bool {
        match orientation {
            Orientation::Horizontal => self.get(row, col),
            Orientation::Vertical => self.get(col, row),
        }
    }

    pub fn occupied_count(&self) -> usize {
        self.bits.count_ones()
    }

    /// `(row, col)` of every occupied cell, row-major.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let cols = self.cols;
        self.bits.iter_ones().map(move |i| (i / cols, i % cols))
    }

    pub fn transposed(&self) -> FootprintMask {
        let bits = (0..self.cols)
            .flat_map(|col| (0..self.rows).map(move |row| (row, col)))
            .map(|(row, col)| self.bits[row * self.cols + col])
            .collect();
        FootprintMask {
            rows: self.cols,
            cols: self.rows,
            bits,
        }
    }

    /// Cols and rows as little-endian u16s, followed by the cells row-major.
    pub fn shape_bitvec(&self) -> BitVec<u8> {
        let cols: [u8; 2] = (self.cols as u16).to_le_bytes();
        let rows: [u8; 2] = (self.rows as u16).to_le_bytes();
        let mut bitvec = BitVec::<u8>::new();
        bitvec.extend_from_raw_slice(&cols[..]);
        bitvec.extend_from_raw_slice(&rows[..]);
        bitvec.extend(self.bits.iter().by_vals());
        bitvec
    }

    pub fn shape_string_base64(&self) -> String {
        base64::encode(self.shape_bitvec().into_vec())
    }

    pub fn from_shape_string(shape: &str) -> Result<Self, MaskError> {
        let bytes: Vec<u8> = base64::decode(shape)?;
        if bytes.len() < 4 {
            return Err(MaskError::Truncated);
        }
        let cols = u16::from_le_bytes([bytes[0], bytes[1]]) as usize;
        let rows = u16::from_le_bytes([bytes[2], bytes[3]]) as usize;
        if rows == 0 || cols == 0 {
            return Err(MaskError::Empty);
        }
        let mut bits = BitVec::<u8>::from_vec(bytes[4..].to_vec());
        if bits.len() < rows * cols {
            return Err(MaskError::Truncated);
        }
        bits.truncate(rows * cols);
        Ok(FootprintMask { rows, cols, bits })
    }
}

impl Serialize for FootprintMask {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.shape_string_base64())
    }
}

impl<'de> Deserialize<'de> for FootprintMask {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let shape = String::deserialize(deserializer)?;
        FootprintMask::from_shape_string(&shape).map_err(serde::de::Error::custom)
    }
}

/// The shape a building occupies relative to its anchor tile.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Footprint {
    /// Every tile of the `w` by `h` rectangle.
    Rect(Dimensions),
    /// Only the occupied cells of the mask.
    Mask(FootprintMask),
}

impl Footprint {
    /// Declared (un-oriented) width and height.
    pub fn dimensions(&self) -> Dimensions {
        match self {
            Footprint::Rect(dimensions) => *dimensions,
            Footprint::Mask(mask) => Dimensions::new(mask.cols() as u32, mask.rows() as u32),
        }
    }

    /// Width and height once laid out with `orientation`.
    pub fn oriented(&self, orientation: Orientation) -> Dimensions {
        self.dimensions().oriented(orientation)
    }

    pub fn is_shaped(&self) -> bool {
        matches!(self, Footprint::Mask(_))
    }

    /// Bounding region when anchored at `at`.
    pub fn region(&self, at: TileCoords, orientation: Orientation) -> Region {
        compute_region(self.dimensions(), at, orientation)
    }

    /// Like [`Footprint::region`], but `None` if the region would reach past
    /// the largest tile coordinate.
    pub fn checked_region(&self, at: TileCoords, orientation: Orientation) -> Option<Region> {
        checked_compute_region(self.dimensions(), at, orientation)
    }

    /// The occupied tiles as a list of disjoint regions: the whole bounding
    /// region for rectangles, horizontal runs of occupied cells for masks.
    pub fn covers(&self, at: TileCoords, orientation: Orientation) -> Vec<Region> {
        match self {
            Footprint::Rect(dimensions) => vec![compute_region(*dimensions, at, orientation)],
            Footprint::Mask(mask) => {
                let Dimensions { w, h } = self.oriented(orientation);
                let mut runs = Vec::new();
                for row in 0..h as isize {
                    let mut run_start: Option<isize> = None;
                    for col in 0..=w as isize {
                        let occupied = mask.get_oriented(orientation, row, col);
                        match (occupied, run_start) {
                            (true, None) => run_start = Some(col),
                            (false, Some(start)) => {
                                runs.push(Region::new(
                                    at.offset(row as i32, start as i32),
                                    at.offset(row as i32, col as i32 - 1),
                                ));
                                run_start = None;
                            },
                            _ => {},
                        }
                    }
                }
                runs
            },
        }
    }

    pub fn occupies(&self, at: TileCoords, orientation: Orientation, tile: TileCoords) -> bool {
        if !self.region(at, orientation).contains(tile) {
            return false;
        }
        match self {
            Footprint::Rect(_) => true,
            Footprint::Mask(mask) => mask.get_oriented(
                orientation,
                (tile.row - at.row) as isize,
                (tile.col - at.col) as isize,
            ),
        }
    }

    /// Number of tiles occupied.
    pub fn area(&self) -> usize {
        match self {
            Footprint::Rect(Dimensions { w, h }) => (*w as usize) * (*h as usize),
            Footprint::Mask(mask) => mask.occupied_count(),
        }
    }
}

#[cfg(test)]
mod test {
    use test_log::test;

    use super::*;

    fn l_shape() -> FootprintMask {
        FootprintMask::from_rows(&["#..", "###"]).expect("valid mask")
    }

    #[test]
    fn rejects_bad_masks() {
        assert_eq!(FootprintMask::new(vec![]), Err(MaskError::Empty));
        assert_eq!(FootprintMask::new(vec![vec![]]), Err(MaskError::Empty));
        assert_eq!(
            FootprintMask::new(vec![vec![true, true], vec![true]]),
            Err(MaskError::Ragged {
                row: 1,
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn get_and_out_of_bounds() {
        let mask = l_shape();
        assert_eq!((mask.rows(), mask.cols()), (2, 3));
        assert!(mask.get(0, 0));
        assert!(!mask.get(0, 1));
        assert!(mask.get(1, 2));
        assert!(!mask.get(-1, 0));
        assert!(!mask.get(0, 3));
        assert_eq!(mask.occupied_count(), 4);
        assert_eq!(
            mask.occupied().collect::<Vec<_>>(),
            vec![(0, 0), (1, 0), (1, 1), (1, 2)]
        );
    }

    #[test]
    fn transpose() {
        let transposed = l_shape().transposed();
        assert_eq!(
            transposed,
            FootprintMask::from_rows(&["##", ".#", ".#"]).unwrap()
        );
        assert_eq!(transposed.transposed(), l_shape());
    }

    #[test]
    fn shape_string_round_trip() {
        let mask = FootprintMask::from_rows(&["#.#.#", ".###.", "#.#.#"]).unwrap();
        let shape = mask.shape_string_base64();
        assert_eq!(FootprintMask::from_shape_string(&shape), Ok(mask));
    }

    #[test]
    fn shape_string_errors() {
        assert!(matches!(
            FootprintMask::from_shape_string("not base64!"),
            Err(MaskError::Base64(_))
        ));
        // 4x4 declared, but only one byte of cells
        let short = base64::encode([4u8, 0, 4, 0, 0xff]);
        assert_eq!(
            FootprintMask::from_shape_string(&short),
            Err(MaskError::Truncated)
        );
    }

    #[test]
    fn mask_covers_row_runs() {
        let footprint = Footprint::Mask(l_shape());
        let at = TileCoords::new(10, 20);
        assert_eq!(
            footprint.covers(at, Orientation::Horizontal),
            vec![
                Region::new((10, 20), (10, 20)),
                Region::new((11, 20), (11, 22)),
            ]
        );
        assert_eq!(
            footprint.covers(at, Orientation::Vertical),
            vec![
                Region::new((10, 20), (10, 21)),
                Region::new((11, 21), (11, 21)),
                Region::new((12, 21), (12, 21)),
            ]
        );
    }

    #[test]
    fn occupies_respects_mask() {
        let footprint = Footprint::Mask(l_shape());
        let at = TileCoords::new(0, 0);
        assert!(footprint.occupies(at, Orientation::Horizontal, TileCoords::new(0, 0)));
        assert!(!footprint.occupies(at, Orientation::Horizontal, TileCoords::new(0, 2)));
        assert!(footprint.occupies(at, Orientation::Vertical, TileCoords::new(0, 1)));
        assert!(!footprint.occupies(at, Orientation::Vertical, TileCoords::new(1, 0)));

        let rect = Footprint::Rect(Dimensions::new(3, 2));
        assert!(rect.occupies(at, Orientation::Vertical, TileCoords::new(2, 1)));
        assert!(!rect.occupies(at, Orientation::Vertical, TileCoords::new(1, 2)));
        assert_eq!(rect.area(), 6);
        assert_eq!(rect.oriented(Orientation::Vertical), Dimensions::new(2, 3));
        assert_eq!(footprint.oriented(Orientation::Vertical), Dimensions::new(2, 3));
        assert_eq!(footprint.area(), 4);
    }
}
