//! Versioned text encoding of layouts.
//!
//! A code is one version symbol followed by type chunks. Each chunk is a
//! 2-symbol header packing `(count - 1) << 8 | type_code`, then `count` (1 to
//! 8) placement words of 3 symbols packing `horizontal << 16 | col << 8 | row`.
//! All fields are base 62, see [`base62`].

pub mod base62;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::building::{Building, BuildingId, Placement};
use crate::catalog::TypeCatalog;
use crate::footprint::Footprint;
use crate::geometry::{Orientation, Region, TileCoords};

const TYPE_ID_BITS: u32 = 8;
const COORD_BITS: u32 = 8;
const CHUNK_CAPACITY: usize = 8;
const HEADER_WIDTH: usize = 2;
const WORD_WIDTH: usize = 3;
const MAX_COORD: i32 = (1 << COORD_BITS) - 1;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FormatErrorKind {
    #[error("the code is empty, a version symbol is required")]
    MissingVersion,
    #[error("invalid symbol {symbol:?} at position {position}")]
    InvalidSymbol { position: usize, symbol: char },
    #[error("chunk at position {position} needs {needed} more symbols, only {remaining} left")]
    TruncatedChunk {
        position: usize,
        needed: usize,
        remaining: usize,
    },
    #[error("value {value} at position {position} is out of range for its field")]
    ValueOutOfRange { position: usize, value: u32 },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("layout code is version {found}, this codec reads version {expected}")]
    FormatVersionMismatch { expected: u8, found: u32 },
    #[error("malformed layout code: {0}")]
    Format(#[from] FormatErrorKind),
    #[error("building type {0} is not in the catalog")]
    UnknownBuildingType(u8),
    #[error("coordinate {at} cannot be encoded, rows and columns must be within 0..=255")]
    CoordinateOutOfRange { at: TileCoords },
    #[error("building {0} has a masked footprint, which layout codes cannot describe")]
    UnencodableFootprint(BuildingId),
}

/// One decoded placement word, before the type code is resolved.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct RawPlacement {
    pub type_code: u8,
    pub at: TileCoords,
    pub orientation: Orientation,
}

impl RawPlacement {
    pub fn new(type_code: u8, at: TileCoords, orientation: Orientation) -> Self {
        RawPlacement {
            type_code,
            at,
            orientation,
        }
    }
}

/// Cursor over the symbols of a layout code.
#[derive(Debug)]
pub struct CodeReader {
    symbols: Vec<char>,
    position: usize,
}

impl CodeReader {
    pub fn new(code: &str) -> Self {
        CodeReader {
            symbols: code.chars().collect(),
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.symbols.len() - self.position
    }

    pub fn is_done(&self) -> bool {
        self.remaining() == 0
    }

    /// Fails without consuming anything if fewer than `count` symbols are
    /// left.
    pub fn require(&self, count: usize) -> Result<(), FormatErrorKind> {
        if self.remaining() < count {
            return Err(FormatErrorKind::TruncatedChunk {
                position: self.position,
                needed: count,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    /// Reads one fixed-width field.
    pub fn take(&mut self, width: usize) -> Result<u32, FormatErrorKind> {
        self.require(width)?;
        let mut value = 0u32;
        for _ in 0..width {
            let symbol = self.symbols[self.position];
            let digit = base62::digit(symbol).ok_or(FormatErrorKind::InvalidSymbol {
                position: self.position,
                symbol,
            })?;
            value = value * 62 + digit;
            self.position += 1;
        }
        Ok(value)
    }
}

/// A layout code format. Implementors provide the body; the version symbol in
/// front of it is handled here.
pub trait LayoutCodec {
    /// Written as the first symbol, so it must be below 62.
    fn version(&self) -> u8;

    fn write_body(&self, placements: &[RawPlacement], out: &mut String) -> Result<(), CodecError>;

    fn read_body(&self, reader: &mut CodeReader) -> Result<Vec<RawPlacement>, CodecError>;

    /// Encodes placements at their literal coordinates.
    fn encode_raw(&self, placements: &[RawPlacement]) -> Result<String, CodecError> {
        let version = u32::from(self.version());
        let mut out = base62::encode(version, 1).ok_or(FormatErrorKind::ValueOutOfRange {
            position: 0,
            value: version,
        })?;
        self.write_body(placements, &mut out)?;
        Ok(out)
    }

    /// Encodes buildings translated so their common bounding box starts at
    /// the origin.
    fn encode(&self, buildings: &[&Building]) -> Result<String, CodecError> {
        let regions: Vec<Region> = buildings.iter().map(|building| building.region()).collect();
        let origin = Region::bounding(&regions).nw();
        let placements = buildings
            .iter()
            .map(|building| {
                if let Footprint::Mask(_) = building.footprint() {
                    return Err(CodecError::UnencodableFootprint(building.id()));
                }
                let at = building.at();
                let at = match (at.row.checked_sub(origin.row), at.col.checked_sub(origin.col)) {
                    (Some(row), Some(col)) => TileCoords::new(row, col),
                    _ => return Err(CodecError::CoordinateOutOfRange { at }),
                };
                Ok(RawPlacement::new(building.type_code(), at, building.orientation()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.encode_raw(&placements)
    }

    /// Decodes the placement words without consulting a catalog.
    fn decode_raw(&self, code: &str) -> Result<Vec<RawPlacement>, CodecError> {
        let mut reader = CodeReader::new(code);
        if reader.is_done() {
            return Err(FormatErrorKind::MissingVersion.into());
        }
        let found = reader.take(1)?;
        if found != u32::from(self.version()) {
            return Err(CodecError::FormatVersionMismatch {
                expected: self.version(),
                found,
            });
        }
        self.read_body(&mut reader)
    }

    /// Decodes a code into placements, resolving every type code. Fails on the
    /// first code missing from `catalog`.
    fn decode(&self, code: &str, catalog: &TypeCatalog) -> Result<Vec<Placement>, CodecError> {
        self.decode_raw(code)?
            .into_iter()
            .map(|raw| {
                let building_type = catalog
                    .by_code(raw.type_code)
                    .ok_or(CodecError::UnknownBuildingType(raw.type_code))?;
                Ok(Placement::new(building_type.clone(), raw.at, raw.orientation))
            })
            .collect()
    }
}

/// Version 0, the only published format.
#[derive(Clone, Copy, Debug, Default)]
pub struct CodecV0;

impl CodecV0 {
    fn push_field(out: &mut String, value: u32, width: usize) -> Result<(), CodecError> {
        let symbols = base62::encode(value, width).ok_or(FormatErrorKind::ValueOutOfRange {
            position: out.len(),
            value,
        })?;
        out.push_str(&symbols);
        Ok(())
    }

    fn word(placement: &RawPlacement) -> Result<u32, CodecError> {
        let TileCoords { row, col } = placement.at;
        if !(0..=MAX_COORD).contains(&row) || !(0..=MAX_COORD).contains(&col) {
            return Err(CodecError::CoordinateOutOfRange { at: placement.at });
        }
        let horizontal = u32::from(placement.orientation == Orientation::Horizontal);
        Ok(horizontal << (COORD_BITS * 2) | (col as u32) << COORD_BITS | row as u32)
    }
}

impl LayoutCodec for CodecV0 {
    fn version(&self) -> u8 {
        0
    }

    fn write_body(&self, placements: &[RawPlacement], out: &mut String) -> Result<(), CodecError> {
        let mut by_type: BTreeMap<u8, Vec<&RawPlacement>> = BTreeMap::new();
        for placement in placements {
            by_type.entry(placement.type_code).or_default().push(placement);
        }
        for (type_code, group) in by_type {
            for chunk in group.chunks(CHUNK_CAPACITY) {
                let header = ((chunk.len() as u32 - 1) << TYPE_ID_BITS) | u32::from(type_code);
                Self::push_field(out, header, HEADER_WIDTH)?;
                for placement in chunk {
                    Self::push_field(out, Self::word(placement)?, WORD_WIDTH)?;
                }
            }
        }
        Ok(())
    }

    fn read_body(&self, reader: &mut CodeReader) -> Result<Vec<RawPlacement>, CodecError> {
        let mut placements = Vec::new();
        while !reader.is_done() {
            let position = reader.position();
            let header = reader.take(HEADER_WIDTH)?;
            let count = (header >> TYPE_ID_BITS) as usize + 1;
            if count > CHUNK_CAPACITY {
                return Err(FormatErrorKind::ValueOutOfRange {
                    position,
                    value: header,
                }
                .into());
            }
            let type_code = (header & 0xff) as u8;
            reader.require(count * WORD_WIDTH)?;
            for _ in 0..count {
                let position = reader.position();
                let word = reader.take(WORD_WIDTH)?;
                let orientation = match word >> (COORD_BITS * 2) {
                    0 => Orientation::Vertical,
                    1 => Orientation::Horizontal,
                    _ => {
                        return Err(FormatErrorKind::ValueOutOfRange {
                            position,
                            value: word,
                        }
                        .into())
                    },
                };
                let col = (word >> COORD_BITS & 0xff) as i32;
                let row = (word & 0xff) as i32;
                placements.push(RawPlacement::new(
                    type_code,
                    TileCoords::new(row, col),
                    orientation,
                ));
            }
        }
        log::trace!("Decoded {} placements", placements.len());
        Ok(placements)
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;
    use std::sync::Arc;

    use test_log::test;

    use super::*;
    use crate::catalog::BuildingType;
    use crate::grid::Grid;
    use crate::templates::TEMPLATES;

    fn h(type_code: u8, row: i32, col: i32) -> RawPlacement {
        RawPlacement::new(type_code, TileCoords::new(row, col), Orientation::Horizontal)
    }

    fn v(type_code: u8, row: i32, col: i32) -> RawPlacement {
        RawPlacement::new(type_code, TileCoords::new(row, col), Orientation::Vertical)
    }

    fn building(id: u64, code: u8, at: TileCoords, orientation: Orientation) -> Building {
        let building_type = Arc::new(BuildingType::new(format!("t{}", code), code, "T", 3, 2));
        Placement::new(building_type, at, orientation).into_building(BuildingId(id))
    }

    #[test]
    fn single_farm() {
        let code = CodecV0.encode_raw(&[h(5, 0, 0)]).unwrap();
        // version, header (count 1, type 5), word (flag 1 << 16)
        assert_eq!(code, "005H32");
        assert_eq!(CodecV0.decode_raw(&code).unwrap(), vec![h(5, 0, 0)]);

        let catalog = TypeCatalog::sample().unwrap();
        let decoded = CodecV0.decode(&code, &catalog).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].building_type().code(), 5);
        assert_eq!(decoded[0].at(), TileCoords::ORIGIN);
        assert_eq!(decoded[0].orientation(), Orientation::Horizontal);
    }

    #[test]
    fn empty_layout() {
        assert_eq!(CodecV0.encode_raw(&[]).unwrap(), "0");
        assert_eq!(CodecV0.decode_raw("0").unwrap(), vec![]);
        assert_eq!(CodecV0.encode(&[]).unwrap(), "0");
    }

    #[test]
    fn groups_by_ascending_type() {
        let input = [h(91, 3, 4), v(32, 0, 0), h(91, 255, 255), v(0, 10, 2)];
        let decoded = CodecV0.decode_raw(&CodecV0.encode_raw(&input).unwrap()).unwrap();
        assert_eq!(
            decoded,
            vec![v(0, 10, 2), v(32, 0, 0), h(91, 3, 4), h(91, 255, 255)]
        );
    }

    #[test]
    fn splits_chunks_of_eight() {
        let input: Vec<_> = (0..19).map(|i| h(47, i, 2 * i)).collect();
        let code = CodecV0.encode_raw(&input).unwrap();
        // three headers, nineteen words
        assert_eq!(code.len(), 1 + 3 * 2 + 19 * 3);
        assert_eq!(&code[1..3], &base62::encode(7 << 8 | 47, 2).unwrap());
        assert_eq!(&code[53..55], &base62::encode(2 << 8 | 47, 2).unwrap());
        assert_eq!(CodecV0.decode_raw(&code).unwrap(), input);
    }

    const SWEEP_TYPES: [u8; 5] = [0, 1, 47, 128, 255];
    const CORNERS: [(i32, i32); 4] = [(0, 0), (0, 255), (255, 0), (255, 255)];

    fn orientation(i: usize) -> Orientation {
        if i % 2 == 0 {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }

    /// Distinct tiles in the encodable range, the four corners first.
    fn distinct_tiles() -> impl Iterator<Item = TileCoords> {
        let mut seen = HashSet::new();
        CORNERS
            .into_iter()
            .chain((0..256).map(|g| ((7 * g) % 256, (13 * g) % 256)))
            .filter(move |tile| seen.insert(*tile))
            .map(|(row, col)| TileCoords::new(row, col))
    }

    #[test]
    fn every_corner_round_trips() {
        for type_code in SWEEP_TYPES {
            for (row, col) in CORNERS {
                for placement in [h(type_code, row, col), v(type_code, row, col)] {
                    let code = CodecV0.encode_raw(&[placement]).unwrap();
                    assert_eq!(code.len(), 1 + HEADER_WIDTH + WORD_WIDTH);
                    assert_eq!(CodecV0.decode_raw(&code).unwrap(), vec![placement]);
                }
            }
        }
        assert_eq!(CodecV0.encode_raw(&[h(255, 255, 255)]).unwrap(), "047Y63");
    }

    #[test]
    fn chunk_boundaries_round_trip() {
        for size in 1..=17 {
            for type_code in SWEEP_TYPES {
                let input: Vec<_> = distinct_tiles()
                    .take(size)
                    .enumerate()
                    .map(|(i, at)| RawPlacement::new(type_code, at, orientation(i)))
                    .collect();
                let code = CodecV0.encode_raw(&input).unwrap();
                let chunks = (size + CHUNK_CAPACITY - 1) / CHUNK_CAPACITY;
                assert_eq!(code.len(), 1 + chunks * HEADER_WIDTH + size * WORD_WIDTH);
                assert_eq!(CodecV0.decode_raw(&code).unwrap(), input, "{} of type {}", size, type_code);
            }
        }
    }

    #[test]
    fn mixed_layout_survives_import_and_export() {
        let mut catalog = TypeCatalog::new();
        for type_code in SWEEP_TYPES {
            catalog
                .insert(BuildingType::new(format!("t{}", type_code), type_code, "T", 1, 1))
                .unwrap();
        }
        // interleaved, so the encoder has to regroup by type
        let mut tiles = distinct_tiles();
        let mut input = Vec::new();
        for i in 0..51 {
            for type_code in SWEEP_TYPES {
                let at = tiles.next().unwrap();
                input.push(RawPlacement::new(type_code, at, orientation(i + type_code as usize)));
            }
        }
        let mut canonical = input.clone();
        canonical.sort_by_key(|placement| placement.type_code);

        let code = CodecV0.encode_raw(&input).unwrap();
        assert_eq!(CodecV0.decode_raw(&code).unwrap(), canonical);
        assert_eq!(CodecV0.encode_raw(&canonical).unwrap(), code);

        let mut grid = Grid::new();
        assert_eq!(grid.import(&code, &catalog).map(|ids| ids.len()).ok(), Some(255));
        assert_eq!(grid.bounds(), Region::new((0, 0), (255, 255)));
        assert_eq!(grid.export().unwrap(), code);
    }

    #[test]
    fn oversized_field_is_an_error() {
        let mut out = String::from("0");
        assert_eq!(
            CodecV0::push_field(&mut out, 3844, HEADER_WIDTH),
            Err(CodecError::Format(FormatErrorKind::ValueOutOfRange {
                position: 1,
                value: 3844
            }))
        );
        assert_eq!(out, "0");
        CodecV0::push_field(&mut out, 2047, HEADER_WIDTH).unwrap();
        assert_eq!(out, "0X1");
    }

    #[test]
    fn encode_normalizes_to_bounds() {
        let buildings = [
            building(0, 5, TileCoords::new(-4, 10), Orientation::Horizontal),
            building(1, 5, TileCoords::new(2, 7), Orientation::Vertical),
        ];
        let refs: Vec<&Building> = buildings.iter().collect();
        let code = CodecV0.encode(&refs).unwrap();
        assert_eq!(
            CodecV0.decode_raw(&code).unwrap(),
            vec![h(5, 0, 3), v(5, 6, 0)]
        );
    }

    #[test]
    fn rejects_unencodable_input() {
        assert_eq!(
            CodecV0.encode_raw(&[h(1, 256, 0)]),
            Err(CodecError::CoordinateOutOfRange {
                at: TileCoords::new(256, 0)
            })
        );
        assert!(matches!(
            CodecV0.encode_raw(&[h(1, -1, 0)]),
            Err(CodecError::CoordinateOutOfRange { .. })
        ));
        let wide = [
            building(0, 5, TileCoords::new(0, 0), Orientation::Horizontal),
            building(1, 5, TileCoords::new(0, 300), Orientation::Horizontal),
        ];
        assert!(matches!(
            CodecV0.encode(&[&wide[0], &wide[1]]),
            Err(CodecError::CoordinateOutOfRange { .. })
        ));

        let mut masked = building(4, 5, TileCoords::ORIGIN, Orientation::Horizontal);
        masked.set_footprint(Footprint::Mask(
            crate::footprint::FootprintMask::from_rows(&["#.", "##"]).unwrap(),
        ));
        assert_eq!(
            CodecV0.encode(&[&masked]),
            Err(CodecError::UnencodableFootprint(BuildingId(4)))
        );
    }

    #[test]
    fn version_mismatch() {
        assert_eq!(
            CodecV0.decode_raw("105H32"),
            Err(CodecError::FormatVersionMismatch {
                expected: 0,
                found: 1
            })
        );
        assert_eq!(
            CodecV0.decode_raw(""),
            Err(CodecError::Format(FormatErrorKind::MissingVersion))
        );
    }

    #[test]
    fn malformed_codes() {
        assert_eq!(
            CodecV0.decode_raw("005H3"),
            Err(CodecError::Format(FormatErrorKind::TruncatedChunk {
                position: 3,
                needed: 3,
                remaining: 2
            }))
        );
        assert!(matches!(
            CodecV0.decode_raw("00"),
            Err(CodecError::Format(FormatErrorKind::TruncatedChunk { .. }))
        ));
        assert_eq!(
            CodecV0.decode_raw("005H-2"),
            Err(CodecError::Format(FormatErrorKind::InvalidSymbol {
                position: 4,
                symbol: '-'
            }))
        );
        // count of 9 in the header
        assert!(matches!(
            CodecV0.decode_raw(&format!("0{}", base62::encode(8 << 8 | 5, 2).unwrap())),
            Err(CodecError::Format(FormatErrorKind::ValueOutOfRange { position: 1, .. }))
        ));
        // orientation flag of 2
        assert!(matches!(
            CodecV0.decode_raw(&format!("005{}", base62::encode(2 << 16, 3).unwrap())),
            Err(CodecError::Format(FormatErrorKind::ValueOutOfRange { position: 3, .. }))
        ));
    }

    #[test]
    fn unknown_type() {
        let catalog = TypeCatalog::sample().unwrap();
        let code = CodecV0.encode_raw(&[h(5, 0, 0), h(200, 1, 1)]).unwrap();
        assert_eq!(
            CodecV0.decode(&code, &catalog).map(|placements| placements.len()),
            Err(CodecError::UnknownBuildingType(200))
        );
    }

    #[test]
    fn templates_decode() {
        let counts: Vec<_> = TEMPLATES
            .iter()
            .map(|code| CodecV0.decode_raw(code).map(|placements| placements.len()))
            .collect();
        assert_eq!(counts, vec![Ok(16), Ok(20), Ok(30)]);
        for code in TEMPLATES {
            let raw = CodecV0.decode_raw(code).unwrap();
            assert_eq!(CodecV0.encode_raw(&raw).unwrap(), code);
        }
    }
}
