use std::fmt;
use std::sync::Arc;

use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};

use crate::catalog::BuildingType;
use crate::footprint::{Footprint, FootprintMask};
use crate::geometry::{Orientation, Region, TileCoords};

/// Stable identity of a placed building. Never reused by the allocator that
/// produced it.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct BuildingId(pub u64);

impl fmt::Display for BuildingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out increasing [`BuildingId`]s.
#[derive(Clone, Debug, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator::default()
    }

    /// Allocator whose first id is `first`.
    pub fn starting_at(first: u64) -> Self {
        IdAllocator { next: first }
    }

    pub fn allocate(&mut self) -> BuildingId {
        let id = BuildingId(self.next);
        self.next += 1;
        id
    }

    /// The id the next call to [`IdAllocator::allocate`] returns.
    pub fn peek(&self) -> BuildingId {
        BuildingId(self.next)
    }
}

#[derive(Clone, CopyGetters, Debug, Getters)]
pub struct Building {
    #[getset(get_copy = "pub")]
    id: BuildingId,
    #[getset(get = "pub")]
    building_type: Arc<BuildingType>,
    #[getset(get_copy = "pub")]
    at: TileCoords,
    #[getset(get_copy = "pub")]
    orientation: Orientation,
    #[getset(get = "pub")]
    footprint: Footprint,
    /// Bounding region, always derived from `footprint`, `at` and
    /// `orientation`.
    #[getset(get_copy = "pub")]
    region: Region,
    #[getset(get_copy = "pub")]
    parent: Option<BuildingId>,
    #[getset(get = "pub")]
    children: Vec<BuildingId>,
    /// Type codes this building may overlap, also applied when it moves.
    #[getset(get = "pub")]
    exempt: Vec<u8>,
}

impl Building {
    pub(crate) fn new(
        id: BuildingId,
        building_type: Arc<BuildingType>,
        footprint: Footprint,
        at: TileCoords,
        orientation: Orientation,
        parent: Option<BuildingId>,
        exempt: Vec<u8>,
    ) -> Self {
        let region = footprint.region(at, orientation);
        Building {
            id,
            building_type,
            at,
            orientation,
            footprint,
            region,
            parent,
            children: Vec::new(),
            exempt,
        }
    }

    pub fn type_code(&self) -> u8 {
        self.building_type.code()
    }

    /// The occupied tiles as disjoint regions.
    pub fn covers(&self) -> Vec<Region> {
        self.footprint.covers(self.at, self.orientation)
    }

    pub fn occupies(&self, tile: TileCoords) -> bool {
        self.footprint.occupies(self.at, self.orientation, tile)
    }

    pub(crate) fn set_placement(&mut self, at: TileCoords, orientation: Orientation) {
        self.at = at;
        self.orientation = orientation;
        self.region = self.footprint.region(at, orientation);
    }

    pub(crate) fn set_footprint(&mut self, footprint: Footprint) {
        self.footprint = footprint;
        self.region = self.footprint.region(self.at, self.orientation);
    }

    pub(crate) fn add_child(&mut self, child: BuildingId) {
        self.children.push(child);
    }

    pub(crate) fn remove_child(&mut self, child: BuildingId) {
        self.children.retain(|id| *id != child);
    }
}

/// A request to put a building on a grid.
#[derive(Clone, CopyGetters, Debug, Getters)]
pub struct Placement {
    #[getset(get = "pub")]
    building_type: Arc<BuildingType>,
    #[getset(get_copy = "pub")]
    at: TileCoords,
    #[getset(get_copy = "pub")]
    orientation: Orientation,
    #[getset(get = "pub")]
    footprint: Footprint,
    #[getset(get_copy = "pub")]
    parent: Option<BuildingId>,
    /// Type codes this building may overlap.
    #[getset(get = "pub")]
    exempt: Vec<u8>,
}

impl Placement {
    /// A rectangular placement using the type's declared dimensions.
    pub fn new(building_type: Arc<BuildingType>, at: TileCoords, orientation: Orientation) -> Self {
        let footprint = Footprint::Rect(building_type.dimensions());
        Placement {
            building_type,
            at,
            orientation,
            footprint,
            parent: None,
            exempt: Vec::new(),
        }
    }

    pub fn with_mask(mut self, mask: FootprintMask) -> Self {
        self.footprint = Footprint::Mask(mask);
        self
    }

    pub fn with_parent(mut self, parent: BuildingId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_exempt(mut self, codes: &[u8]) -> Self {
        self.exempt = codes.to_vec();
        self
    }

    pub fn region(&self) -> Region {
        self.footprint.region(self.at, self.orientation)
    }

    pub fn covers(&self) -> Vec<Region> {
        self.footprint.covers(self.at, self.orientation)
    }

    pub(crate) fn into_building(self, id: BuildingId) -> Building {
        Building::new(
            id,
            self.building_type,
            self.footprint,
            self.at,
            self.orientation,
            self.parent,
            self.exempt,
        )
    }
}
