use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::building::{Building, BuildingId, IdAllocator, Placement};
use crate::catalog::{BuildingType, TypeCatalog};
use crate::codec::{CodecError, CodecV0, LayoutCodec};
use crate::footprint::{Footprint, FootprintMask};
use crate::geometry::{overlaps, regions_equal, Orientation, Region, TileCoords};
use crate::LayoutError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("region {region} is blocked by {blockers:?}")]
    PlacementRejected {
        region: Region,
        blockers: Vec<BuildingId>,
    },
    #[error("no building {0} on this grid")]
    UnknownBuilding(BuildingId),
    #[error("building {0} has a rectangular footprint and cannot be reshaped")]
    NotShaped(BuildingId),
    #[error("a footprint anchored at {at} reaches past the last tile coordinate")]
    OutOfBounds { at: TileCoords },
}

/// Options for [`Grid::is_free`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FreeCheck<'a> {
    /// Buildings of these type codes never block.
    pub exempt: &'a [u8],
    /// This building never blocks, typically the one being moved.
    pub ignore: Option<BuildingId>,
    /// Type code of the building being placed. Buildings that exempt it
    /// never block.
    pub placing: Option<u8>,
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ListenerId(usize);

type BoundsListener = Box<dyn FnMut(&Region)>;

#[derive(Default)]
struct BoundsListeners {
    listeners: BTreeMap<ListenerId, BoundsListener>,
    listener_id_counter: usize,
}

impl BoundsListeners {
    fn add(&mut self, listener: BoundsListener) -> ListenerId {
        self.listener_id_counter += 1;
        let id = ListenerId(self.listener_id_counter);
        self.listeners.insert(id, listener);
        id
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    fn notify(&mut self, bounds: &Region) {
        for listener in self.listeners.values_mut() {
            listener(bounds);
        }
    }
}

impl fmt::Debug for BoundsListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundsListeners")
            .field("listeners", &self.listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The placed buildings of one layout.
///
/// No two buildings overlap unless one was placed with the other's type code
/// exempted. `bounds` is the bounding box over every building's region, or
/// [`Region::EMPTY`], and is recomputed after each committed change.
///
/// Listeners registered with [`Grid::on_bounds_changed`] run inline, at the end
/// of the mutating call, and only when the bounds actually changed. They only
/// get the new bounds: a grid shared as `Rc<RefCell<Grid>>` is still mutably
/// borrowed while they run, so a listener cannot borrow it again.
#[derive(Debug)]
pub struct Grid {
    buildings: HashMap<BuildingId, Building>,
    bounds: Region,
    ids: IdAllocator,
    listeners: BoundsListeners,
}

impl Default for Grid {
    fn default() -> Self {
        Grid::with_ids(IdAllocator::default())
    }
}

impl Grid {
    pub fn new() -> Self {
        Grid::default()
    }

    /// Empty grid drawing building ids from `ids`.
    pub fn with_ids(ids: IdAllocator) -> Self {
        Grid {
            buildings: HashMap::new(),
            bounds: Region::EMPTY,
            ids,
            listeners: BoundsListeners::default(),
        }
    }

    pub fn bounds(&self) -> Region {
        self.bounds
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    pub fn get(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.get(&id)
    }

    /// Every building, by id.
    pub fn buildings(&self) -> Vec<&Building> {
        let mut buildings: Vec<&Building> = self.buildings.values().collect();
        buildings.sort_by_key(|building| building.id());
        buildings
    }

    pub fn on_bounds_changed<F: FnMut(&Region) + 'static>(&mut self, listener: F) -> ListenerId {
        self.listeners.add(Box::new(listener))
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn is_free(&self, region: &Region, check: &FreeCheck) -> bool {
        self.blockers(&[*region], check).is_empty()
    }

    /// Ids of the buildings that would block the `covers` tiles, by id.
    fn blockers(&self, covers: &[Region], check: &FreeCheck) -> Vec<BuildingId> {
        let area = Region::bounding(covers);
        let mut blockers: Vec<BuildingId> = self
            .buildings
            .values()
            .filter(|building| Some(building.id()) != check.ignore)
            .filter(|building| !check.exempt.contains(&building.type_code()))
            .filter(|building| {
                check
                    .placing
                    .map_or(true, |code| !building.exempt().contains(&code))
            })
            .filter(|building| overlaps(&building.region(), &area))
            .filter(|building| {
                let occupied = building.covers();
                occupied
                    .iter()
                    .any(|taken| covers.iter().any(|wanted| overlaps(taken, wanted)))
            })
            .map(Building::id)
            .collect();
        blockers.sort();
        blockers
    }

    /// The building covering `tile`. When exempt buildings share the tile,
    /// the one placed first.
    pub fn building_at(&self, tile: TileCoords) -> Option<&Building> {
        self.buildings
            .values()
            .filter(|building| building.occupies(tile))
            .min_by_key(|building| building.id())
    }

    /// Buildings not of an `exempt` type that have tiles in `region`.
    pub fn buildings_in(&self, region: &Region, exempt: &[u8]) -> HashSet<BuildingId> {
        self.blockers(
            &[*region],
            &FreeCheck {
                exempt,
                ignore: None,
                placing: None,
            },
        )
        .into_iter()
        .collect()
    }

    pub fn place(
        &mut self,
        building_type: Arc<BuildingType>,
        at: TileCoords,
        orientation: Orientation,
    ) -> Result<BuildingId, GridError> {
        self.place_with(Placement::new(building_type, at, orientation))
    }

    /// Places a building owned by `parent`, removed along with it.
    pub fn place_child(
        &mut self,
        parent: BuildingId,
        building_type: Arc<BuildingType>,
        at: TileCoords,
        orientation: Orientation,
    ) -> Result<BuildingId, GridError> {
        self.place_with(Placement::new(building_type, at, orientation).with_parent(parent))
    }

    pub fn place_shaped(
        &mut self,
        building_type: Arc<BuildingType>,
        mask: FootprintMask,
        at: TileCoords,
        orientation: Orientation,
    ) -> Result<BuildingId, GridError> {
        self.place_with(Placement::new(building_type, at, orientation).with_mask(mask))
    }

    /// Places a building allowed to overlap buildings of the `exempt` types,
    /// typically a road over other roads.
    pub fn place_exempt(
        &mut self,
        building_type: Arc<BuildingType>,
        at: TileCoords,
        orientation: Orientation,
        exempt: &[u8],
    ) -> Result<BuildingId, GridError> {
        self.place_with(Placement::new(building_type, at, orientation).with_exempt(exempt))
    }

    pub fn place_with(&mut self, placement: Placement) -> Result<BuildingId, GridError> {
        let id = self.insert(placement)?;
        self.refresh_bounds();
        Ok(id)
    }

    /// Validates and inserts without touching the bounds.
    fn insert(&mut self, placement: Placement) -> Result<BuildingId, GridError> {
        if let Some(parent) = placement.parent() {
            if !self.buildings.contains_key(&parent) {
                return Err(GridError::UnknownBuilding(parent));
            }
        }
        if placement
            .footprint()
            .checked_region(placement.at(), placement.orientation())
            .is_none()
        {
            return Err(GridError::OutOfBounds { at: placement.at() });
        }
        let blockers = self.blockers(
            &placement.covers(),
            &FreeCheck {
                exempt: placement.exempt(),
                ignore: None,
                placing: Some(placement.building_type().code()),
            },
        );
        if !blockers.is_empty() {
            log::debug!(
                "Rejected {} at {}, blocked by {:?}",
                placement.building_type().key(),
                placement.at(),
                blockers
            );
            return Err(GridError::PlacementRejected {
                region: placement.region(),
                blockers,
            });
        }
        let id = self.ids.allocate();
        let building = placement.into_building(id);
        if let Some(parent) = building.parent().and_then(|parent| self.buildings.get_mut(&parent)) {
            parent.add_child(id);
        }
        log::trace!(
            "Placed {} {} at {}",
            building.building_type().key(),
            id,
            building.at()
        );
        self.buildings.insert(id, building);
        Ok(id)
    }

    /// Moves a building, which may overlap the tiles it currently occupies.
    pub fn move_building(
        &mut self,
        id: BuildingId,
        at: TileCoords,
        orientation: Orientation,
    ) -> Result<(), GridError> {
        let building = self.buildings.get(&id).ok_or(GridError::UnknownBuilding(id))?;
        self.check_replacement(building, building.footprint(), at, orientation)?;
        if let Some(building) = self.buildings.get_mut(&id) {
            building.set_placement(at, orientation);
        }
        self.refresh_bounds();
        Ok(())
    }

    /// Gives a masked building a new mask and anchor, keeping its orientation.
    pub fn reshape(
        &mut self,
        id: BuildingId,
        at: TileCoords,
        mask: FootprintMask,
    ) -> Result<(), GridError> {
        let building = self.buildings.get(&id).ok_or(GridError::UnknownBuilding(id))?;
        if !building.footprint().is_shaped() {
            return Err(GridError::NotShaped(id));
        }
        let footprint = Footprint::Mask(mask);
        let orientation = building.orientation();
        self.check_replacement(building, &footprint, at, orientation)?;
        if let Some(building) = self.buildings.get_mut(&id) {
            building.set_footprint(footprint);
            building.set_placement(at, orientation);
        }
        self.refresh_bounds();
        Ok(())
    }

    fn check_replacement(
        &self,
        building: &Building,
        footprint: &Footprint,
        at: TileCoords,
        orientation: Orientation,
    ) -> Result<(), GridError> {
        if footprint.checked_region(at, orientation).is_none() {
            return Err(GridError::OutOfBounds { at });
        }
        let blockers = self.blockers(
            &footprint.covers(at, orientation),
            &FreeCheck {
                exempt: building.exempt(),
                ignore: Some(building.id()),
                placing: Some(building.type_code()),
            },
        );
        if blockers.is_empty() {
            Ok(())
        } else {
            Err(GridError::PlacementRejected {
                region: footprint.region(at, orientation),
                blockers,
            })
        }
    }

    /// Removes a building and all of its descendants. Returns the removed
    /// ids, starting with `id`.
    pub fn remove(&mut self, id: BuildingId) -> Result<Vec<BuildingId>, GridError> {
        let parent = self.buildings.get(&id).ok_or(GridError::UnknownBuilding(id))?.parent();
        if let Some(parent) = parent.and_then(|parent| self.buildings.get_mut(&parent)) {
            parent.remove_child(id);
        }
        let mut removed = Vec::new();
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(building) = self.buildings.remove(&next) {
                pending.extend(building.children().iter().rev());
                removed.push(next);
            }
        }
        log::debug!("Removed {:?}", removed);
        self.refresh_bounds();
        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.buildings.clear();
        self.refresh_bounds();
    }

    /// The layout as a version 0 code.
    pub fn export(&self) -> Result<String, CodecError> {
        CodecV0.encode(&self.buildings())
    }

    /// Adds every building of `code` at its encoded coordinates. Nothing is
    /// added unless all of them fit, both against the current content and
    /// against each other. Road types may overlap their own kind.
    pub fn import(&mut self, code: &str, catalog: &TypeCatalog) -> Result<Vec<BuildingId>, LayoutError> {
        let placements = CodecV0.decode(code, catalog)?;
        let mut added = Vec::with_capacity(placements.len());
        for placement in placements {
            let placement = if placement.building_type().road() {
                let road = placement.building_type().code();
                placement.with_exempt(&[road])
            } else {
                placement
            };
            match self.insert(placement) {
                Ok(id) => added.push(id),
                Err(err) => {
                    for id in added {
                        self.buildings.remove(&id);
                    }
                    return Err(err.into());
                },
            }
        }
        log::debug!("Imported {} buildings", added.len());
        self.refresh_bounds();
        Ok(added)
    }

    fn refresh_bounds(&mut self) {
        let regions: Vec<Region> = self.buildings.values().map(Building::region).collect();
        let bounds = Region::bounding(&regions);
        if !regions_equal(Some(&bounds), Some(&self.bounds)) {
            log::trace!("Bounds changed from {} to {}", self.bounds, bounds);
            self.bounds = bounds;
            self.listeners.notify(&bounds);
        }
    }
}
