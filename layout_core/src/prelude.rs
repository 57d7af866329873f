pub use crate::building::{Building, BuildingId, IdAllocator, Placement};
pub use crate::catalog::{BuildingType, CatalogError, TypeCatalog};
pub use crate::codec::{CodecError, CodecV0, FormatErrorKind, LayoutCodec, RawPlacement};
pub use crate::contour::{path_data, trace, Contour, Segment, Step};
pub use crate::footprint::{Footprint, FootprintMask, MaskError};
pub use crate::geometry::{checked_compute_region, compute_region, overlaps, Dimensions, Orientation, Region, TileCoords};
pub use crate::grid::{FreeCheck, Grid, GridError, ListenerId};
pub use crate::LayoutError;
