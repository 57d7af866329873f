pub mod building;
pub mod catalog;
pub mod codec;
pub mod contour;
pub mod footprint;
pub mod geometry;
pub mod grid;
pub mod prelude;
pub mod templates;

use thiserror::Error;

use self::prelude::*;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Mask(#[from] MaskError),
}
