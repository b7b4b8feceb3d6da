//! GeoPackage provider backed by rusqlite.
//!
//! Feature tables are exposed as feature classes, attribute tables as plain
//! tables. Both implement [`crate::Searchable`] and yield [`GpkgRow`]s that
//! implement [`crate::Row`].

mod cursor;
mod feature;
mod gpkg;
mod layer;
mod query;

pub use cursor::GpkgCursor;
pub use feature::{GeometryColumn, GpkgField, GpkgRow};
pub use gpkg::Gpkg;
pub use layer::GpkgLayer;
pub use query::QueryFilter;

pub(crate) use feature::gpkg_geometry_to_wkb;

#[cfg(test)]
pub(crate) use feature::geometry_to_gpkg_blob;
