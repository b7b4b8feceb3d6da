//! Cursor iteration and name-based field access for geodatabase rows, with a
//! GeoPackage provider built on top of rusqlite.
//!
//! ## Overview
//!
//! - `Searchable` is a table or feature class that can run a query and hand
//!   back a `Cursor`.
//! - `Row` is a single row with an ordered schema of `FieldDef`s.
//! - `SearchExt::search` turns a query into a lazy iterator of rows and
//!   releases the cursor exactly once, however iteration ends.
//! - `RowExt` reads and writes values by field name. A missing field is a
//!   `GdbError::FieldNotFound`, a null value is `None`.
//!
//! The helpers only depend on the traits. The bundled GeoPackage provider is:
//!
//! - `Gpkg`: the whole GeoPackage file (or an in-memory database).
//! - `GpkgLayer`: a feature table or attribute table in it.
//! - `GpkgRow`: a single row of a layer.
//! - `QueryFilter`: a `WHERE` fragment and/or an envelope filter.
//!
//! ## Reading
//!
//! ```no_run
//! use gdb_ext::{Gpkg, QueryFilter, RowExt, SearchExt, Value};
//!
//! let gpkg = Gpkg::open_read_only("data/example.gpkg")?;
//! let layer = gpkg.open_layer("cities")?;
//! let query = QueryFilter::new().with_where("population > ?", [Value::from(1_000_000_i64)]);
//!
//! for row in layer.search(Some(&query), true)? {
//!     let row = row?;
//!     let name: Option<String> = row.get_value_as("name")?;
//!     println!("{}: {}", row.id(), name.as_deref().unwrap_or("<unnamed>"));
//! }
//! # Ok::<(), gdb_ext::GdbError>(())
//! ```
//!
//! Breaking out of the loop early is fine: the cursor is released when the
//! iterator is dropped.
//!
//! ## Writing
//!
//! ```no_run
//! use geo_types::Point;
//! use gdb_ext::{ColumnSpec, FieldType, Gpkg, RowExt, SearchExt, Value};
//! use gdb_ext::{Dimension, GeometryType};
//!
//! let gpkg = Gpkg::new("cities.gpkg")?;
//! let layer = gpkg.create_layer(
//!     "cities",
//!     "geom",
//!     GeometryType::Point,
//!     Dimension::Xy,
//!     4326,
//!     &[
//!         ColumnSpec::new("name", FieldType::Varchar),
//!         ColumnSpec::new("note", FieldType::Varchar),
//!     ],
//! )?;
//! layer.insert(Point::new(139.7, 35.7), [Value::from("Tokyo"), Value::Null])?;
//!
//! for row in layer.search(None, false)? {
//!     let mut row = row?;
//!     if row.get_value("note")?.is_none() {
//!         row.set_value("note", Some(Value::from("checked")))?;
//!         layer.store(&row)?;
//!     }
//! }
//! # Ok::<(), gdb_ext::GdbError>(())
//! ```
mod conversions;
mod cursor;
mod envelope;
mod error;
mod gpkg;
mod ogc_sql;
mod provider;
mod row;
mod sql_functions;
mod types;
mod value;

pub use cursor::{CursorGuard, SearchExt, SearchIter, search};
pub use envelope::Envelope;
pub use error::{GdbError, Result};
pub use gpkg::{GeometryColumn, Gpkg, GpkgCursor, GpkgField, GpkgLayer, GpkgRow, QueryFilter};
pub use provider::{Cursor, Dataset, FieldDef, Row, Searchable};
pub use row::{RowExt, find_field_index};
pub use sql_functions::register_spatial_functions;
pub use types::{ColumnSpec, ContainerKind, FieldType};
pub use value::Value;

// Re-export types used in public fields to keep the public API stable.
pub use wkb::reader::{Dimension, GeometryType};
