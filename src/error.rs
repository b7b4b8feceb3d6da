use crate::types::ContainerKind;
use thiserror::Error;

/// Crate error type for field access, cursor iteration and GeoPackage operations.
#[derive(Debug, Error)]
pub enum GdbError {
    /// The requested field name does not resolve on the row's schema.
    #[error("{kind} '{table}' does not contain field '{field}'")]
    FieldNotFound {
        kind: ContainerKind,
        table: String,
        field: String,
    },
    /// Wraps errors returned by `rusqlite`.
    #[error(transparent)]
    Sql(#[from] rusqlite::Error),
    /// Wraps errors returned by the `wkb` crate.
    #[error(transparent)]
    Wkb(#[from] wkb::error::WkbError),
    /// Dynamic `Value` type did not match the expected conversion target.
    #[error("expected {expected}, got {actual}")]
    ValueTypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    /// Numeric conversion failed because the value is out of range.
    #[error("value out of range for {target}")]
    ValueOutOfRange { target: &'static str },
    /// A geometry type in metadata could not be mapped to a supported WKB geometry type.
    #[error("unsupported geometry type: {0}")]
    UnsupportedGeometryType(String),
    /// A column type declared in SQLite metadata is not supported by this crate.
    #[error("unsupported column type for column '{column}': {declared_type}")]
    UnsupportedColumnType {
        column: String,
        declared_type: String,
    },
    /// Invalid or mixed `z` / `m` dimension flags in GeoPackage metadata.
    #[error("invalid or mixed geometry dimension (z={z}, m={m})")]
    InvalidDimension { z: i8, m: i8 },
    /// Invalid GeoPackage geometry flags byte.
    #[error("invalid gpkg geometry flags: {0:#04x}")]
    InvalidGpkgGeometryFlags(u8),
    /// GeoPackage geometry blob is shorter than its header (and envelope) claims.
    #[error("invalid gpkg geometry length: got {len} bytes, expected at least {minimum}")]
    InvalidGpkgGeometryLength { len: usize, minimum: usize },
    /// Property count did not match the table schema.
    #[error("invalid property count: expected {expected}, got {got}")]
    InvalidPropertyCount { expected: usize, got: usize },
    /// Table schema has no primary key column.
    #[error("no primary key column found for table: {table}")]
    MissingPrimaryKeyColumn { table: String },
    /// Table schema has multiple primary key columns, which is unsupported.
    #[error("composite primary keys are not supported yet for table: {table}")]
    CompositePrimaryKeyUnsupported { table: String },
    /// A geometry operation was requested on a table without a geometry column.
    #[error("no geometry column found for table: {table}")]
    MissingGeometryColumn { table: String },
    /// A layer with the same name already exists.
    #[error("layer already exists: {layer_name}")]
    LayerAlreadyExists { layer_name: String },
    /// No layer with this name is registered in `gpkg_contents`.
    #[error("layer not found: {layer_name}")]
    LayerNotFound { layer_name: String },
    /// Referenced `srs_id` does not exist in `gpkg_spatial_ref_sys`.
    #[error("srs_id {srs_id} not found in gpkg_spatial_ref_sys")]
    MissingSpatialRefSysId { srs_id: u32 },
    /// The primary key of an edited row differs from the one it was read with.
    #[error("primary key of row {id} in table '{table}' cannot be changed")]
    PrimaryKeyChanged { table: String, id: i64 },
    /// No row with this primary key exists anymore.
    #[error("row {id} not found in table '{table}'")]
    RowNotFound { table: String, id: i64 },
    #[error("operation not allowed on read-only connection")]
    ReadOnly,
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, GdbError>;
