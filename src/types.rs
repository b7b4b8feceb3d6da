use std::fmt;

/// Logical type of a field, as declared in the table schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    /// The table's integer primary key (object id).
    ObjectId,
    Boolean,
    Varchar,
    Double,
    Integer,
    Date,
    DateTime,
    Blob,
    Geometry,
}

/// What kind of container a row belongs to.
///
/// Only used to word diagnostics; no behavior depends on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerKind {
    /// A table with a geometry column.
    FeatureClass,
    /// A plain attribute table.
    Table,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FeatureClass => f.write_str("Featureclass"),
            Self::Table => f.write_str("Table"),
        }
    }
}

/// Column definition used when creating layers and tables.
#[derive(Clone, Debug)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: FieldType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: FieldType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}
