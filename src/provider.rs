//! Capability traits a geodatabase provider implements.
//!
//! [`crate::SearchExt`] and [`crate::RowExt`] are written purely against these
//! traits. [`crate::Gpkg`] is one implementation.

use crate::Result;
use crate::types::{ContainerKind, FieldType};
use crate::value::Value;

/// A named container of rows: a feature class or a plain table.
pub trait Dataset {
    fn name(&self) -> &str;

    fn kind(&self) -> ContainerKind;
}

/// Metadata of a single field in a row schema.
pub trait FieldDef {
    fn name(&self) -> &str;

    fn field_type(&self) -> FieldType;

    fn is_nullable(&self) -> bool {
        true
    }
}

/// A single row with an ordered schema and positional values.
pub trait Row {
    type Field: FieldDef;

    /// Fields in schema order. `value_at(i)` holds the value of `fields()[i]`.
    fn fields(&self) -> &[Self::Field];

    /// Resolve a field name to its position. `None` when the schema has no
    /// field with exactly this name.
    fn find_field(&self, name: &str) -> Option<usize> {
        crate::row::find_field_index(self.fields(), name)
    }

    fn value_at(&self, index: usize) -> Result<Value>;

    fn set_value_at(&mut self, index: usize, value: Value) -> Result<()>;

    /// Name of the container this row was read from.
    fn table_name(&self) -> &str;

    fn table_kind(&self) -> ContainerKind;
}

/// A forward-only, one-shot result cursor.
pub trait Cursor {
    type Row;

    /// Fetch the next row. `Ok(None)` marks the end of the results.
    fn next_row(&mut self) -> Result<Option<Self::Row>>;

    /// Release the underlying resources. Calling it more than once is a no-op.
    fn release(&mut self);
}

/// A container that can execute queries.
pub trait Searchable {
    type Query;
    type Cursor: Cursor;

    /// Execute `query` (`None` matches every row) and return a cursor over the
    /// results. `recycling` is a provider hint on whether rows may be reused
    /// between advances.
    fn execute_query(&self, query: Option<&Self::Query>, recycling: bool) -> Result<Self::Cursor>;
}
