//! Name-indexed, validated access to row values.
//!
//! Every call resolves the field name against the row's own schema; nothing
//! is cached between calls or between rows.
//!
//! ```no_run
//! use gdb_ext::{Gpkg, RowExt, SearchExt, Value};
//!
//! let gpkg = Gpkg::open("data/example.gpkg")?;
//! let layer = gpkg.open_layer("points")?;
//! for row in layer.search(None, false)? {
//!     let mut row = row?;
//!     if row.get_value("note")?.is_none() {
//!         row.set_value("note", Some(Value::from("unchecked")))?;
//!         layer.store(&row)?;
//!     }
//! }
//! # Ok::<(), gdb_ext::GdbError>(())
//! ```

use crate::error::{GdbError, Result};
use crate::provider::{FieldDef, Row};
use crate::value::Value;

/// Position of the field named exactly `name`, if any.
pub fn find_field_index<F: FieldDef>(fields: &[F], name: &str) -> Option<usize> {
    fields.iter().position(|field| field.name() == name)
}

/// Field accessors available on every [`Row`].
pub trait RowExt: Row {
    /// Read the value of `field_name`. A null value is returned as `None`.
    fn get_value(&self, field_name: &str) -> Result<Option<Value>> {
        let index = verified_field_index(self, field_name)?;
        let value = self.value_at(index)?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    /// Read the value of `field_name` and convert it. A null value is
    /// returned as `None`.
    fn get_value_as<T>(&self, field_name: &str) -> Result<Option<T>>
    where
        T: TryFrom<Value, Error = GdbError>,
    {
        self.get_value(field_name)?.map(T::try_from).transpose()
    }

    /// Write `value` to `field_name`. `None` writes a null.
    fn set_value(&mut self, field_name: &str, value: Option<Value>) -> Result<()> {
        let index = verified_field_index(self, field_name)?;
        self.set_value_at(index, value.unwrap_or(Value::Null))
    }

    /// Look up the metadata of `field_name`.
    fn get_field(&self, field_name: &str) -> Result<&Self::Field> {
        let index = verified_field_index(self, field_name)?;
        self.fields()
            .get(index)
            .ok_or_else(|| field_not_found(self, field_name))
    }
}

impl<R: Row + ?Sized> RowExt for R {}

fn verified_field_index<R: Row + ?Sized>(row: &R, field_name: &str) -> Result<usize> {
    row.find_field(field_name)
        .ok_or_else(|| field_not_found(row, field_name))
}

fn field_not_found<R: Row + ?Sized>(row: &R, field_name: &str) -> GdbError {
    tracing::debug!(
        table = row.table_name(),
        field = field_name,
        "field lookup failed"
    );
    GdbError::FieldNotFound {
        kind: row.table_kind(),
        table: row.table_name().to_string(),
        field: field_name.to_string(),
    }
}
