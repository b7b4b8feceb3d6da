use crate::error::Result;
use crate::provider::Cursor;
use crate::value::Value;
use rusqlite::params_from_iter;
use rusqlite::types::Type;
use std::sync::Arc;

use super::Gpkg;
use super::feature::{GpkgRow, TableSchema};

/// Forward-only cursor over a GeoPackage table, in primary key order.
///
/// Each advance runs one keyset-paginated `SELECT ... LIMIT 1`, so only the
/// current row is ever materialized and no SQLite statement stays open
/// between advances.
pub struct GpkgCursor<'a> {
    pub(super) gpkg: &'a Gpkg,
    pub(super) schema: Arc<TableSchema>,
    pub(super) sql: String,
    pub(super) params: Vec<Value>,
    pub(super) recycling: bool,
    pub(super) last_id: Option<i64>,
    pub(super) exhausted: bool,
    pub(super) released: bool,
}

impl GpkgCursor<'_> {
    fn fetch_next(&mut self) -> Result<Option<GpkgRow>> {
        let schema = &self.schema;
        let mut stmt = self.gpkg.connection().prepare_cached(&self.sql)?;
        let last_id = Value::from(self.last_id);
        let mut rows = stmt.query(params_from_iter(
            self.params.iter().chain(std::iter::once(&last_id)),
        ))?;

        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let geometry_index = schema.geometry.as_ref().map(|g| g.index);
        let mut values = Vec::with_capacity(schema.fields.len());
        for idx in 0..schema.fields.len() {
            let value_ref = row.get_ref(idx)?;
            values.push(Value::from_sql_ref(value_ref, Some(idx) == geometry_index));
        }

        let id = match values[schema.primary_key_index] {
            Value::Integer(id) => id,
            ref other => {
                return Err(rusqlite::Error::InvalidColumnType(
                    schema.primary_key_index,
                    schema.primary_key_column().to_string(),
                    match other {
                        Value::Null => Type::Null,
                        Value::Real(_) => Type::Real,
                        Value::Text(_) => Type::Text,
                        _ => Type::Blob,
                    },
                )
                .into());
            }
        };

        Ok(Some(GpkgRow {
            schema: Arc::clone(schema),
            id,
            values,
        }))
    }
}

impl<'a> Cursor for GpkgCursor<'a> {
    type Row = GpkgRow;

    fn next_row(&mut self) -> Result<Option<GpkgRow>> {
        if self.released || self.exhausted {
            return Ok(None);
        }
        match self.fetch_next() {
            Ok(Some(row)) => {
                self.last_id = Some(row.id);
                Ok(Some(row))
            }
            Ok(None) => {
                self.exhausted = true;
                Ok(None)
            }
            Err(err) => {
                self.exhausted = true;
                Err(err)
            }
        }
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            tracing::debug!(
                table = %self.schema.table_name,
                last_id = ?self.last_id,
                recycling = self.recycling,
                "gpkg cursor released"
            );
        }
    }
}
