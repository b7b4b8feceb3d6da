use crate::error::{GdbError, Result};
use crate::ogc_sql::{
    sql_count_rows, sql_delete_all, sql_insert_row, sql_select_next_row, sql_update_row,
};
use crate::provider::{Dataset, Searchable};
use crate::types::ContainerKind;
use crate::value::Value;
use geo_traits::GeometryTrait;
use rusqlite::params_from_iter;
use std::sync::Arc;

use super::feature::{GeometryColumn, GpkgField, GpkgRow, TableSchema, geometry_to_gpkg_blob};
use super::{Gpkg, GpkgCursor, QueryFilter};

/// A GeoPackage feature table (with a geometry column) or attribute table.
#[derive(Debug)]
pub struct GpkgLayer<'a> {
    pub(super) gpkg: &'a Gpkg,
    pub(super) schema: Arc<TableSchema>,
}

impl<'a> GpkgLayer<'a> {
    pub fn fields(&self) -> &[GpkgField] {
        &self.schema.fields
    }

    pub fn primary_key_column(&self) -> &str {
        self.schema.primary_key_column()
    }

    /// Geometry column metadata, `None` for attribute tables.
    pub fn geometry_column(&self) -> Option<&GeometryColumn> {
        self.schema.geometry.as_ref()
    }

    /// Number of rows matching `query` (all rows for `None`).
    pub fn count(&self, query: Option<&QueryFilter>) -> Result<u64> {
        let (conditions, params) = match query {
            Some(query) => query.to_conditions(&self.schema)?,
            None => (Vec::new(), Vec::new()),
        };
        let sql = sql_count_rows(&self.schema.table_name, &conditions);
        let count: i64 = self
            .gpkg
            .connection()
            .query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Insert a feature. `properties` are the values of every column other
    /// than the primary key and the geometry, in table order. Returns the new
    /// primary key.
    ///
    /// ```no_run
    /// use geo_types::Point;
    /// use gdb_ext::{Gpkg, Value};
    ///
    /// let gpkg = Gpkg::open("data/example.gpkg")?;
    /// let layer = gpkg.open_layer("points")?;
    /// let id = layer.insert(Point::new(1.0, 2.0), [Value::from("alpha"), Value::from(1_i64)])?;
    /// # Ok::<(), gdb_ext::GdbError>(())
    /// ```
    pub fn insert<G, P>(&self, geometry: G, properties: P) -> Result<i64>
    where
        G: GeometryTrait<T = f64>,
        P: IntoIterator<Item = Value>,
    {
        self.ensure_writable()?;
        let column = self.schema.require_geometry()?;
        let blob = geometry_to_gpkg_blob(geometry, column.srs_id)?;
        self.insert_with_geometry(Value::Geometry(blob), properties)
    }

    /// Insert a row without geometry. On a feature table the geometry is
    /// left null.
    pub fn insert_attributes<P>(&self, properties: P) -> Result<i64>
    where
        P: IntoIterator<Item = Value>,
    {
        self.ensure_writable()?;
        self.insert_with_geometry(Value::Null, properties)
    }

    /// Write every column of an edited row back, keyed on [`GpkgRow::id`].
    pub fn store(&self, row: &GpkgRow) -> Result<()> {
        self.ensure_writable()?;
        if row.schema.table_name != self.schema.table_name {
            return Err(GdbError::Message(format!(
                "row of '{}' cannot be stored in '{}'",
                row.schema.table_name, self.schema.table_name
            )));
        }

        let id = Value::Integer(row.id);
        if row.values[self.schema.primary_key_index] != id {
            return Err(GdbError::PrimaryKeyChanged {
                table: self.schema.table_name.clone(),
                id: row.id,
            });
        }

        let indices: Vec<usize> = self.schema.writable_indices().collect();
        let sql = sql_update_row(
            &self.schema.table_name,
            indices.iter().map(|&idx| self.schema.fields[idx].name.as_str()),
            self.schema.primary_key_column(),
        );
        let params = indices
            .iter()
            .map(|&idx| &row.values[idx])
            .chain(std::iter::once(&id));

        let mut stmt = self.gpkg.connection().prepare_cached(&sql)?;
        let updated = stmt.execute(params_from_iter(params))?;
        tracing::debug!(table = %self.schema.table_name, id = row.id, updated, "row stored");
        if updated == 0 {
            return Err(GdbError::RowNotFound {
                table: self.schema.table_name.clone(),
                id: row.id,
            });
        }
        Ok(())
    }

    /// Remove all rows.
    pub fn truncate(&self) -> Result<usize> {
        self.ensure_writable()?;
        let sql = sql_delete_all(&self.schema.table_name);
        Ok(self.gpkg.connection().execute(&sql, [])?)
    }

    fn insert_with_geometry<P>(&self, geometry: Value, properties: P) -> Result<i64>
    where
        P: IntoIterator<Item = Value>,
    {
        let geometry_index = self.schema.geometry.as_ref().map(|g| g.index);
        let mut properties = properties.into_iter();
        let mut columns = Vec::with_capacity(self.schema.fields.len());
        let mut values = Vec::with_capacity(self.schema.fields.len());
        let mut geometry = Some(geometry);
        let expected = self.schema.fields.len() - 1 - usize::from(geometry_index.is_some());
        let mut got = 0;

        for idx in self.schema.writable_indices() {
            columns.push(self.schema.fields[idx].name.as_str());
            if Some(idx) == geometry_index {
                values.push(geometry.take().unwrap_or(Value::Null));
            } else {
                match properties.next() {
                    Some(value) => {
                        got += 1;
                        values.push(value);
                    }
                    None => return Err(GdbError::InvalidPropertyCount { expected, got }),
                }
            }
        }
        let extra = properties.count();
        if extra > 0 {
            return Err(GdbError::InvalidPropertyCount {
                expected,
                got: got + extra,
            });
        }

        let sql = sql_insert_row(&self.schema.table_name, columns);
        let conn = self.gpkg.connection();
        let mut stmt = conn.prepare_cached(&sql)?;
        stmt.execute(params_from_iter(values.iter()))?;
        Ok(conn.last_insert_rowid())
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.gpkg.is_read_only() {
            return Err(GdbError::ReadOnly);
        }
        Ok(())
    }
}

impl Dataset for GpkgLayer<'_> {
    fn name(&self) -> &str {
        &self.schema.table_name
    }

    fn kind(&self) -> ContainerKind {
        self.schema.kind()
    }
}

impl<'a> Searchable for GpkgLayer<'a> {
    type Query = QueryFilter;
    type Cursor = GpkgCursor<'a>;

    fn execute_query(
        &self,
        query: Option<&QueryFilter>,
        recycling: bool,
    ) -> Result<GpkgCursor<'a>> {
        let (conditions, params) = match query {
            Some(query) => query.to_conditions(&self.schema)?,
            None => (Vec::new(), Vec::new()),
        };
        let sql = sql_select_next_row(
            &self.schema.table_name,
            self.schema.fields.iter().map(|f| f.name.as_str()),
            self.schema.primary_key_column(),
            &conditions,
            params.len() + 1,
        );
        // Surface syntax errors in the filter now rather than on first advance.
        self.gpkg.connection().prepare_cached(&sql)?;

        Ok(GpkgCursor {
            gpkg: self.gpkg,
            schema: Arc::clone(&self.schema),
            sql,
            params,
            recycling,
            last_id: None,
            exhausted: false,
            released: false,
        })
    }
}
