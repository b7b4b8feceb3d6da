use crate::conversions::{
    dimension_from_zm, dimension_to_zm, field_type_from_str, field_type_to_str,
    geometry_type_from_str, geometry_type_to_str,
};
use crate::error::{GdbError, Result};
use crate::ogc_sql::{
    SQL_DELETE_LAYER_METADATA, SQL_INSERT_GPKG_CONTENTS, SQL_INSERT_GPKG_GEOMETRY_COLUMNS,
    SQL_INSERT_SRS, SQL_LIST_LAYERS, SQL_SELECT_DATA_TYPE, SQL_SELECT_GEOMETRY_COLUMN_META,
    SQL_SRS_EXISTS, SQL_TABLE_COLUMNS, SQL_TABLE_EXISTS, execute_rtree_sqls, quote_ident,
    rtree_table_name, sql_create_table, sql_drop_table,
};
use crate::sql_functions::register_spatial_functions;
use crate::types::{ColumnSpec, FieldType};
use rusqlite::{OpenFlags, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use wkb::reader::{Dimension, GeometryType};

use super::feature::{GeometryColumn, GpkgField, TableSchema};
use super::layer::GpkgLayer;

const PRIMARY_KEY_COLUMN: &str = "fid";

#[derive(Debug)]
/// GeoPackage connection, the provider behind [`GpkgLayer`].
pub struct Gpkg {
    conn: rusqlite::Connection,
    read_only: bool,
}

impl Gpkg {
    /// Open an existing GeoPackage without write access.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = rusqlite::Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        tracing::debug!(path = %path.as_ref().display(), "opened gpkg read-only");
        Self::with_connection(conn, true)
    }

    /// Open an existing GeoPackage for reading and writing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GdbError::Message(format!(
                "GeoPackage file does not exist: {}",
                path.display()
            )));
        }
        let conn = rusqlite::Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened gpkg");
        Self::with_connection(conn, false)
    }

    /// Create a new GeoPackage file. Fails if the file exists.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Err(GdbError::Message(format!(
                "GeoPackage file already exists: {}",
                path.display()
            )));
        }
        let conn = rusqlite::Connection::open(path)?;
        crate::ogc_sql::initialize_gpkg(&conn)?;
        tracing::debug!(path = %path.display(), "created gpkg");
        Self::with_connection(conn, false)
    }

    /// Create a transient GeoPackage in memory.
    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        crate::ogc_sql::initialize_gpkg(&conn)?;
        Self::with_connection(conn, false)
    }

    fn with_connection(conn: rusqlite::Connection, read_only: bool) -> Result<Self> {
        register_spatial_functions(&conn)?;
        Ok(Self { conn, read_only })
    }

    /// Register a spatial reference system in `gpkg_spatial_ref_sys`.
    ///
    /// Layers can only reference an `srs_id` that is already registered. No
    /// validation of `definition` (WKT) is done.
    pub fn register_srs(
        &self,
        srs_name: &str,
        srs_id: i32,
        organization: &str,
        organization_coordsys_id: i32,
        definition: &str,
        description: &str,
    ) -> Result<()> {
        self.ensure_writable()?;
        self.conn.execute(
            SQL_INSERT_SRS,
            rusqlite::params![
                srs_name,
                srs_id,
                organization,
                organization_coordsys_id,
                definition,
                description
            ],
        )?;
        Ok(())
    }

    /// Names of all feature and attribute tables, sorted.
    pub fn list_layers(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(SQL_LIST_LAYERS)?;
        let layers = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(layers)
    }

    /// Load a feature or attribute table by name.
    pub fn open_layer<'a>(&'a self, layer_name: &str) -> Result<GpkgLayer<'a>> {
        let data_type: Option<String> = self
            .conn
            .query_row(SQL_SELECT_DATA_TYPE, [layer_name], |row| row.get(0))
            .optional()?;
        let geometry_meta = match data_type.as_deref() {
            None => {
                return Err(GdbError::LayerNotFound {
                    layer_name: layer_name.to_string(),
                });
            }
            Some("features") => Some(self.geometry_column_meta(layer_name)?),
            Some("attributes") => None,
            Some(other) => {
                return Err(GdbError::Message(format!(
                    "unsupported data_type '{other}' for layer: {layer_name}"
                )));
            }
        };

        let (fields, primary_key_index) = self.table_fields(layer_name)?;
        let geometry = match geometry_meta {
            Some((name, geometry_type, dimension, srs_id)) => {
                let index = fields
                    .iter()
                    .position(|f| f.name == name)
                    .ok_or_else(|| GdbError::MissingGeometryColumn {
                        table: layer_name.to_string(),
                    })?;
                let has_spatial_index = self.table_exists(&rtree_table_name(layer_name, &name))?;
                Some(GeometryColumn {
                    name,
                    geometry_type,
                    dimension,
                    srs_id,
                    index,
                    has_spatial_index,
                })
            }
            None => None,
        };

        let mut fields = fields;
        if let Some(geometry) = &geometry {
            fields[geometry.index].field_type = FieldType::Geometry;
        }

        Ok(GpkgLayer {
            gpkg: self,
            schema: Arc::new(TableSchema::new(
                layer_name.to_string(),
                fields,
                primary_key_index,
                geometry,
            )),
        })
    }

    /// Create a feature table with an `fid` primary key, a geometry column
    /// and an R-tree spatial index.
    ///
    /// ```
    /// use gdb_ext::{ColumnSpec, FieldType, Gpkg};
    /// use wkb::reader::{Dimension, GeometryType};
    ///
    /// let gpkg = Gpkg::open_in_memory()?;
    /// let layer = gpkg.create_layer(
    ///     "parcels",
    ///     "geom",
    ///     GeometryType::Polygon,
    ///     Dimension::Xy,
    ///     4326,
    ///     &[ColumnSpec::new("owner", FieldType::Varchar)],
    /// )?;
    /// assert_eq!(layer.fields().len(), 3);
    /// # Ok::<(), gdb_ext::GdbError>(())
    /// ```
    pub fn create_layer<'a>(
        &'a self,
        layer_name: &str,
        geometry_column: &str,
        geometry_type: GeometryType,
        geometry_dimension: Dimension,
        srs_id: u32,
        columns: &[ColumnSpec],
    ) -> Result<GpkgLayer<'a>> {
        self.ensure_new_layer(layer_name)?;

        let srs_exists: bool = self
            .conn
            .query_row(SQL_SRS_EXISTS, [srs_id], |row| row.get(0))?;
        if !srs_exists {
            return Err(GdbError::MissingSpatialRefSysId { srs_id });
        }

        let geometry_type_name = geometry_type_to_str(geometry_type);
        let (z, m) = dimension_to_zm(geometry_dimension);
        let geometry_def = format!("{} {geometry_type_name}", quote_ident(geometry_column));

        let tx = self.conn.unchecked_transaction()?;
        self.create_user_table(layer_name, Some(geometry_def), columns)?;
        self.conn.execute(
            SQL_INSERT_GPKG_CONTENTS,
            rusqlite::params![layer_name, "features", srs_id],
        )?;
        self.conn.execute(
            SQL_INSERT_GPKG_GEOMETRY_COLUMNS,
            rusqlite::params![layer_name, geometry_column, geometry_type_name, srs_id, z, m],
        )?;
        execute_rtree_sqls(&self.conn, layer_name, geometry_column, PRIMARY_KEY_COLUMN)?;
        tx.commit()?;

        tracing::debug!(layer = layer_name, "created feature layer");
        self.open_layer(layer_name)
    }

    /// Create an attribute (non-spatial) table with an `fid` primary key.
    pub fn create_table<'a>(
        &'a self,
        table_name: &str,
        columns: &[ColumnSpec],
    ) -> Result<GpkgLayer<'a>> {
        self.ensure_new_layer(table_name)?;

        let tx = self.conn.unchecked_transaction()?;
        self.create_user_table(table_name, None, columns)?;
        self.conn.execute(
            SQL_INSERT_GPKG_CONTENTS,
            rusqlite::params![table_name, "attributes", Option::<u32>::None],
        )?;
        tx.commit()?;

        tracing::debug!(table = table_name, "created attribute table");
        self.open_layer(table_name)
    }

    /// Drop a layer together with its spatial index and metadata.
    pub fn delete_layer(&self, layer_name: &str) -> Result<()> {
        self.ensure_writable()?;
        let layer = self.open_layer(layer_name)?;
        let rtree = layer
            .geometry_column()
            .filter(|g| g.has_spatial_index)
            .map(|g| rtree_table_name(layer_name, &g.name));

        let tx = self.conn.unchecked_transaction()?;
        if let Some(rtree) = rtree {
            self.conn.execute_batch(&sql_drop_table(&rtree))?;
        }
        self.conn.execute_batch(&sql_drop_table(layer_name))?;
        for sql in SQL_DELETE_LAYER_METADATA {
            self.conn.execute(sql, [layer_name])?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub(crate) fn connection(&self) -> &rusqlite::Connection {
        &self.conn
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(GdbError::ReadOnly);
        }
        Ok(())
    }

    fn ensure_new_layer(&self, layer_name: &str) -> Result<()> {
        self.ensure_writable()?;
        if self.list_layers()?.iter().any(|name| name == layer_name) {
            return Err(GdbError::LayerAlreadyExists {
                layer_name: layer_name.to_string(),
            });
        }
        Ok(())
    }

    fn create_user_table(
        &self,
        table_name: &str,
        geometry_def: Option<String>,
        columns: &[ColumnSpec],
    ) -> Result<()> {
        let mut column_defs = Vec::with_capacity(columns.len() + 2);
        column_defs.push(format!(
            "{} INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL",
            quote_ident(PRIMARY_KEY_COLUMN)
        ));
        column_defs.extend(geometry_def);
        for spec in columns {
            column_defs.push(format!(
                "{} {}",
                quote_ident(&spec.name),
                field_type_to_str(spec.column_type)
            ));
        }
        self.conn
            .execute_batch(&sql_create_table(table_name, &column_defs.join(", ")))?;
        Ok(())
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        Ok(self.conn.query_row(SQL_TABLE_EXISTS, [name], |row| row.get(0))?)
    }

    /// Table columns in order, with the position of the single primary key.
    fn table_fields(&self, table_name: &str) -> Result<(Vec<GpkgField>, usize)> {
        let mut stmt = self.conn.prepare(SQL_TABLE_COLUMNS)?;
        let columns = stmt
            .query_map([table_name], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, i32>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut fields = Vec::with_capacity(columns.len());
        let mut primary_key_index = None;
        for (idx, (name, declared_type, not_null, pk)) in columns.into_iter().enumerate() {
            let field_type = if pk != 0 {
                if primary_key_index.replace(idx).is_some() {
                    return Err(GdbError::CompositePrimaryKeyUnsupported {
                        table: table_name.to_string(),
                    });
                }
                FieldType::ObjectId
            } else {
                field_type_from_str(&declared_type).ok_or_else(|| {
                    GdbError::UnsupportedColumnType {
                        column: name.clone(),
                        declared_type: declared_type.clone(),
                    }
                })?
            };
            fields.push(GpkgField {
                name,
                field_type,
                nullable: !not_null && pk == 0,
            });
        }

        let primary_key_index = primary_key_index.ok_or_else(|| GdbError::MissingPrimaryKeyColumn {
            table: table_name.to_string(),
        })?;
        Ok((fields, primary_key_index))
    }

    fn geometry_column_meta(
        &self,
        layer_name: &str,
    ) -> Result<(String, GeometryType, Dimension, u32)> {
        let (geometry_column, geometry_type_str, z, m, srs_id) = self.conn.query_row(
            SQL_SELECT_GEOMETRY_COLUMN_META,
            [layer_name],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i8>(2)?,
                    row.get::<_, i8>(3)?,
                    row.get::<_, u32>(4)?,
                ))
            },
        )?;

        let geometry_type = geometry_type_from_str(&geometry_type_str)?;
        let dimension = dimension_from_zm(z, m)?;
        Ok((geometry_column, geometry_type, dimension, srs_id))
    }
}
