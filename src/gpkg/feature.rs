use crate::envelope::Envelope;
use crate::error::{GdbError, Result};
use crate::provider::{FieldDef, Row};
use crate::types::{ContainerKind, FieldType};
use crate::value::Value;
use geo_traits::GeometryTrait;
use std::collections::HashMap;
use std::sync::Arc;
use wkb::reader::{Dimension, GeometryType, Wkb};

/// A column of a GeoPackage table.
#[derive(Clone, Debug, PartialEq)]
pub struct GpkgField {
    pub(crate) name: String,
    pub(crate) field_type: FieldType,
    pub(crate) nullable: bool,
}

impl FieldDef for GpkgField {
    fn name(&self) -> &str {
        &self.name
    }

    fn field_type(&self) -> FieldType {
        self.field_type
    }

    fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// Geometry column metadata from `gpkg_geometry_columns`.
#[derive(Clone, Debug)]
pub struct GeometryColumn {
    pub name: String,
    pub geometry_type: GeometryType,
    pub dimension: Dimension,
    pub srs_id: u32,
    pub(crate) index: usize,
    pub(crate) has_spatial_index: bool,
}

/// Schema shared by a layer and every row read from it.
#[derive(Debug)]
pub(crate) struct TableSchema {
    pub(crate) table_name: String,
    pub(crate) fields: Vec<GpkgField>,
    pub(crate) primary_key_index: usize,
    pub(crate) geometry: Option<GeometryColumn>,
    index_by_name: HashMap<String, usize>,
}

impl TableSchema {
    pub(crate) fn new(
        table_name: String,
        fields: Vec<GpkgField>,
        primary_key_index: usize,
        geometry: Option<GeometryColumn>,
    ) -> Self {
        let index_by_name = fields
            .iter()
            .enumerate()
            .map(|(idx, field)| (field.name.clone(), idx))
            .collect();
        Self {
            table_name,
            fields,
            primary_key_index,
            geometry,
            index_by_name,
        }
    }

    pub(crate) fn kind(&self) -> ContainerKind {
        if self.geometry.is_some() {
            ContainerKind::FeatureClass
        } else {
            ContainerKind::Table
        }
    }

    pub(crate) fn primary_key_column(&self) -> &str {
        &self.fields[self.primary_key_index].name
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.index_by_name.get(name).copied()
    }

    pub(crate) fn require_geometry(&self) -> Result<&GeometryColumn> {
        self.geometry
            .as_ref()
            .ok_or_else(|| GdbError::MissingGeometryColumn {
                table: self.table_name.clone(),
            })
    }

    /// Indices of every column except the primary key, in table order.
    pub(crate) fn writable_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.fields.len()).filter(move |idx| *idx != self.primary_key_index)
    }
}

/// A row of a GeoPackage feature or attribute table.
///
/// Fields cover every column in table order, including the primary key and
/// the geometry column. Edits stay in memory until passed to
/// [`crate::GpkgLayer::store`].
#[derive(Clone, Debug)]
pub struct GpkgRow {
    pub(crate) schema: Arc<TableSchema>,
    pub(crate) id: i64,
    pub(crate) values: Vec<Value>,
}

impl GpkgRow {
    /// Primary key of the row as it was read.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Decode the geometry column into WKB. `None` for a null geometry.
    pub fn geometry(&self) -> Result<Option<Wkb<'_>>> {
        let column = self.schema.require_geometry()?;
        match &self.values[column.index] {
            Value::Null => Ok(None),
            Value::Geometry(bytes) | Value::Blob(bytes) => Ok(Some(gpkg_geometry_to_wkb(bytes)?)),
            other => Err(GdbError::ValueTypeMismatch {
                expected: "geometry",
                actual: other.type_name(),
            }),
        }
    }

    /// Replace the geometry, encoded with the layer's SRS.
    pub fn set_geometry<G: GeometryTrait<T = f64>>(&mut self, geometry: G) -> Result<()> {
        let column = self.schema.require_geometry()?;
        let blob = geometry_to_gpkg_blob(geometry, column.srs_id)?;
        self.values[column.index] = Value::Geometry(blob);
        Ok(())
    }
}

impl Row for GpkgRow {
    type Field = GpkgField;

    fn fields(&self) -> &[GpkgField] {
        &self.schema.fields
    }

    fn find_field(&self, name: &str) -> Option<usize> {
        self.schema.index_of(name)
    }

    fn value_at(&self, index: usize) -> Result<Value> {
        self.values
            .get(index)
            .cloned()
            .ok_or(GdbError::Sql(rusqlite::Error::InvalidColumnIndex(index)))
    }

    fn set_value_at(&mut self, index: usize, value: Value) -> Result<()> {
        let slot = self
            .values
            .get_mut(index)
            .ok_or(GdbError::Sql(rusqlite::Error::InvalidColumnIndex(index)))?;
        *slot = value;
        Ok(())
    }

    fn table_name(&self) -> &str {
        &self.schema.table_name
    }

    fn table_kind(&self) -> ContainerKind {
        self.schema.kind()
    }
}

// cf. https://www.geopackage.org/spec140/index.html#gpb_format
const GPKG_HEADER_LEN: usize = 8;
const FLAG_LITTLE_ENDIAN: u8 = 0b0000_0001;
const FLAG_ENVELOPE_XY: u8 = 0b0000_0010;
const FLAG_EMPTY: u8 = 0b0001_0000;

/// Strip the GeoPackage header and envelope to access the raw WKB.
pub(crate) fn gpkg_geometry_to_wkb(b: &[u8]) -> Result<Wkb<'_>> {
    if b.len() < GPKG_HEADER_LEN {
        return Err(GdbError::InvalidGpkgGeometryLength {
            len: b.len(),
            minimum: GPKG_HEADER_LEN,
        });
    }
    let flags = b[3];
    let envelope_size: usize = match (flags >> 1) & 0b111 {
        0 => 0,      // no envelope
        1 => 32,     // [minx, maxx, miny, maxy]
        2 | 3 => 48, // plus [minz, maxz] or [minm, maxm]
        4 => 64,     // plus both
        _ => return Err(GdbError::InvalidGpkgGeometryFlags(flags)),
    };
    let offset = GPKG_HEADER_LEN + envelope_size;
    if b.len() < offset {
        return Err(GdbError::InvalidGpkgGeometryLength {
            len: b.len(),
            minimum: offset,
        });
    }

    Ok(Wkb::try_new(&b[offset..])?)
}

/// Encode a geometry as a GeoPackage blob with a little endian header and,
/// unless the geometry is empty, an XY envelope.
pub(crate) fn geometry_to_gpkg_blob<G: GeometryTrait<T = f64>>(
    geometry: G,
    srs_id: u32,
) -> Result<Vec<u8>> {
    let mut wkb = Vec::new();
    wkb::writer::write_geometry(&mut wkb, &geometry, &Default::default())?;
    let envelope = Envelope::of_geometry(&geometry);

    let mut flags = FLAG_LITTLE_ENDIAN;
    flags |= match envelope {
        Some(_) => FLAG_ENVELOPE_XY,
        None => FLAG_EMPTY,
    };

    let mut blob = Vec::with_capacity(GPKG_HEADER_LEN + 32 + wkb.len());
    blob.extend_from_slice(&[b'G', b'P', 0x00, flags]);
    blob.extend_from_slice(&srs_id.to_le_bytes());
    if let Some(e) = envelope {
        for v in [e.min_x, e.max_x, e.min_y, e.max_y] {
            blob.extend_from_slice(&v.to_le_bytes());
        }
    }
    blob.extend_from_slice(&wkb);
    Ok(blob)
}

#[cfg(test)]
mod tests {
    use super::{gpkg_geometry_to_wkb, geometry_to_gpkg_blob};
    use crate::Result;
    use crate::error::GdbError;
    use geo_types::{LineString, Point};

    #[test]
    fn blob_carries_envelope_and_decodes_back() -> Result<()> {
        let point = Point::new(3.0, -1.0);
        let mut expected = Vec::new();
        wkb::writer::write_geometry(&mut expected, &point, &Default::default())?;

        let blob = geometry_to_gpkg_blob(point, 4326)?;
        assert_eq!(&blob[0..4], &[b'G', b'P', 0x00, 0b0000_0011]);
        assert_eq!(u32::from_le_bytes([blob[4], blob[5], blob[6], blob[7]]), 4326);
        assert_eq!(blob.len(), 8 + 32 + expected.len());

        let recovered = gpkg_geometry_to_wkb(&blob)?;
        assert_eq!(recovered.buf(), expected.as_slice());
        Ok(())
    }

    #[test]
    fn empty_geometry_is_flagged() -> Result<()> {
        let line: LineString<f64> = LineString::new(Vec::new());
        let blob = geometry_to_gpkg_blob(line, 0)?;
        assert_eq!(blob[3], 0b0001_0001);
        gpkg_geometry_to_wkb(&blob)?;
        Ok(())
    }

    #[test]
    fn rejects_invalid_flags() {
        let mut blob = vec![b'G', b'P', 0x00, 0x0A, 0, 0, 0, 0];
        blob.extend_from_slice(&[0; 16]);
        assert!(matches!(
            gpkg_geometry_to_wkb(&blob),
            Err(GdbError::InvalidGpkgGeometryFlags(0x0A))
        ));
    }

    #[test]
    fn rejects_truncated_blobs() {
        assert!(matches!(
            gpkg_geometry_to_wkb(&[b'G', b'P', 0x00]),
            Err(GdbError::InvalidGpkgGeometryLength { len: 3, minimum: 8 })
        ));
        let blob = vec![b'G', b'P', 0x00, 0b0000_0011, 0, 0, 0, 0, 1, 2];
        assert!(matches!(
            gpkg_geometry_to_wkb(&blob),
            Err(GdbError::InvalidGpkgGeometryLength { len: 10, minimum: 40 })
        ));
    }
}
