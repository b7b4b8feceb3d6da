use crate::error::GdbError;
use crate::types::FieldType;
use wkb::reader::{Dimension, GeometryType};

#[inline]
pub(crate) fn geometry_type_to_str(geometry_type: GeometryType) -> &'static str {
    match geometry_type {
        GeometryType::Point => "POINT",
        GeometryType::LineString => "LINESTRING",
        GeometryType::Polygon => "POLYGON",
        GeometryType::MultiPoint => "MULTIPOINT",
        GeometryType::MultiLineString => "MULTILINESTRING",
        GeometryType::MultiPolygon => "MULTIPOLYGON",
        _ => "GEOMETRYCOLLECTION",
    }
}

#[inline]
pub(crate) fn geometry_type_from_str(s: &str) -> Result<GeometryType, GdbError> {
    const NAMES: [(&str, GeometryType); 8] = [
        ("GEOMETRY", GeometryType::GeometryCollection),
        ("GEOMETRYCOLLECTION", GeometryType::GeometryCollection),
        ("POINT", GeometryType::Point),
        ("LINESTRING", GeometryType::LineString),
        ("POLYGON", GeometryType::Polygon),
        ("MULTIPOINT", GeometryType::MultiPoint),
        ("MULTILINESTRING", GeometryType::MultiLineString),
        ("MULTIPOLYGON", GeometryType::MultiPolygon),
    ];
    NAMES
        .iter()
        .find(|(name, _)| s.eq_ignore_ascii_case(name))
        .map(|(_, ty)| *ty)
        .ok_or_else(|| GdbError::UnsupportedGeometryType(s.to_string()))
}

#[inline]
pub(crate) fn dimension_to_zm(dimension: Dimension) -> (i8, i8) {
    match dimension {
        Dimension::Xy => (0, 0),
        Dimension::Xyz => (1, 0),
        Dimension::Xym => (0, 1),
        Dimension::Xyzm => (1, 1),
    }
}

#[inline]
pub(crate) fn dimension_from_zm(z: i8, m: i8) -> Result<Dimension, GdbError> {
    // 2 ("optional") cannot be represented by a single Dimension.
    match (z, m) {
        (0, 0) => Ok(Dimension::Xy),
        (1, 0) => Ok(Dimension::Xyz),
        (0, 1) => Ok(Dimension::Xym),
        (1, 1) => Ok(Dimension::Xyzm),
        _ => Err(GdbError::InvalidDimension { z, m }),
    }
}

/// Declared SQLite type for a column created by this crate.
#[inline]
pub(crate) fn field_type_to_str(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::ObjectId | FieldType::Integer => "INTEGER",
        FieldType::Double => "DOUBLE",
        FieldType::Varchar => "TEXT",
        FieldType::Boolean => "BOOLEAN",
        FieldType::Date => "DATE",
        FieldType::DateTime => "DATETIME",
        FieldType::Blob => "BLOB",
        FieldType::Geometry => "GEOMETRY",
    }
}

/// Map a declared column type to a field type.
///
/// cf. https://www.geopackage.org/spec140/index.html#_sqlite_container
/// `TEXT(n)` and `BLOB(n)` carry an optional maximum length, which is ignored.
#[inline]
pub(crate) fn field_type_from_str(declared: &str) -> Option<FieldType> {
    let base = declared.split('(').next().unwrap_or(declared).trim();
    let is = |name: &str| base.eq_ignore_ascii_case(name);

    if is("TINYINT") || is("SMALLINT") || is("MEDIUMINT") || is("INT") || is("INTEGER") {
        Some(FieldType::Integer)
    } else if is("DOUBLE") || is("FLOAT") || is("REAL") {
        Some(FieldType::Double)
    } else if is("TEXT") {
        Some(FieldType::Varchar)
    } else if is("BOOLEAN") {
        Some(FieldType::Boolean)
    } else if is("DATE") {
        Some(FieldType::Date)
    } else if is("DATETIME") {
        Some(FieldType::DateTime)
    } else if is("BLOB") {
        Some(FieldType::Blob)
    } else if geometry_type_from_str(base).is_ok() {
        Some(FieldType::Geometry)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_lengths_are_ignored() {
        assert_eq!(field_type_from_str("TEXT(50)"), Some(FieldType::Varchar));
        assert_eq!(field_type_from_str("blob (16)"), Some(FieldType::Blob));
        assert_eq!(field_type_from_str("MultiPolygon"), Some(FieldType::Geometry));
        assert_eq!(field_type_from_str("VARCHAR"), None);
    }

    #[test]
    fn zm_flags_roundtrip_and_reject_optional() {
        for dim in [Dimension::Xy, Dimension::Xyz, Dimension::Xym, Dimension::Xyzm] {
            let (z, m) = dimension_to_zm(dim);
            assert_eq!(dimension_from_zm(z, m).ok(), Some(dim));
        }
        assert!(matches!(
            dimension_from_zm(2, 0),
            Err(GdbError::InvalidDimension { z: 2, m: 0 })
        ));
    }

    #[test]
    fn generic_geometry_maps_to_collection() {
        assert!(matches!(
            geometry_type_from_str("geometry"),
            Ok(GeometryType::GeometryCollection)
        ));
        assert!(matches!(
            geometry_type_from_str("CIRCULARSTRING"),
            Err(GdbError::UnsupportedGeometryType(_))
        ));
    }
}
