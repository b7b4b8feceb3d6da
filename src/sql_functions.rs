use crate::envelope::Envelope;
use crate::error::Result;
use crate::gpkg::gpkg_geometry_to_wkb;
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::{Type, ValueRef};
use rusqlite::{Connection, Error};

/// Register the spatial SQL functions the GeoPackage R-tree triggers rely on:
/// `ST_MinX`, `ST_MinY`, `ST_MaxX`, `ST_MaxY` and `ST_IsEmpty`.
///
/// Every [`crate::Gpkg`] registers them on open; call this only for
/// connections you open yourself.
///
/// ```no_run
/// use rusqlite::Connection;
/// use gdb_ext::register_spatial_functions;
///
/// let conn = Connection::open_in_memory()?;
/// register_spatial_functions(&conn)?;
/// # Ok::<(), gdb_ext::GdbError>(())
/// ```
pub fn register_spatial_functions(conn: &Connection) -> Result<()> {
    let components: [(&str, fn(&Envelope) -> f64); 4] = [
        ("ST_MinX", |e| e.min_x),
        ("ST_MinY", |e| e.min_y),
        ("ST_MaxX", |e| e.max_x),
        ("ST_MaxY", |e| e.max_y),
    ];
    for (name, component) in components {
        conn.create_scalar_function(name, 1, FunctionFlags::SQLITE_DETERMINISTIC, move |ctx| {
            Ok(envelope_from_ctx(ctx)?.flatten().map(|e| component(&e)))
        })?;
    }

    conn.create_scalar_function(
        "ST_IsEmpty",
        1,
        FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            Ok(envelope_from_ctx(ctx)?.map(|envelope| i64::from(envelope.is_none())))
        },
    )?;
    Ok(())
}

// Outer `None`: the argument is NULL. Inner `None`: the geometry is empty.
fn envelope_from_ctx(ctx: &Context<'_>) -> std::result::Result<Option<Option<Envelope>>, Error> {
    match ctx.get_raw(0) {
        ValueRef::Null => Ok(None),
        ValueRef::Blob(blob) => {
            let wkb =
                gpkg_geometry_to_wkb(blob).map_err(|err| Error::UserFunctionError(Box::new(err)))?;
            Ok(Some(Envelope::of_geometry(&wkb)))
        }
        _ => Err(Error::InvalidFunctionParameterType(0, Type::Blob)),
    }
}

#[cfg(test)]
mod tests {
    use super::register_spatial_functions;
    use crate::gpkg::geometry_to_gpkg_blob;
    use geo_types::{Geometry, GeometryCollection, LineString, MultiPoint, Point};
    use rusqlite::{Connection, params};

    fn bounds(conn: &Connection, blob: &[u8]) -> crate::Result<(f64, f64, f64, f64)> {
        Ok(conn.query_row(
            "SELECT ST_MinX(?1), ST_MaxX(?1), ST_MinY(?1), ST_MaxY(?1)",
            params![blob],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?)
    }

    #[test]
    fn bounds_of_point() -> crate::Result<()> {
        let conn = Connection::open_in_memory()?;
        register_spatial_functions(&conn)?;

        let blob = geometry_to_gpkg_blob(Point::new(1.5, -2.0), 4326)?;
        assert_eq!(bounds(&conn, &blob)?, (1.5, 1.5, -2.0, -2.0));

        let empty: i64 =
            conn.query_row("SELECT ST_IsEmpty(?1)", params![blob], |row| row.get(0))?;
        assert_eq!(empty, 0);
        Ok(())
    }

    #[test]
    fn bounds_of_multipoint_and_collection() -> crate::Result<()> {
        let conn = Connection::open_in_memory()?;
        register_spatial_functions(&conn)?;

        let mp = MultiPoint::from(vec![Point::new(1.0, 5.0), Point::new(-2.0, 3.0)]);
        let blob = geometry_to_gpkg_blob(mp, 4326)?;
        assert_eq!(bounds(&conn, &blob)?, (-2.0, 1.0, 3.0, 5.0));

        let collection = GeometryCollection::from(vec![
            Geometry::Point(Point::new(5.0, -1.0)),
            Geometry::LineString(LineString::from(vec![(-2.0, 2.0), (1.0, 3.0)])),
        ]);
        let blob = geometry_to_gpkg_blob(collection, 4326)?;
        assert_eq!(bounds(&conn, &blob)?, (-2.0, 5.0, -1.0, 3.0));
        Ok(())
    }

    #[test]
    fn empty_geometry_has_null_bounds() -> crate::Result<()> {
        let conn = Connection::open_in_memory()?;
        register_spatial_functions(&conn)?;

        let line: LineString<f64> = LineString::new(Vec::new());
        let blob = geometry_to_gpkg_blob(line, 4326)?;

        let (minx, empty): (Option<f64>, i64) =
            conn.query_row("SELECT ST_MinX(?1), ST_IsEmpty(?1)", params![blob], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;
        assert!(minx.is_none());
        assert_eq!(empty, 1);
        Ok(())
    }

    #[test]
    fn null_argument_gives_null() -> crate::Result<()> {
        let conn = Connection::open_in_memory()?;
        register_spatial_functions(&conn)?;

        let (minx, empty): (Option<f64>, Option<i64>) =
            conn.query_row("SELECT ST_MinX(NULL), ST_IsEmpty(NULL)", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;
        assert!(minx.is_none());
        assert!(empty.is_none());
        Ok(())
    }
}
