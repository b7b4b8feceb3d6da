use geo_traits::{
    CoordTrait, GeometryCollectionTrait, GeometryTrait, GeometryType, LineStringTrait,
    MultiLineStringTrait, MultiPointTrait, MultiPolygonTrait, PointTrait, PolygonTrait,
};

/// Axis-aligned 2D bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    /// Build an envelope from two corners in any order.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
        }
    }

    /// Bounds of all coordinates of `geometry`, `None` if it is empty.
    pub fn of_geometry<G: GeometryTrait<T = f64>>(geometry: &G) -> Option<Self> {
        let mut envelope = None;
        extend_with_geometry(&mut envelope, geometry);
        envelope
    }

    fn expand(envelope: &mut Option<Envelope>, x: f64, y: f64) {
        match envelope {
            Some(e) => {
                e.min_x = e.min_x.min(x);
                e.min_y = e.min_y.min(y);
                e.max_x = e.max_x.max(x);
                e.max_y = e.max_y.max(y);
            }
            None => *envelope = Some(Envelope::new(x, y, x, y)),
        }
    }
}

fn extend_with_coords<C, I>(envelope: &mut Option<Envelope>, coords: I)
where
    C: CoordTrait<T = f64>,
    I: IntoIterator<Item = C>,
{
    for coord in coords {
        let (x, y) = coord.x_y();
        Envelope::expand(envelope, x, y);
    }
}

fn extend_with_polygon<P: PolygonTrait<T = f64>>(envelope: &mut Option<Envelope>, polygon: &P) {
    // Interior rings lie inside the exterior one.
    if let Some(ring) = polygon.exterior() {
        extend_with_coords(envelope, ring.coords());
    }
}

fn extend_with_geometry<G: GeometryTrait<T = f64>>(envelope: &mut Option<Envelope>, geometry: &G) {
    match geometry.as_type() {
        GeometryType::Point(point) => extend_with_coords(envelope, point.coord()),
        GeometryType::LineString(line) => extend_with_coords(envelope, line.coords()),
        GeometryType::Polygon(polygon) => extend_with_polygon(envelope, polygon),
        GeometryType::MultiPoint(multi) => {
            for point in multi.points() {
                extend_with_coords(envelope, point.coord());
            }
        }
        GeometryType::MultiLineString(multi) => {
            for line in multi.line_strings() {
                extend_with_coords(envelope, line.coords());
            }
        }
        GeometryType::MultiPolygon(multi) => {
            for polygon in multi.polygons() {
                extend_with_polygon(envelope, &polygon);
            }
        }
        GeometryType::GeometryCollection(collection) => {
            for child in collection.geometries() {
                extend_with_geometry(envelope, &child);
            }
        }
        // Not representable in WKB, so never stored in a GeoPackage.
        GeometryType::Rect(_) | GeometryType::Triangle(_) | GeometryType::Line(_) => {}
    }
}
