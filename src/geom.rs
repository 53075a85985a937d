use geo::{BooleanOps, EuclideanLength};
use geo_types::{Geometry, LineString, MultiLineString, MultiPolygon};

/// Boundary lengths below this are treated as point contact.
const LENGTH_EPSILON: f64 = 1e-9;

/// Coerce a geometry to polygonal form. Multi-geometries are flattened;
/// anything that is not an areal geometry yields `None`.
pub fn to_polygonal(geom: Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geom {
        Geometry::Polygon(poly) => Some(MultiPolygon(vec![poly])),
        Geometry::MultiPolygon(mp) => Some(mp),
        Geometry::GeometryCollection(gc) => {
            let mut polys = Vec::new();
            for part in gc {
                match part {
                    Geometry::Polygon(poly) => polys.push(poly),
                    Geometry::MultiPolygon(mp) => polys.extend(mp.0),
                    _ => return None,
                }
            }
            if polys.is_empty() {
                None
            } else {
                Some(MultiPolygon(polys))
            }
        }
        _ => None,
    }
}

/// Every ring of the multipolygon as linework.
pub fn boundary_lines(mp: &MultiPolygon<f64>) -> MultiLineString<f64> {
    let mut lines: Vec<LineString<f64>> = Vec::new();
    for poly in &mp.0 {
        lines.push(poly.exterior().clone());
        lines.extend(poly.interiors().iter().cloned());
    }
    MultiLineString::new(lines)
}

fn perimeter(mp: &MultiPolygon<f64>) -> f64 {
    boundary_lines(mp).euclidean_length()
}

/// Length of the boundary shared between two touching polygons, in CRS units.
///
/// The shared linework appears in both perimeters but only once in the
/// perimeter of the union. Point contact yields 0, as does a computation
/// that fails to produce a finite value.
pub fn shared_boundary_length(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> f64 {
    let merged = a.union(b);
    let shared = (perimeter(a) + perimeter(b) - perimeter(&merged)) / 2.0;
    if shared.is_finite() && shared > LENGTH_EPSILON {
        shared
    } else {
        0.0
    }
}
