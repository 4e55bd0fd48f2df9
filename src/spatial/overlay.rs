//! Client-side geometric overlay
//!
//! Intersection of arbitrary row geometries with a polygonal clip region,
//! keeping the dimension of the input (polygons stay polygons, lines stay
//! lines, points stay points). Empty results are dropped.

use geo::{Area, BooleanOps, Intersects};
use geo_types::{
    Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point,
};

/// Polygonal view of a geometry, if it has one
pub fn to_multi_polygon(geometry: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
        Geometry::MultiPolygon(mp) => Some(mp.clone()),
        Geometry::Rect(r) => Some(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::Triangle(t) => Some(MultiPolygon::new(vec![t.to_polygon()])),
        Geometry::GeometryCollection(gc) if !gc.0.is_empty() => {
            let mut polygons = Vec::new();
            for member in &gc.0 {
                polygons.extend(to_multi_polygon(member)?.0);
            }
            Some(MultiPolygon::new(polygons))
        }
        _ => None,
    }
}

/// Name of the geometry kind, for error messages
pub fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Intersect `geometry` with `clip`; `None` when nothing overlaps
pub fn intersect(geometry: &Geometry<f64>, clip: &MultiPolygon<f64>) -> Option<Geometry<f64>> {
    match geometry {
        Geometry::Point(p) => clip.intersects(p).then_some(Geometry::Point(*p)),
        Geometry::MultiPoint(mp) => {
            let kept: Vec<Point<f64>> = mp.0.iter().filter(|p| clip.intersects(*p)).copied().collect();
            match kept.len() {
                0 => None,
                1 => Some(Geometry::Point(kept[0])),
                _ => Some(Geometry::MultiPoint(MultiPoint::new(kept))),
            }
        }
        Geometry::Line(l) => clip_lines(
            &MultiLineString::new(vec![LineString::new(vec![l.start, l.end])]),
            clip,
        ),
        Geometry::LineString(ls) => clip_lines(&MultiLineString::new(vec![ls.clone()]), clip),
        Geometry::MultiLineString(mls) => clip_lines(mls, clip),
        Geometry::GeometryCollection(gc) => {
            let parts: Vec<Geometry<f64>> =
                gc.0.iter().filter_map(|g| intersect(g, clip)).collect();
            (!parts.is_empty()).then(|| Geometry::GeometryCollection(GeometryCollection(parts)))
        }
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => {
            let polygons = to_multi_polygon(geometry)?;
            polygonal_result(polygons.intersection(clip))
        }
    }
}

fn clip_lines(lines: &MultiLineString<f64>, clip: &MultiPolygon<f64>) -> Option<Geometry<f64>> {
    let mut clipped = clip.clip(lines, false);
    clipped.0.retain(|ls| ls.0.len() > 1);
    match clipped.0.len() {
        0 => None,
        1 => clipped.0.pop().map(Geometry::LineString),
        _ => Some(Geometry::MultiLineString(clipped)),
    }
}

fn polygonal_result(mut result: MultiPolygon<f64>) -> Option<Geometry<f64>> {
    result.0.retain(|p| p.unsigned_area() > 0.0);
    match result.0.len() {
        0 => None,
        1 => result.0.pop().map(Geometry::Polygon),
        _ => Some(Geometry::MultiPolygon(result)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{line_string, point, polygon};

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]])
    }

    #[test]
    fn test_polygon_clipped_to_overlap() {
        let row: Geometry<f64> = square(5.0, 5.0, 10.0).into();
        let out = intersect(&row, &square(0.0, 0.0, 10.0)).unwrap();
        match out {
            Geometry::Polygon(p) => assert!((p.unsigned_area() - 25.0).abs() < 1e-9),
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_disjoint_polygon_is_none() {
        let row: Geometry<f64> = square(20.0, 20.0, 1.0).into();
        assert!(intersect(&row, &square(0.0, 0.0, 10.0)).is_none());
    }

    #[test]
    fn test_line_is_clipped() {
        let row: Geometry<f64> = line_string![(x: -5.0, y: 5.0), (x: 15.0, y: 5.0)].into();
        match intersect(&row, &square(0.0, 0.0, 10.0)).unwrap() {
            Geometry::LineString(ls) => {
                let xs: Vec<f64> = ls.0.iter().map(|c| c.x).collect();
                assert!(xs.iter().all(|x| (0.0..=10.0).contains(x)));
            }
            other => panic!("expected line string, got {:?}", other),
        }
    }

    #[test]
    fn test_points_filtered() {
        let inside: Geometry<f64> = point!(x: 1.0, y: 1.0).into();
        let outside: Geometry<f64> = point!(x: 11.0, y: 1.0).into();
        let clip = square(0.0, 0.0, 10.0);
        assert_eq!(intersect(&inside, &clip), Some(inside.clone()));
        assert!(intersect(&outside, &clip).is_none());
    }

    #[test]
    fn test_to_multi_polygon_rejects_lines() {
        let line: Geometry<f64> = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)].into();
        assert!(to_multi_polygon(&line).is_none());
        assert_eq!(geometry_kind(&line), "LineString");
    }
}
