//! Geometry helpers shared by the built-in operations.

use geo::{
    unary_union, Area, Centroid, Euclidean, Geometry, Intersects, Length, LineString,
    MultiLineString, MultiPolygon, Point,
};

use geocad_types::FeatureCollection;

/// Polygonal part of a geometry, or `None` for points and lines.
pub fn polygonal(geometry: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
        Geometry::MultiPolygon(mp) => Some(mp.clone()),
        Geometry::Rect(r) => Some(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::Triangle(t) => Some(MultiPolygon::new(vec![t.to_polygon()])),
        Geometry::GeometryCollection(gc) => {
            let polys: Vec<_> = gc
                .iter()
                .filter_map(polygonal)
                .flat_map(|mp| mp.0)
                .collect();
            (!polys.is_empty()).then(|| MultiPolygon::new(polys))
        }
        _ => None,
    }
}

/// Linear part of a geometry, or `None` for points and polygons.
pub fn linear(geometry: &Geometry<f64>) -> Option<MultiLineString<f64>> {
    match geometry {
        Geometry::Line(l) => Some(MultiLineString::new(vec![LineString::new(vec![
            l.start, l.end,
        ])])),
        Geometry::LineString(ls) => Some(MultiLineString::new(vec![ls.clone()])),
        Geometry::MultiLineString(mls) => Some(mls.clone()),
        _ => None,
    }
}

/// Point members of a geometry, or `None` for lines and polygons.
pub fn points(geometry: &Geometry<f64>) -> Option<Vec<Point<f64>>> {
    match geometry {
        Geometry::Point(p) => Some(vec![*p]),
        Geometry::MultiPoint(mp) => Some(mp.0.clone()),
        _ => None,
    }
}

/// Union of a sequence of multipolygons in a single sweep.
pub fn union_all<'a>(parts: impl IntoIterator<Item = &'a MultiPolygon<f64>>) -> MultiPolygon<f64> {
    unary_union(parts)
}

/// Union of every polygonal geometry across the given collections. Points and
/// lines contribute no area.
pub fn footprint<'a>(collections: impl IntoIterator<Item = &'a FeatureCollection>) -> MultiPolygon<f64> {
    let parts: Vec<MultiPolygon<f64>> = collections
        .into_iter()
        .flat_map(|fc| fc.geometries())
        .filter_map(polygonal)
        .collect();
    union_all(&parts)
}

pub fn area(geometry: &Geometry<f64>) -> f64 {
    geometry.unsigned_area()
}

/// Planar perimeter: total ring length for polygons, total length for lines,
/// zero for points.
pub fn perimeter(geometry: &Geometry<f64>) -> f64 {
    if let Some(mp) = polygonal(geometry) {
        return mp
            .iter()
            .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
            .map(|ring| Euclidean.length(ring))
            .sum();
    }
    if let Some(mls) = linear(geometry) {
        return Euclidean.length(&mls);
    }
    0.0
}

pub fn centroid(geometry: &Geometry<f64>) -> Option<Point<f64>> {
    geometry.centroid()
}

/// Whether `point` lies inside the polygonal `area` or on its boundary.
pub fn covers_point(area: &MultiPolygon<f64>, point: &Point<f64>) -> bool {
    area.intersects(point)
}

/// Geometry type name as used by `$type` and `geometry_types`.
pub fn geometry_type_name(geometry: &Geometry<f64>) -> &'static str {
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

/// `true` for a collection result that carries no geometry.
pub fn is_empty_multipolygon(mp: &MultiPolygon<f64>) -> bool {
    mp.0.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon, Rect};
    use geocad_types::Feature;

    fn square(x: f64, y: f64, size: f64) -> geo::Polygon<f64> {
        polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
            (x: x, y: y),
        ]
    }

    #[test]
    fn polygonal_parts() {
        assert!(polygonal(&Geometry::Polygon(square(0.0, 0.0, 1.0))).is_some());
        let rect = Rect::new((0.0, 0.0), (2.0, 2.0));
        assert_eq!(area(&Geometry::MultiPolygon(polygonal(&Geometry::Rect(rect)).unwrap())), 4.0);
        assert!(polygonal(&Geometry::Point(point!(x: 1.0, y: 1.0))).is_none());
    }

    #[test]
    fn perimeter_of_square_and_line() {
        let sq = Geometry::Polygon(square(0.0, 0.0, 2.0));
        assert!((perimeter(&sq) - 8.0).abs() < 1e-9);
        let ls = Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 3.0, y: 4.0)]);
        assert!((perimeter(&ls) - 5.0).abs() < 1e-9);
        assert_eq!(perimeter(&Geometry::Point(point!(x: 0.0, y: 0.0))), 0.0);
    }

    #[test]
    fn perimeter_counts_interior_rings() {
        let holed = geo::Polygon::new(
            square(0.0, 0.0, 10.0).exterior().clone(),
            vec![square(2.0, 2.0, 2.0).exterior().clone()],
        );
        assert!((perimeter(&Geometry::Polygon(holed)) - 48.0).abs() < 1e-9);
        let mls = Geometry::MultiLineString(MultiLineString::new(vec![
            line_string![(x: 0.0, y: 0.0), (x: 3.0, y: 4.0)],
            line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 2.0)],
        ]));
        assert!((perimeter(&mls) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn union_all_merges_many_parts() {
        let parts: Vec<MultiPolygon<f64>> = (0..5)
            .map(|i| MultiPolygon::new(vec![square(i as f64, 0.0, 2.0)]))
            .collect();
        let merged = union_all(&parts);
        assert_eq!(merged.0.len(), 1);
        assert!((merged.unsigned_area() - 12.0).abs() < 1e-6);

        let disjoint = vec![
            MultiPolygon::new(vec![square(0.0, 0.0, 1.0)]),
            MultiPolygon::new(vec![square(5.0, 5.0, 1.0)]),
        ];
        assert_eq!(union_all(&disjoint).0.len(), 2);
    }

    #[test]
    fn footprint_unions_overlapping_polygons() {
        let fc = FeatureCollection::from_features(vec![
            Feature::new(square(0.0, 0.0, 2.0)),
            Feature::new(square(1.0, 0.0, 2.0)),
            Feature::new(point!(x: 10.0, y: 10.0)),
        ]);
        let fp = footprint([&fc]);
        assert!((fp.unsigned_area() - 6.0).abs() < 1e-6);
    }

    #[test]
    fn footprint_of_nothing_is_empty() {
        let fp = footprint(std::iter::empty::<&FeatureCollection>());
        assert!(is_empty_multipolygon(&fp));
    }

    #[test]
    fn point_coverage() {
        let mp = MultiPolygon::new(vec![square(0.0, 0.0, 2.0)]);
        assert!(covers_point(&mp, &point!(x: 1.0, y: 1.0)));
        assert!(!covers_point(&mp, &point!(x: 5.0, y: 1.0)));
        assert!(covers_point(&mp, &point!(x: 2.0, y: 1.0)));
        assert!(covers_point(&mp, &point!(x: 0.0, y: 0.0)));
    }

    #[test]
    fn type_names() {
        assert_eq!(geometry_type_name(&Geometry::Polygon(square(0.0, 0.0, 1.0))), "Polygon");
        assert_eq!(geometry_type_name(&Geometry::Point(point!(x: 0.0, y: 0.0))), "Point");
    }
}
