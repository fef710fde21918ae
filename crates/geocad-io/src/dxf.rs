//! ASCII DXF (R12) writer.
//!
//! The drawing carries a HEADER (version and extents), a TABLES section with
//! one LTYPE entry per linetype in use and one LAYER entry per exported layer,
//! and an ENTITIES section:
//!
//! - points become `POINT`
//! - line strings and polygon rings become `POLYLINE` / `VERTEX` / `SEQEND`
//!   (rings with the closed flag set)
//! - labels become `TEXT` anchored at the feature centroid

use std::collections::HashSet;
use std::fmt::Display;
use std::path::Path;

use geo::BoundingRect;
use geo_types::{Coord, Geometry, LineString, Polygon};

use geocad_config::{LabelingConfig, ResolvedStyle};
use geocad_pipeline::geometry::centroid;
use geocad_types::{FeatureCollection, Result};

use crate::write_atomic;

/// One exported layer: published features plus the resolved drawing style.
#[derive(Debug, Clone)]
pub struct DxfLayer<'a> {
    pub name: &'a str,
    pub style: ResolvedStyle,
    pub labeling: Option<&'a LabelingConfig>,
    pub features: &'a FeatureCollection,
}

/// Collects layers and renders them as one DXF document.
#[derive(Debug, Default)]
pub struct DxfWriter<'a> {
    layers: Vec<DxfLayer<'a>>,
}

impl<'a> DxfWriter<'a> {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Layers are drawn in the order they are added.
    pub fn add_layer(&mut self, layer: DxfLayer<'a>) {
        self.layers.push(layer);
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// R12 names of the added layers, in order. Names that sanitize to an
    /// already used name get a `_2`, `_3`, ... suffix.
    pub fn drawing_names(&self) -> Vec<String> {
        let mut used: HashSet<String> = HashSet::new();
        let mut names = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let base = layer_name(layer.name);
            let mut name = base.clone();
            let mut n = 2;
            while used.contains(&name) {
                name = format!("{base}_{n}");
                n += 1;
            }
            if name != base {
                tracing::warn!(layer = %layer.name, dxf_layer = %name, "DXF layer name already in use; renamed");
            }
            used.insert(name.clone());
            names.push(name);
        }
        names
    }

    pub fn render(&self) -> String {
        let names = self.drawing_names();
        let mut doc = Document::default();
        self.header(&mut doc);
        self.tables(&mut doc, &names);
        self.entities(&mut doc, &names);
        doc.pair(0, "EOF");
        doc.out
    }

    /// Render and atomically write the drawing to `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        let text = self.render();
        write_atomic(path, text.as_bytes())?;
        tracing::info!(path = %path.display(), layers = self.layers.len(), "DXF written");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Sections
    // -----------------------------------------------------------------------

    fn header(&self, doc: &mut Document) {
        doc.begin_section("HEADER");
        doc.pair(9, "$ACADVER");
        doc.pair(1, "AC1009");
        if let Some((min, max)) = self.extents() {
            doc.pair(9, "$EXTMIN");
            doc.point(10, min.x, min.y);
            doc.pair(9, "$EXTMAX");
            doc.point(10, max.x, max.y);
        }
        doc.end_section();
    }

    fn tables(&self, doc: &mut Document, names: &[String]) {
        doc.begin_section("TABLES");

        let mut linetypes: Vec<&str> = vec!["CONTINUOUS"];
        for layer in &self.layers {
            if !linetypes.contains(&layer.style.linetype.as_str()) {
                linetypes.push(&layer.style.linetype);
            }
        }
        doc.pair(0, "TABLE");
        doc.pair(2, "LTYPE");
        doc.pair(70, linetypes.len());
        for name in linetypes {
            let (description, pattern) = linetype_pattern(name).unwrap_or_else(|| {
                tracing::warn!(linetype = %name, "Unknown linetype drawn as continuous");
                ("", &[] as &[f64])
            });
            doc.pair(0, "LTYPE");
            doc.pair(2, name);
            doc.pair(70, 0);
            doc.pair(3, description);
            doc.pair(72, 65);
            doc.pair(73, pattern.len());
            doc.real(40, pattern.iter().map(|d| d.abs()).sum());
            for element in pattern {
                doc.real(49, *element);
            }
        }
        doc.pair(0, "ENDTAB");

        doc.pair(0, "TABLE");
        doc.pair(2, "LAYER");
        doc.pair(70, self.layers.len());
        for (layer, name) in self.layers.iter().zip(names) {
            doc.pair(0, "LAYER");
            doc.pair(2, name);
            doc.pair(70, 0);
            doc.pair(62, layer.style.color);
            doc.pair(6, &layer.style.linetype);
        }
        doc.pair(0, "ENDTAB");

        doc.end_section();
    }

    fn entities(&self, doc: &mut Document, names: &[String]) {
        doc.begin_section("ENTITIES");
        for (layer, name) in self.layers.iter().zip(names) {
            let before = doc.entities;
            for feature in layer.features {
                doc.geometry(name, &feature.geometry);
            }
            if let Some(labeling) = layer.labeling {
                let height = labeling.height.unwrap_or(layer.style.text_height);
                for feature in layer.features {
                    let text = feature.attribute_text(&labeling.attribute);
                    if text.trim().is_empty() {
                        continue;
                    }
                    if let Some(anchor) = centroid(&feature.geometry) {
                        doc.text(name, anchor.x(), anchor.y(), height, &text);
                    }
                }
            }
            tracing::debug!(layer = %layer.name, entities = doc.entities - before, "DXF layer drawn");
        }
        doc.end_section();
    }

    fn extents(&self) -> Option<(Coord<f64>, Coord<f64>)> {
        let mut bounds: Option<(Coord<f64>, Coord<f64>)> = None;
        let rects = self
            .layers
            .iter()
            .flat_map(|l| l.features.iter())
            .filter_map(|f| f.geometry.bounding_rect());
        for rect in rects {
            let (min, max) = (rect.min(), rect.max());
            bounds = Some(match bounds {
                None => (min, max),
                Some((lo, hi)) => (
                    Coord { x: lo.x.min(min.x), y: lo.y.min(min.y) },
                    Coord { x: hi.x.max(max.x), y: hi.y.max(max.y) },
                ),
            });
        }
        bounds
    }
}

/// Standard linetypes: name, description, dash pattern in drawing units
/// (negative values are gaps).
const LINETYPES: &[(&str, &str, &[f64])] = &[
    ("CONTINUOUS", "Solid line", &[]),
    ("DASHED", "Dashed __ __ __", &[12.7, -6.35]),
    ("HIDDEN", "Hidden _ _ _", &[6.35, -3.175]),
    ("CENTER", "Center ____ _ ____", &[31.75, -6.35, 6.35, -6.35]),
    ("DASHDOT", "Dash dot __ . __", &[12.7, -6.35, 0.0, -6.35]),
    ("DOT", "Dot . . .", &[0.0, -6.35]),
];

fn linetype_pattern(name: &str) -> Option<(&'static str, &'static [f64])> {
    let name = if name == "DOTTED" { "DOT" } else { name };
    LINETYPES
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|(_, description, pattern)| (*description, *pattern))
}

/// R12 layer names: upper case letters, digits, `$`, `-` and `_`.
fn layer_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() => c.to_ascii_uppercase(),
            '$' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Group code output
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Document {
    out: String,
    entities: usize,
}

impl Document {
    fn pair(&mut self, code: u16, value: impl Display) {
        self.out.push_str(&format!("{code:>3}\n{value}\n"));
    }

    fn real(&mut self, code: u16, value: f64) {
        self.pair(code, format_args!("{value:.6}"));
    }

    fn point(&mut self, code: u16, x: f64, y: f64) {
        self.real(code, x);
        self.real(code + 10, y);
        self.real(code + 20, 0.0);
    }

    fn begin_section(&mut self, name: &str) {
        self.pair(0, "SECTION");
        self.pair(2, name);
    }

    fn end_section(&mut self) {
        self.pair(0, "ENDSEC");
    }

    fn geometry(&mut self, layer: &str, geometry: &Geometry<f64>) {
        match geometry {
            Geometry::Point(p) => self.point_entity(layer, p.x(), p.y()),
            Geometry::MultiPoint(mp) => {
                for p in mp.iter() {
                    self.point_entity(layer, p.x(), p.y());
                }
            }
            Geometry::Line(line) => self.polyline(layer, &[line.start, line.end], false),
            Geometry::LineString(ls) => self.line_string(layer, ls),
            Geometry::MultiLineString(mls) => {
                for ls in mls.iter() {
                    self.line_string(layer, ls);
                }
            }
            Geometry::Polygon(p) => self.polygon(layer, p),
            Geometry::MultiPolygon(mp) => {
                for p in mp.iter() {
                    self.polygon(layer, p);
                }
            }
            Geometry::Rect(r) => self.polygon(layer, &r.to_polygon()),
            Geometry::Triangle(t) => self.polygon(layer, &t.to_polygon()),
            Geometry::GeometryCollection(gc) => {
                for g in gc.iter() {
                    self.geometry(layer, g);
                }
            }
        }
    }

    fn point_entity(&mut self, layer: &str, x: f64, y: f64) {
        self.pair(0, "POINT");
        self.pair(8, layer);
        self.point(10, x, y);
        self.entities += 1;
    }

    fn line_string(&mut self, layer: &str, ls: &LineString<f64>) {
        let coords = &ls.0;
        if ls.is_closed() && coords.len() > 3 {
            self.polyline(layer, &coords[..coords.len() - 1], true);
        } else {
            self.polyline(layer, coords, false);
        }
    }

    fn polygon(&mut self, layer: &str, polygon: &Polygon<f64>) {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            let coords = &ring.0;
            // Rings repeat their first vertex; the closed flag replaces it.
            let open = match (coords.first(), coords.last()) {
                (Some(first), Some(last)) if coords.len() > 1 && first == last => {
                    &coords[..coords.len() - 1]
                }
                _ => &coords[..],
            };
            self.polyline(layer, open, true);
        }
    }

    fn polyline(&mut self, layer: &str, vertices: &[Coord<f64>], closed: bool) {
        if vertices.len() < 2 {
            return;
        }
        self.pair(0, "POLYLINE");
        self.pair(8, layer);
        self.pair(66, 1);
        self.point(10, 0.0, 0.0);
        self.pair(70, if closed { 1 } else { 0 });
        for v in vertices {
            self.pair(0, "VERTEX");
            self.pair(8, layer);
            self.point(10, v.x, v.y);
        }
        self.pair(0, "SEQEND");
        self.pair(8, layer);
        self.entities += 1;
    }

    fn text(&mut self, layer: &str, x: f64, y: f64, height: f64, text: &str) {
        let text: String = text
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();
        self.pair(0, "TEXT");
        self.pair(8, layer);
        self.point(10, x, y);
        self.real(40, height);
        self.pair(1, text);
        self.entities += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon};
    use geocad_types::Feature;

    /// Parse a DXF document back into (code, value) pairs.
    fn pairs(text: &str) -> Vec<(u16, String)> {
        let lines: Vec<&str> = text.lines().collect();
        lines
            .chunks(2)
            .map(|c| (c[0].trim().parse().unwrap(), c[1].to_string()))
            .collect()
    }

    fn count(pairs: &[(u16, String)], code: u16, value: &str) -> usize {
        pairs.iter().filter(|(c, v)| *c == code && v == value).count()
    }

    fn parcels() -> FeatureCollection {
        FeatureCollection::from_features(vec![
            Feature::new(polygon![
                (x: 0.0, y: 0.0),
                (x: 10.0, y: 0.0),
                (x: 10.0, y: 10.0),
                (x: 0.0, y: 10.0),
                (x: 0.0, y: 0.0),
            ])
            .with_attribute("name", "P-1"),
            Feature::new(point!(x: 50.0, y: 50.0)),
        ])
    }

    #[test]
    fn document_structure() {
        let features = parcels();
        let mut writer = DxfWriter::new();
        writer.add_layer(DxfLayer {
            name: "parcels",
            style: ResolvedStyle {
                color: 3,
                linetype: "DASHED".into(),
                text_height: 2.5,
            },
            labeling: None,
            features: &features,
        });
        let text = writer.render();
        let p = pairs(&text);

        assert_eq!(p.first(), Some(&(0, "SECTION".to_string())));
        assert_eq!(p.last(), Some(&(0, "EOF".to_string())));
        assert_eq!(count(&p, 1, "AC1009"), 1);
        assert_eq!(count(&p, 2, "PARCELS"), 1);
        assert_eq!(count(&p, 62, "3"), 1);
        assert_eq!(count(&p, 6, "DASHED"), 1);
        assert_eq!(count(&p, 2, "DASHED"), 1);
        assert_eq!(count(&p, 0, "POLYLINE"), 1);
        assert_eq!(count(&p, 0, "VERTEX"), 4);
        assert_eq!(count(&p, 0, "SEQEND"), 1);
        assert_eq!(count(&p, 0, "POINT"), 1);
        assert_eq!(count(&p, 0, "TEXT"), 0);
    }

    #[test]
    fn labels_use_configured_attribute_and_height() {
        let features = parcels();
        let labeling = LabelingConfig {
            attribute: "name".into(),
            height: Some(4.0),
        };
        let mut writer = DxfWriter::new();
        writer.add_layer(DxfLayer {
            name: "parcels",
            style: ResolvedStyle::default(),
            labeling: Some(&labeling),
            features: &features,
        });
        let p = pairs(&writer.render());
        // Only the parcel carries a name.
        assert_eq!(count(&p, 0, "TEXT"), 1);
        assert_eq!(count(&p, 1, "P-1"), 1);
        assert_eq!(count(&p, 40, "4.000000"), 1);
        let text_at = p.iter().position(|(c, v)| *c == 0 && v == "TEXT").unwrap();
        assert_eq!(p[text_at + 2], (10, "5.000000".to_string()));
        assert_eq!(p[text_at + 3], (20, "5.000000".to_string()));
    }

    #[test]
    fn open_and_closed_line_strings() {
        let features = FeatureCollection::from_features(vec![
            Feature::new(line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0)]),
            Feature::new(line_string![
                (x: 0.0, y: 0.0),
                (x: 5.0, y: 0.0),
                (x: 5.0, y: 5.0),
                (x: 0.0, y: 0.0),
            ]),
        ]);
        let mut writer = DxfWriter::new();
        writer.add_layer(DxfLayer {
            name: "roads",
            style: ResolvedStyle::default(),
            labeling: None,
            features: &features,
        });
        let p = pairs(&writer.render());
        assert_eq!(count(&p, 0, "POLYLINE"), 2);
        assert_eq!(count(&p, 0, "VERTEX"), 5);
    }

    #[test]
    fn layer_names_are_sanitized() {
        assert_eq!(layer_name("setback zone"), "SETBACK_ZONE");
        assert_eq!(layer_name("a/b:c"), "A_B_C");
        assert_eq!(layer_name("$x-1_y"), "$X-1_Y");
    }

    #[test]
    fn colliding_layer_names_are_disambiguated() {
        let features = parcels();
        let mut writer = DxfWriter::new();
        for name in ["Roads", "roads", "ROADS_2", "a b", "a_b"] {
            writer.add_layer(DxfLayer {
                name,
                style: ResolvedStyle::default(),
                labeling: None,
                features: &features,
            });
        }
        assert_eq!(
            writer.drawing_names(),
            vec!["ROADS", "ROADS_2", "ROADS_2_2", "A_B", "A_B_2"]
        );

        let pairs = pairs(&writer.render());
        for name in ["ROADS", "ROADS_2", "ROADS_2_2", "A_B", "A_B_2"] {
            assert_eq!(count(&pairs, 2, name), 1, "LAYER entry for {name}");
        }
        let drawn = count(&pairs, 8, "ROADS");
        assert!(drawn > 0);
        assert_eq!(count(&pairs, 8, "ROADS_2"), drawn);
    }

    #[test]
    fn write_persists_file() {
        let features = parcels();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.dxf");
        let mut writer = DxfWriter::new();
        writer.add_layer(DxfLayer {
            name: "parcels",
            style: ResolvedStyle::default(),
            labeling: None,
            features: &features,
        });
        writer.write(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("EOF\n"));
    }
}
