//! Features and feature collections: the data flowing between pipeline operations.

use geo_types::Geometry;

/// Attribute map attached to a feature.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// A single geometry with its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry<f64>,
    pub attributes: Attributes,
}

impl Feature {
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            geometry: geometry.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attributes(geometry: impl Into<Geometry<f64>>, attributes: Attributes) -> Self {
        Self {
            geometry: geometry.into(),
            attributes,
        }
    }

    /// Builder-style attribute insertion.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }

    /// Attribute rendered as plain text. Strings are returned unquoted, missing
    /// attributes and nulls become the empty string.
    pub fn attribute_text(&self, key: &str) -> String {
        match self.attributes.get(key) {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// An ordered set of features.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_features(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    pub fn geometries(&self) -> impl Iterator<Item = &Geometry<f64>> {
        self.features.iter().map(|f| &f.geometry)
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

impl Extend<Feature> for FeatureCollection {
    fn extend<I: IntoIterator<Item = Feature>>(&mut self, iter: I) {
        self.features.extend(iter);
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{point, Point};

    #[test]
    fn attribute_text_renders_values() {
        let f = Feature::new(point!(x: 1.0, y: 2.0))
            .with_attribute("name", "Main St")
            .with_attribute("lanes", 2)
            .with_attribute("closed", serde_json::Value::Null);
        assert_eq!(f.attribute_text("name"), "Main St");
        assert_eq!(f.attribute_text("lanes"), "2");
        assert_eq!(f.attribute_text("closed"), "");
        assert_eq!(f.attribute_text("missing"), "");
    }

    #[test]
    fn collection_collects_and_extends() {
        let mut fc: FeatureCollection = (0..3)
            .map(|i| Feature::new(Point::new(i as f64, 0.0)))
            .collect();
        assert_eq!(fc.len(), 3);
        fc.extend(vec![Feature::new(Point::new(9.0, 9.0))]);
        assert_eq!(fc.len(), 4);
        assert_eq!(fc.geometries().count(), 4);
        assert!(!fc.is_empty());
        assert!(FeatureCollection::new().is_empty());
    }
}
