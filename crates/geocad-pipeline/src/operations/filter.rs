use serde::Deserialize;

use geocad_config::Parameters;
use geocad_types::{Feature, FeatureCollection, Result};

use super::{invalid, parse_params};
use crate::condition::{evaluate_filter, parse_filter, FilterExpr};
use crate::geometry;
use crate::registry::{Operation, OperationContext};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FilterParams {
    #[serde(default, rename = "where")]
    condition: Option<String>,
    #[serde(default)]
    min_area: Option<f64>,
    #[serde(default)]
    max_area: Option<f64>,
    #[serde(default)]
    geometry_types: Vec<String>,
}

struct Predicate {
    expr: Option<FilterExpr>,
    min_area: Option<f64>,
    max_area: Option<f64>,
    geometry_types: Vec<String>,
}

impl Predicate {
    fn compile(op_type: &str, params: &Parameters) -> Result<Self> {
        let p: FilterParams = parse_params(op_type, params)?;
        if let (Some(min), Some(max)) = (p.min_area, p.max_area) {
            if min > max {
                return Err(invalid(op_type, format!("min_area {min} exceeds max_area {max}")));
            }
        }
        let expr = p.condition.as_deref().map(parse_filter).transpose()?;
        Ok(Self {
            expr,
            min_area: p.min_area,
            max_area: p.max_area,
            geometry_types: p.geometry_types,
        })
    }

    fn matches(&self, feature: &Feature) -> bool {
        let kind = geometry::geometry_type_name(&feature.geometry);
        if !self.geometry_types.is_empty()
            && !self.geometry_types.iter().any(|t| t.eq_ignore_ascii_case(kind))
        {
            return false;
        }
        if self.min_area.is_some() || self.max_area.is_some() {
            let area = geometry::area(&feature.geometry);
            if self.min_area.is_some_and(|min| area < min)
                || self.max_area.is_some_and(|max| area > max)
            {
                return false;
            }
        }
        match self.expr {
            Some(ref expr) => evaluate_filter(expr, &|key: &str| match key {
                "$area" => geometry::area(&feature.geometry).to_string(),
                "$perimeter" => geometry::perimeter(&feature.geometry).to_string(),
                "$type" => kind.to_string(),
                _ => feature.attribute_text(key),
            }),
            None => true,
        }
    }
}

/// Keeps the features matching every given criterion: the `where` expression,
/// the `min_area`/`max_area` bounds and the `geometry_types` list.
pub struct FilterOperation;

impl Operation for FilterOperation {
    fn op_type(&self) -> &str {
        "filter"
    }

    fn validate_params(&self, params: &Parameters) -> Result<()> {
        Predicate::compile(self.op_type(), params).map(|_| ())
    }

    fn execute(
        &self,
        input: Option<&FeatureCollection>,
        params: &Parameters,
        context: &OperationContext<'_>,
    ) -> Result<FeatureCollection> {
        let predicate = Predicate::compile(self.op_type(), params)?;
        let Some(input) = input else {
            return Ok(FeatureCollection::new());
        };
        let out: FeatureCollection = input.iter().filter(|f| predicate.matches(f)).cloned().collect();
        tracing::debug!(
            parent: context.span(),
            kept = out.len(),
            dropped = input.len() - out.len(),
            "Filter applied"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ResultStore;
    use geo::{point, polygon};
    use serde_json::json;

    fn square(size: f64) -> geo::Polygon<f64> {
        polygon![
            (x: 0.0, y: 0.0),
            (x: size, y: 0.0),
            (x: size, y: size),
            (x: 0.0, y: size),
            (x: 0.0, y: 0.0),
        ]
    }

    fn parcels() -> FeatureCollection {
        FeatureCollection::from_features(vec![
            Feature::new(square(1.0)).with_attribute("zone", "R1").with_attribute("lots", 2),
            Feature::new(square(10.0)).with_attribute("zone", "R1").with_attribute("lots", 40),
            Feature::new(square(5.0)).with_attribute("zone", "C2"),
            Feature::new(point!(x: 1.0, y: 1.0)).with_attribute("zone", "R1"),
        ])
    }

    fn run(params: serde_json::Value) -> FeatureCollection {
        let store = ResultStore::new();
        let ctx = OperationContext::new("f", 0, &store);
        let p = params.as_object().cloned().unwrap();
        FilterOperation.execute(Some(&parcels()), &p, &ctx).unwrap()
    }

    #[test]
    fn where_expression() {
        assert_eq!(run(json!({"where": "zone=R1"})).len(), 3);
        assert_eq!(run(json!({"where": "zone=R1 && lots>10"})).len(), 1);
    }

    #[test]
    fn computed_keys() {
        assert_eq!(run(json!({"where": "$type=Polygon && $area>=25"})).len(), 2);
        assert_eq!(run(json!({"where": "$perimeter=4"})).len(), 1);
    }

    #[test]
    fn area_bounds() {
        assert_eq!(run(json!({"min_area": 2.0})).len(), 2);
        assert_eq!(run(json!({"max_area": 30.0, "geometry_types": ["polygon"]})).len(), 2);
    }

    #[test]
    fn geometry_types() {
        let out = run(json!({"geometry_types": ["Point"]}));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn invalid_parameters() {
        let p = json!({"where": "zone"}).as_object().cloned().unwrap();
        assert!(FilterOperation.validate_params(&p).is_err());
        let p = json!({"min_area": 5, "max_area": 1}).as_object().cloned().unwrap();
        assert!(FilterOperation.validate_params(&p).is_err());
        assert!(FilterOperation.validate_params(&Parameters::new()).is_ok());
    }
}
