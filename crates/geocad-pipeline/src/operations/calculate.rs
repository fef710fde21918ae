use serde::Deserialize;

use geocad_config::Parameters;
use geocad_types::{FeatureCollection, Result};

use super::{invalid, parse_params};
use crate::geometry;
use crate::registry::{Operation, OperationContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Field {
    Area,
    Perimeter,
    Centroid,
}

fn default_fields() -> Vec<Field> {
    vec![Field::Area]
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CalculateParams {
    #[serde(default = "default_fields")]
    fields: Vec<Field>,
    #[serde(default)]
    precision: Option<u32>,
}

fn round(value: f64, precision: Option<u32>) -> f64 {
    match precision {
        Some(p) => {
            let factor = 10f64.powi(p as i32);
            (value * factor).round() / factor
        }
        None => value,
    }
}

/// Adds computed attributes: `area`, `perimeter`, and `centroid_x`/`centroid_y`.
pub struct CalculateOperation;

impl Operation for CalculateOperation {
    fn op_type(&self) -> &str {
        "calculate"
    }

    fn validate_params(&self, params: &Parameters) -> Result<()> {
        let p: CalculateParams = parse_params(self.op_type(), params)?;
        if p.fields.is_empty() {
            return Err(invalid(self.op_type(), "'fields' must not be empty"));
        }
        if p.precision.is_some_and(|n| n > 15) {
            return Err(invalid(self.op_type(), "'precision' must be at most 15"));
        }
        Ok(())
    }

    fn execute(
        &self,
        input: Option<&FeatureCollection>,
        params: &Parameters,
        _context: &OperationContext<'_>,
    ) -> Result<FeatureCollection> {
        let p: CalculateParams = parse_params(self.op_type(), params)?;
        let mut out = input.cloned().unwrap_or_default();
        for feature in &mut out.features {
            for field in &p.fields {
                match field {
                    Field::Area => {
                        let v = round(geometry::area(&feature.geometry), p.precision);
                        feature.attributes.insert("area".into(), v.into());
                    }
                    Field::Perimeter => {
                        let v = round(geometry::perimeter(&feature.geometry), p.precision);
                        feature.attributes.insert("perimeter".into(), v.into());
                    }
                    Field::Centroid => {
                        if let Some(c) = geometry::centroid(&feature.geometry) {
                            feature
                                .attributes
                                .insert("centroid_x".into(), round(c.x(), p.precision).into());
                            feature
                                .attributes
                                .insert("centroid_y".into(), round(c.y(), p.precision).into());
                        }
                    }
                }
            }
        }
        Ok(out)
    }
}
