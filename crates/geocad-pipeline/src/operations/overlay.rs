//! Footprint overlays: `intersection` clips to the union of the `overlay`
//! layers, `difference` removes the union of the `subtract` layers.

use geo::{BooleanOps, Geometry, MultiPoint, MultiPolygon};
use serde::Deserialize;

use geocad_config::Parameters;
use geocad_types::{Feature, FeatureCollection, GeocadError, Result};

use super::{invalid, layer_list, parse_params, LayerList};
use crate::geometry;
use crate::registry::{Operation, OperationContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Keep,
    Remove,
}

/// Clip one feature against `area`. Returns `None` when nothing survives.
fn clip_feature(feature: &Feature, area: &MultiPolygon<f64>, mode: Mode) -> Option<Feature> {
    let clipped: Geometry<f64> = if let Some(poly) = geometry::polygonal(&feature.geometry) {
        let result = match mode {
            Mode::Keep => poly.intersection(area),
            Mode::Remove => poly.difference(area),
        };
        if geometry::is_empty_multipolygon(&result) {
            return None;
        }
        result.into()
    } else if let Some(lines) = geometry::linear(&feature.geometry) {
        let result = area.clip(&lines, mode == Mode::Remove);
        if result.0.is_empty() {
            return None;
        }
        result.into()
    } else if let Some(points) = geometry::points(&feature.geometry) {
        let kept: Vec<_> = points
            .into_iter()
            .filter(|p| geometry::covers_point(area, p) == (mode == Mode::Keep))
            .collect();
        match kept.len() {
            0 => return None,
            1 => kept[0].into(),
            _ => MultiPoint::new(kept).into(),
        }
    } else {
        tracing::warn!(
            geometry_type = geometry::geometry_type_name(&feature.geometry),
            "Overlay skipped unsupported geometry"
        );
        return None;
    };
    Some(Feature::with_attributes(clipped, feature.attributes.clone()))
}

fn overlay(
    op_type: &str,
    input: Option<&FeatureCollection>,
    names: &[String],
    mode: Mode,
    context: &OperationContext<'_>,
) -> Result<FeatureCollection> {
    let input = input.ok_or_else(|| GeocadError::MissingInput {
        op_type: op_type.to_string(),
        layer: context.layer().to_string(),
        step: context.step(),
    })?;
    let area = geometry::footprint(context.resolve_all(names)?);
    if geometry::is_empty_multipolygon(&area) {
        tracing::debug!(parent: context.span(), layers = ?names, "Overlay footprint is empty");
        return Ok(match mode {
            Mode::Keep => FeatureCollection::new(),
            Mode::Remove => input.clone(),
        });
    }

    let out: FeatureCollection = input
        .iter()
        .filter_map(|f| clip_feature(f, &area, mode))
        .collect();
    tracing::debug!(
        parent: context.span(),
        before = input.len(),
        after = out.len(),
        "Overlay applied"
    );
    Ok(out)
}

// ---------------------------------------------------------------------------
// intersection
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IntersectionParams {
    overlay: LayerList,
}

pub struct IntersectionOperation;

impl Operation for IntersectionOperation {
    fn op_type(&self) -> &str {
        "intersection"
    }

    fn referenced_layers(&self, params: &Parameters) -> Vec<String> {
        layer_list(params, "overlay")
    }

    fn validate_params(&self, params: &Parameters) -> Result<()> {
        let p: IntersectionParams = parse_params(self.op_type(), params)?;
        if p.overlay.is_empty() {
            return Err(invalid(self.op_type(), "'overlay' must name at least one layer"));
        }
        Ok(())
    }

    fn execute(
        &self,
        input: Option<&FeatureCollection>,
        params: &Parameters,
        context: &OperationContext<'_>,
    ) -> Result<FeatureCollection> {
        let p: IntersectionParams = parse_params(self.op_type(), params)?;
        overlay(self.op_type(), input, &p.overlay.names(), Mode::Keep, context)
    }
}

// ---------------------------------------------------------------------------
// difference
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DifferenceParams {
    subtract: LayerList,
}

pub struct DifferenceOperation;

impl Operation for DifferenceOperation {
    fn op_type(&self) -> &str {
        "difference"
    }

    fn referenced_layers(&self, params: &Parameters) -> Vec<String> {
        layer_list(params, "subtract")
    }

    fn validate_params(&self, params: &Parameters) -> Result<()> {
        let p: DifferenceParams = parse_params(self.op_type(), params)?;
        if p.subtract.is_empty() {
            return Err(invalid(self.op_type(), "'subtract' must name at least one layer"));
        }
        Ok(())
    }

    fn execute(
        &self,
        input: Option<&FeatureCollection>,
        params: &Parameters,
        context: &OperationContext<'_>,
    ) -> Result<FeatureCollection> {
        let p: DifferenceParams = parse_params(self.op_type(), params)?;
        overlay(self.op_type(), input, &p.subtract.names(), Mode::Remove, context)
    }
}
