use geo::Buffer;
use serde::Deserialize;

use geocad_config::Parameters;
use geocad_types::{Feature, FeatureCollection, Result};

use super::{invalid, layer_list, parse_params, LayerList};
use crate::registry::{Operation, OperationContext};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BufferParams {
    distance: f64,
    #[serde(default)]
    layers: LayerList,
}

/// Buffers every feature of the upstream stream and of the `layers` list by
/// `distance`. Negative distances shrink polygons; features that collapse are
/// dropped.
pub struct BufferOperation;

impl Operation for BufferOperation {
    fn op_type(&self) -> &str {
        "buffer"
    }

    fn requires_input(&self, params: &Parameters) -> bool {
        layer_list(params, "layers").is_empty()
    }

    fn validate_params(&self, params: &Parameters) -> Result<()> {
        let p: BufferParams = parse_params(self.op_type(), params)?;
        if !p.distance.is_finite() {
            return Err(invalid(self.op_type(), "distance must be a finite number"));
        }
        Ok(())
    }

    fn execute(
        &self,
        input: Option<&FeatureCollection>,
        params: &Parameters,
        context: &OperationContext<'_>,
    ) -> Result<FeatureCollection> {
        let p: BufferParams = parse_params(self.op_type(), params)?;
        let named = context.resolve_all(&p.layers.names())?;

        let mut out = FeatureCollection::new();
        let mut collapsed = 0usize;
        for feature in input.into_iter().chain(named.iter().copied()).flatten() {
            let buffered = feature.geometry.buffer(p.distance);
            if buffered.0.is_empty() {
                collapsed += 1;
                continue;
            }
            out.push(Feature::with_attributes(buffered, feature.attributes.clone()));
        }
        if collapsed > 0 {
            tracing::debug!(
                parent: context.span(),
                collapsed,
                distance = p.distance,
                "Buffer removed collapsed features"
            );
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ResultStore;
    use geo::{point, polygon, Area};
    use serde_json::json;

    fn params(value: serde_json::Value) -> Parameters {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn buffers_upstream_and_keeps_attributes() {
        let store = ResultStore::new();
        let ctx = OperationContext::new("wells", 0, &store);
        let input = FeatureCollection::from_features(vec![
            Feature::new(point!(x: 0.0, y: 0.0)).with_attribute("id", 1),
        ]);
        let out = BufferOperation
            .execute(Some(&input), &params(json!({"distance": 10.0})), &ctx)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.features[0].attribute("id"), Some(&json!(1)));
        let area = out.features[0].geometry.unsigned_area();
        let circle = std::f64::consts::PI * 100.0;
        assert!((area - circle).abs() / circle < 0.05, "area {area}");
    }

    #[test]
    fn buffers_named_layers_without_input() {
        let mut store = ResultStore::new();
        store
            .put(
                "parcels",
                "parcels",
                FeatureCollection::from_features(vec![Feature::new(polygon![
                    (x: 0.0, y: 0.0),
                    (x: 4.0, y: 0.0),
                    (x: 4.0, y: 4.0),
                    (x: 0.0, y: 4.0),
                    (x: 0.0, y: 0.0),
                ])]),
            )
            .unwrap();
        let ctx = OperationContext::new("setback", 0, &store);
        let p = params(json!({"distance": 1.0, "layers": ["parcels"]}));
        assert!(!BufferOperation.requires_input(&p));
        let out = BufferOperation.execute(None, &p, &ctx).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out.features[0].geometry.unsigned_area() > 16.0);
    }

    #[test]
    fn negative_buffer_drops_collapsed_features() {
        let store = ResultStore::new();
        let ctx = OperationContext::new("core", 0, &store);
        let input = FeatureCollection::from_features(vec![Feature::new(polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ])]);
        let out = BufferOperation
            .execute(Some(&input), &params(json!({"distance": -5.0})), &ctx)
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn missing_distance_is_invalid() {
        assert!(BufferOperation.validate_params(&Parameters::new()).is_err());
        assert!(BufferOperation
            .validate_params(&params(json!({"distance": 3, "layers": "a"})))
            .is_ok());
        assert!(BufferOperation.requires_input(&Parameters::new()));
    }
}
