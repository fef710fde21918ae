use indexmap::IndexMap;
use serde::Deserialize;

use geocad_config::Parameters;
use geocad_types::{Attributes, Feature, FeatureCollection, Result};

use super::{layer_list, parse_params, LayerList};
use crate::geometry;
use crate::registry::{Operation, OperationContext};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DissolveParams {
    #[serde(default)]
    by: Option<String>,
    #[serde(default)]
    layers: LayerList,
}

/// Unions polygonal features, grouped by the value of the `by` attribute when
/// given. Groups appear in first-appearance order; non-polygonal features pass
/// through unchanged after the dissolved groups.
pub struct DissolveOperation;

impl Operation for DissolveOperation {
    fn op_type(&self) -> &str {
        "dissolve"
    }

    fn requires_input(&self, params: &Parameters) -> bool {
        layer_list(params, "layers").is_empty()
    }

    fn validate_params(&self, params: &Parameters) -> Result<()> {
        parse_params::<DissolveParams>(self.op_type(), params).map(|_| ())
    }

    fn execute(
        &self,
        input: Option<&FeatureCollection>,
        params: &Parameters,
        context: &OperationContext<'_>,
    ) -> Result<FeatureCollection> {
        let p: DissolveParams = parse_params(self.op_type(), params)?;
        let named = context.resolve_all(&p.layers.names())?;

        let mut groups: IndexMap<String, (Attributes, Vec<geo::MultiPolygon<f64>>)> =
            IndexMap::new();
        let mut passthrough = Vec::new();

        for feature in input.into_iter().chain(named.iter().copied()).flatten() {
            let Some(poly) = geometry::polygonal(&feature.geometry) else {
                passthrough.push(feature.clone());
                continue;
            };
            let (key, attrs) = match p.by {
                Some(ref by) => {
                    let mut attrs = Attributes::new();
                    if let Some(value) = feature.attribute(by) {
                        attrs.insert(by.clone(), value.clone());
                    }
                    (feature.attribute_text(by), attrs)
                }
                None => (String::new(), Attributes::new()),
            };
            groups
                .entry(key)
                .or_insert_with(|| (attrs, Vec::new()))
                .1
                .push(poly);
        }

        tracing::debug!(
            parent: context.span(),
            groups = groups.len(),
            passthrough = passthrough.len(),
            "Dissolve grouped features"
        );

        let mut out: FeatureCollection = groups
            .into_values()
            .map(|(attrs, parts)| Feature::with_attributes(geometry::union_all(&parts), attrs))
            .collect();
        out.extend(passthrough);
        Ok(out)
    }
}
