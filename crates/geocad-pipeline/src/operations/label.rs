use std::collections::HashMap;

use serde::Deserialize;

use geocad_config::{expand_variables, Parameters};
use geocad_types::{Feature, FeatureCollection, Result};

use super::parse_params;
use crate::geometry;
use crate::registry::{Operation, OperationContext};

fn default_attribute() -> String {
    "label".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LabelParams {
    text: String,
    #[serde(default = "default_attribute")]
    attribute: String,
}

/// Produces one point per feature at its centroid, carrying the feature's
/// attributes plus the expanded `text` template under `attribute`.
pub struct LabelOperation;

impl Operation for LabelOperation {
    fn op_type(&self) -> &str {
        "label"
    }

    fn validate_params(&self, params: &Parameters) -> Result<()> {
        parse_params::<LabelParams>(self.op_type(), params).map(|_| ())
    }

    fn execute(
        &self,
        input: Option<&FeatureCollection>,
        params: &Parameters,
        context: &OperationContext<'_>,
    ) -> Result<FeatureCollection> {
        let p: LabelParams = parse_params(self.op_type(), params)?;
        let mut out = FeatureCollection::new();
        for feature in input.into_iter().flatten() {
            let Some(anchor) = geometry::centroid(&feature.geometry) else {
                tracing::warn!(parent: context.span(), "Skipping label for empty geometry");
                continue;
            };
            let vars: HashMap<String, String> = feature
                .attributes
                .keys()
                .map(|k| (k.clone(), feature.attribute_text(k)))
                .collect();
            let text = expand_variables(&p.text, &vars);
            out.push(
                Feature::with_attributes(anchor, feature.attributes.clone())
                    .with_attribute(p.attribute.clone(), text),
            );
        }
        Ok(out)
    }
}
