use serde::Deserialize;

use geocad_config::Parameters;
use geocad_types::{FeatureCollection, Result};

use super::{invalid, parse_params, LayerList};
use crate::registry::{Operation, OperationContext};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MergeParams {
    layers: LayerList,
}

/// Generative operation: concatenates the upstream stream (if any) and every
/// feature of the `layers` list, in that order. Also registered as `copy`.
pub struct MergeOperation;

impl Operation for MergeOperation {
    fn op_type(&self) -> &str {
        "merge"
    }

    fn requires_input(&self, _params: &Parameters) -> bool {
        false
    }

    fn validate_params(&self, params: &Parameters) -> Result<()> {
        let p: MergeParams = parse_params(self.op_type(), params)?;
        if p.layers.is_empty() {
            return Err(invalid(self.op_type(), "'layers' must name at least one layer"));
        }
        Ok(())
    }

    fn execute(
        &self,
        input: Option<&FeatureCollection>,
        params: &Parameters,
        context: &OperationContext<'_>,
    ) -> Result<FeatureCollection> {
        let p: MergeParams = parse_params(self.op_type(), params)?;
        let mut out = input.cloned().unwrap_or_default();
        for fc in context.resolve_all(&p.layers.names())? {
            out.extend(fc.iter().cloned());
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ResultStore;
    use geo::point;
    use geocad_types::Feature;
    use serde_json::json;

    #[test]
    fn merge_concatenates_in_order() {
        let mut store = ResultStore::new();
        store
            .put("a", "a", FeatureCollection::from_features(vec![
                Feature::new(point!(x: 1.0, y: 1.0)).with_attribute("src", "a"),
            ]))
            .unwrap();
        store
            .put("b", "b", FeatureCollection::from_features(vec![
                Feature::new(point!(x: 2.0, y: 2.0)).with_attribute("src", "b"),
                Feature::new(point!(x: 3.0, y: 3.0)).with_attribute("src", "b"),
            ]))
            .unwrap();
        let ctx = OperationContext::new("all", 0, &store);
        let p = json!({"layers": ["b", "a"]}).as_object().cloned().unwrap();
        let out = MergeOperation.execute(None, &p, &ctx).unwrap();
        let sources: Vec<String> = out.iter().map(|f| f.attribute_text("src")).collect();
        assert_eq!(sources, vec!["b", "b", "a"]);
    }

    #[test]
    fn merge_requires_layers() {
        assert!(!MergeOperation.requires_input(&Parameters::new()));
        assert!(MergeOperation.validate_params(&Parameters::new()).is_err());
        let p = json!({"layers": []}).as_object().cloned().unwrap();
        assert!(MergeOperation.validate_params(&p).is_err());
    }
}
