//! Result Store key derivation for operation chains.
//!
//! Both the resolver and the processor derive keys through this module so that a
//! reference resolved at planning time names exactly the key written at run time.

use geocad_config::LayerConfig;

/// Generated key for an intermediate step: `"{layer}::{index}"`.
pub fn intermediate_key(layer: &str, index: usize) -> String {
    format!("{layer}::{index}")
}

/// Output key of every operation in the layer's chain, in declared order.
///
/// An explicit `output_name` always wins. Otherwise the last operation publishes
/// under the layer's own name and earlier ones get generated intermediate keys.
pub fn output_keys(layer: &LayerConfig) -> Vec<String> {
    let last = layer.operations.len().saturating_sub(1);
    layer
        .operations
        .iter()
        .enumerate()
        .map(|(i, op)| match op.output_name {
            Some(ref name) => name.clone(),
            None if i == last => layer.name.clone(),
            None => intermediate_key(&layer.name, i),
        })
        .collect()
}

/// Every key a layer will have written once it is published, in write order.
pub fn published_keys(layer: &LayerConfig) -> Vec<String> {
    let mut keys = output_keys(layer);
    if keys.last() != Some(&layer.name) {
        keys.push(layer.name.clone());
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use geocad_config::OperationConfig;

    #[test]
    fn last_implicit_step_uses_layer_name() {
        let layer = LayerConfig::new("roads")
            .with_operation(OperationConfig::new("buffer"))
            .with_operation(OperationConfig::new("filter"));
        assert_eq!(output_keys(&layer), vec!["roads::0", "roads"]);
    }

    #[test]
    fn explicit_output_name_wins() {
        let layer = LayerConfig::new("roads")
            .with_operation(OperationConfig::new("buffer").with_output_name("wide"))
            .with_operation(OperationConfig::new("filter").with_output_name("kept"));
        assert_eq!(output_keys(&layer), vec!["wide", "kept"]);
        assert_eq!(published_keys(&layer), vec!["wide", "kept", "roads"]);
    }

    #[test]
    fn source_only_layer_publishes_its_name() {
        let layer = LayerConfig::new("parcels");
        assert!(output_keys(&layer).is_empty());
        assert_eq!(published_keys(&layer), vec!["parcels"]);
    }

    #[test]
    fn keys_are_deterministic() {
        let layer = LayerConfig::new("a")
            .with_operation(OperationConfig::new("x"))
            .with_operation(OperationConfig::new("y"))
            .with_operation(OperationConfig::new("z"));
        assert_eq!(output_keys(&layer), output_keys(&layer));
        assert_eq!(intermediate_key("a", 1), "a::1");
    }
}
