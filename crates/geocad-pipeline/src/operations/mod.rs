//! Built-in operations and the parameter helpers they share.

pub mod buffer;
pub mod calculate;
pub mod dissolve;
pub mod filter;
pub mod label;
pub mod merge;
pub mod overlay;

pub use buffer::BufferOperation;
pub use calculate::CalculateOperation;
pub use dissolve::DissolveOperation;
pub use filter::FilterOperation;
pub use label::LabelOperation;
pub use merge::MergeOperation;
pub use overlay::{DifferenceOperation, IntersectionOperation};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use geocad_config::Parameters;
use geocad_types::{GeocadError, Result};

/// One layer name or a list of them. Parameters such as `layers`, `overlay`
/// and `subtract` accept either form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LayerList {
    One(String),
    Many(Vec<String>),
}

impl LayerList {
    pub fn names(&self) -> Vec<String> {
        match self {
            LayerList::One(name) => vec![name.clone()],
            LayerList::Many(names) => names.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            LayerList::One(name) => name.is_empty(),
            LayerList::Many(names) => names.is_empty(),
        }
    }
}

impl Default for LayerList {
    fn default() -> Self {
        LayerList::Many(Vec::new())
    }
}

/// Layer names listed under `key`, tolerating a missing or malformed value.
/// Used while collecting dependencies; malformed values are reported by
/// parameter validation.
pub fn layer_list(params: &Parameters, key: &str) -> Vec<String> {
    match params.get(key) {
        Some(serde_json::Value::String(s)) => vec![s.clone()],
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Deserialize an operation's parameter map into its typed parameter struct.
pub fn parse_params<T: DeserializeOwned>(op_type: &str, params: &Parameters) -> Result<T> {
    serde_json::from_value(serde_json::Value::Object(params.clone())).map_err(|e| {
        GeocadError::InvalidParameter {
            op_type: op_type.to_string(),
            message: e.to_string(),
        }
    })
}

pub(crate) fn invalid(op_type: &str, message: impl Into<String>) -> GeocadError {
    GeocadError::InvalidParameter {
        op_type: op_type.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: serde_json::Value) -> Parameters {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Sample {
        distance: f64,
        #[serde(default)]
        layers: LayerList,
    }

    #[test]
    fn layer_list_accepts_string_or_list() {
        let p = params(json!({"layers": "roads"}));
        assert_eq!(layer_list(&p, "layers"), vec!["roads"]);
        let p = params(json!({"layers": ["a", "b"]}));
        assert_eq!(layer_list(&p, "layers"), vec!["a", "b"]);
        let p = params(json!({"layers": 5}));
        assert!(layer_list(&p, "layers").is_empty());
    }

    #[test]
    fn parse_params_typed() {
        let p = params(json!({"distance": 2.5, "layers": "roads"}));
        let s: Sample = parse_params("buffer", &p).unwrap();
        assert_eq!(s.distance, 2.5);
        assert_eq!(s.layers.names(), vec!["roads"]);

        let s: Sample = parse_params("buffer", &params(json!({"distance": 1}))).unwrap();
        assert!(s.layers.is_empty());
    }

    #[test]
    fn parse_params_rejects_unknown_and_missing() {
        let err = parse_params::<Sample>("buffer", &params(json!({"distance": 1, "radius": 2})))
            .unwrap_err();
        assert!(matches!(err, GeocadError::InvalidParameter { ref op_type, .. } if op_type == "buffer"));
        assert!(parse_params::<Sample>("buffer", &Parameters::new()).is_err());
    }
}
