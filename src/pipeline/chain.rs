//! Serializable descriptions of codec chains.
//!
//! These structs are the schema of the per-array `chain` field in the container
//! footer. Ids are plain strings so that a reader can detect an unrecognized
//! codec by name and fail cleanly instead of failing to parse the metadata.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One step of a chain: a registered codec id plus its parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CodecSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl CodecSpec {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            params: Value::Null,
        }
    }

    pub fn with_params(id: &str, params: Value) -> Self {
        Self {
            id: id.to_string(),
            params,
        }
    }

    /// Reads an unsigned integer parameter, falling back to `default` when the
    /// key is absent. Chains written by older minor versions may omit
    /// parameters that have since grown defaults.
    pub fn param_u64(&self, key: &str, default: u64) -> u64 {
        self.params
            .get(key)
            .and_then(Value::as_u64)
            .unwrap_or(default)
    }

    pub fn param_i64(&self, key: &str, default: i64) -> i64 {
        self.params
            .get(key)
            .and_then(Value::as_i64)
            .unwrap_or(default)
    }
}

/// An ordered sequence of reversible filters terminated by one entropy coder.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CodecChain {
    pub filters: Vec<CodecSpec>,
    pub coder: CodecSpec,
}

impl CodecChain {
    pub fn new(filters: Vec<CodecSpec>, coder: CodecSpec) -> Self {
        Self { filters, coder }
    }

    /// All codec ids referenced by this chain, filters first, coder last.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.filters
            .iter()
            .map(|spec| spec.id.as_str())
            .chain(std::iter::once(self.coder.id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chain_json_roundtrip() {
        let chain = CodecChain::new(
            vec![
                CodecSpec::with_params("delta", json!({"order": 1})),
                CodecSpec::new("zigzag"),
            ],
            CodecSpec::with_params("zstd", json!({"level": 9})),
        );
        let text = serde_json::to_string(&chain).unwrap();
        let back: CodecChain = serde_json::from_str(&text).unwrap();
        assert_eq!(back, chain);
    }

    #[test]
    fn test_missing_params_default_to_null() {
        let spec: CodecSpec = serde_json::from_str(r#"{"id": "shuffle"}"#).unwrap();
        assert_eq!(spec.params, Value::Null);
        assert_eq!(spec.param_u64("order", 1), 1);
    }

    #[test]
    fn test_ids_order() {
        let chain = CodecChain::new(
            vec![CodecSpec::new("bitcast"), CodecSpec::new("shuffle")],
            CodecSpec::new("zstd"),
        );
        let ids: Vec<&str> = chain.ids().collect();
        assert_eq!(ids, vec!["bitcast", "shuffle", "zstd"]);
    }
}
