//! Provenance records stored in the container footer: which tool produced
//! the file, with what parameters, on what platform.

use serde_json::{json, Value};

/// Version of the provenance document layout itself.
const PROVENANCE_SCHEMA_VERSION: &str = "1.0.0";

/// Builds the provenance document embedded at encode time.
pub fn provenance_record(parameters: Value) -> Value {
    json!({
        "schema_version": PROVENANCE_SCHEMA_VERSION,
        "software": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        },
        "parameters": parameters,
        "environment": {
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        },
    })
}
