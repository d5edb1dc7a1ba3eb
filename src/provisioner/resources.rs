//! Resource listing from serialized provisioning state

use serde::Deserialize;

use crate::error::{StateError, StateResult};

#[derive(Debug, Deserialize)]
struct StateDocument {
    #[serde(default)]
    resources: Vec<ResourceEntry>,
}

#[derive(Debug, Deserialize)]
struct ResourceEntry {
    #[serde(default)]
    module: Option<String>,
    #[serde(default = "default_mode")]
    mode: String,
    #[serde(rename = "type")]
    kind: String,
    name: String,
}

fn default_mode() -> String {
    "managed".to_string()
}

/// Resource addresses (`[module.]<type>.<name>`, `data.` for data sources)
///
/// Empty content counts as an empty state.
pub fn resource_addresses(content: &[u8]) -> StateResult<Vec<String>> {
    if content.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let document: StateDocument = serde_json::from_slice(content)
        .map_err(|e| StateError::Json(format!("Failed to parse state: {}", e)))?;

    Ok(document
        .resources
        .into_iter()
        .map(|r| {
            let mut address = String::new();
            if let Some(module) = r.module {
                address.push_str(&module);
                address.push('.');
            }
            if r.mode == "data" {
                address.push_str("data.");
            }
            address.push_str(&r.kind);
            address.push('.');
            address.push_str(&r.name);
            address
        })
        .collect())
}
