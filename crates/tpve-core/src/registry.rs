use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::descriptor::RegistryMirror;

/// Machine-config path replaced by the registry patch.
pub const REGISTRIES_PATH: &str = "/machine/registries";

/// JSON patch installing every registry mirror as one `add` operation.
///
/// Endpoint order within a mirror is kept; registries are emitted sorted by
/// hostname.
pub fn registry_patch(mirrors: &BTreeMap<String, RegistryMirror>) -> Value {
    let mirrors: serde_json::Map<String, Value> = mirrors
        .iter()
        .map(|(registry, mirror)| {
            (
                registry.clone(),
                json!({ "endpoints": mirror.endpoints }),
            )
        })
        .collect();

    json!([
        {
            "op": "add",
            "path": REGISTRIES_PATH,
            "value": { "mirrors": mirrors },
        }
    ])
}
