//! Print the JSON Schema of the venv settings
//!
//! Hosts ship it next to their settings file for validation and completion.
//!
//! Usage:
//!   cargo run --features dev-bins --bin generate_schema > venv-settings-schema.json

use pyright_env::config::VenvConfig;

fn main() {
    let mut json =
        serde_json::to_value(VenvConfig::json_schema()).expect("Failed to serialize schema");

    // Probe names are listed so editors can complete them
    if let Some(items) = json.pointer_mut("/properties/finder_names/items") {
        if let Some(obj) = items.as_object_mut() {
            obj.insert(
                "enum".to_string(),
                serde_json::json!(pyright_env::list_available_finder_names()),
            );
        }
    }

    let output = serde_json::to_string_pretty(&json).expect("Failed to serialize schema");
    println!("{}", output);
}
