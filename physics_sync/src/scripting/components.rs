//! Script-related components

use serde::{Deserialize, Serialize};

/// Reference to a script asset
///
/// Entities carrying this component receive collision, trigger and raycast
/// hooks. The script is loaded from the configured scripts directory with a
/// `.rhai` extension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct ScriptRef {
    /// Script name without extension (e.g., "door_trigger")
    pub name: String,
}

impl ScriptRef {
    /// Create a new script reference
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_ref_new() {
        let script_ref = ScriptRef::new("test_script");
        assert_eq!(script_ref.name, "test_script");
    }

    #[test]
    fn test_script_ref_deserialize() {
        let script_ref: ScriptRef = serde_json::from_str(r#"{"name":"crate"}"#).unwrap();
        assert_eq!(script_ref, ScriptRef::new("crate"));
    }
}
