//! User-defined struct definitions
//!
//! A `TypeDef` is the serializable description of a record type that scripts
//! can box, copy and sort. Definitions are usually loaded from TOML or JSON
//! files and compiled into runtime descriptors by the host.

use serde::{Deserialize, Serialize};

use crate::PinType;

// ─────────────────────────────────────────────────────────────────────────────
// Field Definition
// ─────────────────────────────────────────────────────────────────────────────

/// Definition of a field in a user-defined type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name. Editor-generated names carry an index and GUID suffix.
    pub name: String,
    /// Field type (uses the same type system as pins)
    pub field_type: PinType,
    /// Value the field holds after construction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDef {
    /// Create a field
    pub fn new(name: impl Into<String>, field_type: PinType) -> Self {
        Self {
            name: name.into(),
            field_type,
            default: None,
            description: None,
        }
    }

    /// Add a default value
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Type Definition
// ─────────────────────────────────────────────────────────────────────────────

/// A complete user-defined struct definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDef {
    /// Unique type ID (e.g., "game/Score")
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Version string
    #[serde(default = "default_version")]
    pub version: String,
    /// Fields for this type, in layout order
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl TypeDef {
    /// Create a new struct type with no fields
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: default_version(),
            fields: Vec::new(),
            description: None,
        }
    }

    /// Add a single field
    pub fn add_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Get a field by its exact name
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// IDs of the struct types this definition embeds
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter_map(|f| f.field_type.struct_id())
    }
}

/// A file containing a batch of type definitions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeDefFile {
    #[serde(default)]
    pub types: Vec<TypeDef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_def_builder() {
        let def = TypeDef::new("game/Score", "Score")
            .add_field(FieldDef::new("Player", PinType::String))
            .add_field(FieldDef::new("Points", PinType::Integer).with_default(42.into()))
            .add_field(FieldDef::new("Origin", PinType::structure("game/Vec2")));

        assert_eq!(def.version, "1.0.0");
        assert_eq!(def.fields.len(), 3);
        assert!(def.get_field("Points").unwrap().default.is_some());
        assert_eq!(def.dependencies().collect::<Vec<_>>(), vec!["game/Vec2"]);
    }

    #[test]
    fn test_type_def_file_json() {
        let json = r#"{
            "types": [{
                "id": "game/Vec2",
                "name": "Vec2",
                "fields": [
                    {"name": "X", "field_type": {"type": "Real"}},
                    {"name": "Y", "field_type": {"type": "Real"}, "default": 1.5}
                ]
            }]
        }"#;

        let file: TypeDefFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.types.len(), 1);
        assert_eq!(file.types[0].fields[1].field_type, PinType::Real);
    }
}
