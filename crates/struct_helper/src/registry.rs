//! Descriptor registry
//!
//! The registry is the host's type descriptor provider: it maps type ids to
//! descriptors, compiles user-defined struct definitions, and resolves the
//! identities read back from archives. Descriptors are never removed, so a
//! `DescriptorRef` handed out here stays valid for every box that holds it.

use std::path::Path;
use std::sync::Arc;

use blueprint_types::{PinType, TypeDef, TypeDefFile};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::descriptor::{DescriptorRef, TypeDescriptor};
use crate::record::StructDescriptor;
use crate::scalar::{ScalarDescriptor, ScalarKind};

/// Errors that can occur when registering types
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Type already exists: {0}")]
    TypeAlreadyExists(String),
    #[error("Type not found: {0}")]
    TypeNotFound(String),
    #[error("Type {type_id} declares field {field} twice")]
    DuplicateField { type_id: String, field: String },
    #[error("Type {type_id} field {field} has unsupported type {field_type}")]
    UnsupportedFieldType {
        type_id: String,
        field: String,
        field_type: PinType,
    },
    #[error("Type {type_id} field {field} has an invalid default: {reason}")]
    InvalidDefault {
        type_id: String,
        field: String,
        reason: String,
    },
    #[error("Types with missing or circular dependencies: {0:?}")]
    UnresolvedTypes(Vec<String>),
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to read type file: {0}")]
    Io(#[from] std::io::Error),
}

/// Registry of all descriptors known to the host
pub struct DescriptorRegistry {
    types: DashMap<String, DescriptorRef>,
    structs: DashMap<String, Arc<StructDescriptor>>,
}

impl Default for DescriptorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptorRegistry {
    /// Create a registry holding the builtin scalar types
    pub fn new() -> Self {
        let registry = Self {
            types: DashMap::new(),
            structs: DashMap::new(),
        };
        for kind in [ScalarKind::Boolean, ScalarKind::Integer, ScalarKind::Real] {
            let id = match kind {
                ScalarKind::Boolean => "Boolean",
                ScalarKind::Integer => "Integer",
                ScalarKind::Real => "Real",
            };
            registry
                .types
                .insert(id.to_string(), Arc::new(ScalarDescriptor::new(id, kind)));
        }
        registry
    }

    /// Register a host-provided descriptor under its own type id
    pub fn register(&self, descriptor: DescriptorRef) -> Result<(), RegistryError> {
        match self.types.entry(descriptor.type_id().to_string()) {
            Entry::Occupied(entry) => Err(RegistryError::TypeAlreadyExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                tracing::debug!(type_id = descriptor.type_id(), "Registered descriptor");
                entry.insert(descriptor);
                Ok(())
            }
        }
    }

    /// Compile and register a user-defined struct
    ///
    /// Every struct the definition embeds must already be registered.
    pub fn register_struct(&self, def: &TypeDef) -> Result<Arc<StructDescriptor>, RegistryError> {
        if self.types.contains_key(&def.id) {
            return Err(RegistryError::TypeAlreadyExists(def.id.clone()));
        }
        let descriptor = Arc::new(StructDescriptor::compile(def, |id| self.get(id))?);

        match self.types.entry(def.id.clone()) {
            Entry::Occupied(_) => Err(RegistryError::TypeAlreadyExists(def.id.clone())),
            Entry::Vacant(entry) => {
                entry.insert(descriptor.clone());
                self.structs.insert(def.id.clone(), descriptor.clone());
                tracing::debug!(
                    type_id = %def.id,
                    fields = def.fields.len(),
                    size = descriptor.size(),
                    "Registered struct type"
                );
                Ok(descriptor)
            }
        }
    }

    /// Register a batch of struct definitions in dependency order
    ///
    /// Definitions may appear in any order. Returns the number registered.
    /// Types registered before an error is found stay registered.
    pub fn register_all(&self, defs: Vec<TypeDef>) -> Result<usize, RegistryError> {
        let mut pending = defs;
        let mut registered = 0;

        while !pending.is_empty() {
            let (ready, blocked): (Vec<_>, Vec<_>) = pending.into_iter().partition(|def| {
                def.dependencies().all(|dep| self.types.contains_key(dep))
            });
            if ready.is_empty() {
                return Err(RegistryError::UnresolvedTypes(
                    blocked.into_iter().map(|def| def.id).collect(),
                ));
            }
            for def in &ready {
                self.register_struct(def)?;
                registered += 1;
            }
            pending = blocked;
        }

        Ok(registered)
    }

    /// Register every type in a TOML document of `[[types]]` tables
    pub fn load_toml(&self, source: &str) -> Result<usize, RegistryError> {
        let file: TypeDefFile = toml::from_str(source)?;
        self.register_all(file.types)
    }

    /// Register every type in a JSON document `{"types": [...]}`
    pub fn load_json(&self, source: &str) -> Result<usize, RegistryError> {
        let file: TypeDefFile = serde_json::from_str(source)?;
        self.register_all(file.types)
    }

    /// Register every type in a `.json` or `.toml` file (TOML unless the
    /// extension says JSON)
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<usize, RegistryError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let count = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => self.load_json(&source)?,
            _ => self.load_toml(&source)?,
        };
        tracing::debug!(path = %path.display(), count, "Loaded type definitions");
        Ok(count)
    }

    /// Get a descriptor by type ID
    pub fn get(&self, type_id: &str) -> Option<DescriptorRef> {
        self.types.get(type_id).map(|r| r.value().clone())
    }

    /// Get a struct descriptor by type ID
    pub fn get_struct(&self, type_id: &str) -> Option<Arc<StructDescriptor>> {
        self.structs.get(type_id).map(|r| r.value().clone())
    }

    /// Check if a type exists
    pub fn contains(&self, type_id: &str) -> bool {
        self.types.contains_key(type_id)
    }

    /// All registered type IDs, sorted
    pub fn type_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.types.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Get the number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use blueprint_types::FieldDef;

    use super::*;
    use crate::descriptor::same_descriptor;

    const TYPES_TOML: &str = r#"
        [[types]]
        id = "game/Score"
        name = "Score"

        [[types.fields]]
        name = "Player"
        field_type = { type = "String" }

        [[types.fields]]
        name = "Origin"
        field_type = { type = "Struct", struct_id = "game/Vec2" }

        [[types]]
        id = "game/Vec2"
        name = "Vec2"
        fields = [
            { name = "X", field_type = { type = "Real" } },
            { name = "Y", field_type = { type = "Real" }, default = 2.0 },
        ]
    "#;

    #[test]
    fn test_builtin_scalars() {
        let registry = DescriptorRegistry::new();
        assert_eq!(registry.type_ids(), vec!["Boolean", "Integer", "Real"]);
        assert_eq!(registry.get("Integer").unwrap().size(), 4);
        assert_eq!(registry.get("Boolean").unwrap().pin_type(), PinType::Boolean);
    }

    #[test]
    fn test_register_struct() {
        let registry = DescriptorRegistry::new();
        let def = TypeDef::new("test/Pair", "Pair")
            .add_field(FieldDef::new("A", PinType::Integer))
            .add_field(FieldDef::new("B", PinType::Boolean));

        let compiled = registry.register_struct(&def).unwrap();
        let fetched = registry.get("test/Pair").unwrap();
        let compiled: DescriptorRef = compiled;
        assert!(same_descriptor(&compiled, &fetched));
        assert_eq!(fetched.size(), 5);
    }

    #[test]
    fn test_register_duplicate_fails() {
        let registry = DescriptorRegistry::new();
        let def = TypeDef::new("test/Pair", "Pair");
        registry.register_struct(&def).unwrap();

        let result = registry.register_struct(&def);
        assert!(matches!(result, Err(RegistryError::TypeAlreadyExists(_))));

        let builtin = Arc::new(ScalarDescriptor::new("Integer", ScalarKind::Integer));
        assert!(matches!(
            registry.register(builtin),
            Err(RegistryError::TypeAlreadyExists(id)) if id == "Integer"
        ));
    }

    #[test]
    fn test_load_toml_resolves_dependencies() {
        let registry = DescriptorRegistry::new();
        assert_eq!(registry.load_toml(TYPES_TOML).unwrap(), 2);

        let score = registry.get_struct("game/Score").unwrap();
        assert_eq!(score.field_names().collect::<Vec<_>>(), vec!["Player", "Origin"]);
        assert_eq!(score.size(), 4 + 8);
    }

    #[test]
    fn test_unresolved_types() {
        let registry = DescriptorRegistry::new();
        let a = TypeDef::new("t/A", "A").add_field(FieldDef::new("b", PinType::structure("t/B")));
        let b = TypeDef::new("t/B", "B").add_field(FieldDef::new("a", PinType::structure("t/A")));
        let c = TypeDef::new("t/C", "C");

        let err = registry.register_all(vec![a, b, c]).unwrap_err();
        match err {
            RegistryError::UnresolvedTypes(mut ids) => {
                ids.sort();
                assert_eq!(ids, vec!["t/A", "t/B"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(registry.contains("t/C"));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"types": [{{"id": "t/Flag", "name": "Flag", "fields": [{{"name": "On", "field_type": {{"type": "Boolean"}}}}]}}]}}"#
        )
        .unwrap();

        let registry = DescriptorRegistry::new();
        assert_eq!(registry.load_file(file.path()).unwrap(), 1);
        assert_eq!(registry.get("t/Flag").unwrap().size(), 1);

        let missing = registry.load_file(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(RegistryError::Io(_))));
    }
}
