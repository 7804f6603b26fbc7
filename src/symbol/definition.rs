//! Symbol definitions and the registry that owns them.

use super::error::{Error, Result};
use super::field::{FieldDefinition, FieldType};
use std::collections::HashMap;
use std::sync::Arc;

/// Shared handle to a registered definition.
pub type DefinitionHandle = Arc<SymbolDefinition>;

/// Fixed, ordered field layout of one symbol kind.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SymbolDefinition {
    name: String,
    fields: Vec<FieldDefinition>,
}

impl SymbolDefinition {
    /// Creates a definition from an ordered field list.
    pub fn new(name: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Definition name, e.g. `WixRelatedBundle`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields in index order.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Number of declared fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Looks up a field by index, failing with `SchemaViolation` when out of range.
    pub fn field(&self, index: usize) -> Result<&FieldDefinition> {
        self.fields.get(index).ok_or_else(|| Error::SchemaViolation {
            definition: self.name.clone(),
            index,
            field_count: self.fields.len(),
        })
    }

    /// Declared type of the field at `index`.
    pub fn field_type(&self, index: usize) -> Result<FieldType> {
        self.field(index).map(|f| f.field_type)
    }
}

/// Registry of symbol definitions.
///
/// Constructed once per process and passed by reference to every component
/// that creates symbols. There is no global table.
#[derive(Debug, Default)]
pub struct SymbolRegistry {
    definitions: HashMap<String, DefinitionHandle>,
}

impl SymbolRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the definitions this crate produces
    /// (related bundles and remote payloads).
    pub fn with_builtin_definitions() -> Self {
        let mut registry = Self::new();
        for definition in [
            crate::relation::related_bundle_definition(),
            crate::payload::remote_payload_definition(),
        ] {
            // Builtin names are distinct.
            registry
                .definitions
                .insert(definition.name().to_string(), Arc::new(definition));
        }
        registry
    }

    /// Registers a new definition from an ordered field type list.
    pub fn define(
        &mut self,
        name: impl Into<String>,
        fields: Vec<FieldDefinition>,
    ) -> Result<DefinitionHandle> {
        let name = name.into();
        if self.definitions.contains_key(&name) {
            return Err(Error::DuplicateDefinition(name));
        }
        let handle = Arc::new(SymbolDefinition::new(name.clone(), fields));
        self.definitions.insert(name, Arc::clone(&handle));
        Ok(handle)
    }

    /// Returns the definition registered under `name`.
    pub fn get(&self, name: &str) -> Result<DefinitionHandle> {
        self.definitions
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownDefinition(name.to_string()))
    }

    /// Number of registered definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
