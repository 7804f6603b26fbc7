//! Intermediate symbols and their flat serialized form.

use super::definition::{DefinitionHandle, SymbolRegistry};
use super::error::{Error, Result};
use super::field::{FieldIndex, FieldType, FieldValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a symbol came from, for diagnostics.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SourceLineNumber {
    /// Source file or argument that produced the symbol
    pub file: PathBuf,
    /// Line within the file, when the source is line oriented
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl SourceLineNumber {
    /// Tags a whole file without a line.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            file: path.as_ref().to_path_buf(),
            line: None,
        }
    }
}

impl fmt::Display for SourceLineNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}({})", self.file.display(), line),
            None => write!(f, "{}", self.file.display()),
        }
    }
}

/// Stable symbol identifier. Never changes once assigned.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Creates an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A typed record whose layout is fixed by its [`SymbolDefinition`](super::SymbolDefinition).
///
/// Every read and write goes through the definition, so a field can only
/// ever hold a value of its declared type. Unset fields hold `None`.
#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    definition: DefinitionHandle,
    source: Option<SourceLineNumber>,
    id: Option<Identifier>,
    fields: Vec<Option<FieldValue>>,
}

impl Symbol {
    /// Creates a symbol with every field unset.
    pub fn new(
        definition: DefinitionHandle,
        source: Option<SourceLineNumber>,
        id: Option<Identifier>,
    ) -> Self {
        let fields = vec![None; definition.field_count()];
        Self {
            definition,
            source,
            id,
            fields,
        }
    }

    /// The definition this symbol conforms to.
    pub fn definition(&self) -> &DefinitionHandle {
        &self.definition
    }

    /// Source location tag.
    pub fn source(&self) -> Option<&SourceLineNumber> {
        self.source.as_ref()
    }

    /// Stable identifier.
    pub fn id(&self) -> Option<&Identifier> {
        self.id.as_ref()
    }

    /// Reads a field. Unset fields read as `None`.
    pub fn get(&self, field: impl FieldIndex) -> Result<Option<&FieldValue>> {
        let index = field.index();
        self.definition.field(index)?;
        Ok(self.fields[index].as_ref())
    }

    /// Writes a field, checking the value against the declared type.
    pub fn set(&mut self, field: impl FieldIndex, value: impl Into<FieldValue>) -> Result<()> {
        let index = field.index();
        let value = value.into();
        self.check(index, &value)?;
        self.fields[index] = Some(value);
        Ok(())
    }

    /// Writes a field if `value` is present, otherwise clears it.
    pub fn set_optional<V: Into<FieldValue>>(
        &mut self,
        field: impl FieldIndex,
        value: Option<V>,
    ) -> Result<()> {
        let index = field.index();
        match value {
            Some(value) => self.set(index, value),
            None => {
                self.definition.field(index)?;
                self.fields[index] = None;
                Ok(())
            }
        }
    }

    /// Reads a string or path field.
    pub fn get_str(&self, field: impl FieldIndex) -> Result<Option<&str>> {
        let index = field.index();
        self.expect_type(index, &[FieldType::String, FieldType::Path], "string")?;
        Ok(self.fields[index].as_ref().and_then(FieldValue::as_str))
    }

    /// Reads a number field.
    pub fn get_number(&self, field: impl FieldIndex) -> Result<Option<i32>> {
        let index = field.index();
        self.expect_type(index, &[FieldType::Number], "number")?;
        Ok(self.fields[index].as_ref().and_then(FieldValue::as_number))
    }

    /// Reads a large number field.
    pub fn get_large_number(&self, field: impl FieldIndex) -> Result<Option<u64>> {
        let index = field.index();
        self.expect_type(index, &[FieldType::LargeNumber], "large number")?;
        Ok(self.fields[index].as_ref().and_then(FieldValue::as_large_number))
    }

    /// Reads a boolean field.
    pub fn get_bool(&self, field: impl FieldIndex) -> Result<Option<bool>> {
        let index = field.index();
        self.expect_type(index, &[FieldType::Bool], "bool")?;
        Ok(self.fields[index].as_ref().and_then(FieldValue::as_bool))
    }

    /// Flattens the fields into an ordered value list, one entry per field.
    pub fn to_values(&self) -> Vec<Option<FieldValue>> {
        self.fields.clone()
    }

    /// Rebuilds a symbol from a flat value list produced by [`Symbol::to_values`].
    pub fn from_values(
        definition: DefinitionHandle,
        source: Option<SourceLineNumber>,
        id: Option<Identifier>,
        values: Vec<Option<FieldValue>>,
    ) -> Result<Self> {
        if values.len() != definition.field_count() {
            return Err(Error::ValueCount {
                definition: definition.name().to_string(),
                expected: definition.field_count(),
                actual: values.len(),
            });
        }

        let mut symbol = Self::new(definition, source, id);
        for (index, value) in values.into_iter().enumerate() {
            if let Some(value) = value {
                let field_type = symbol.definition.field_type(index)?;
                symbol.set(index, value.normalize(field_type))?;
            }
        }
        Ok(symbol)
    }

    /// Converts to the serializable IR form.
    pub fn to_serialized(&self) -> SerializedSymbol {
        SerializedSymbol {
            definition: self.definition.name().to_string(),
            id: self.id.clone(),
            source: self.source.clone(),
            fields: self.to_values(),
        }
    }

    fn check(&self, index: usize, value: &FieldValue) -> Result<()> {
        let field = self.definition.field(index)?;
        if value.fits(field.field_type) {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                definition: self.definition.name().to_string(),
                field: field.name.clone(),
                expected: field.field_type,
                actual: value.kind().to_string(),
            })
        }
    }

    fn expect_type(&self, index: usize, accepted: &[FieldType], requested: &str) -> Result<()> {
        let field = self.definition.field(index)?;
        if accepted.contains(&field.field_type) {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                definition: self.definition.name().to_string(),
                field: field.name.clone(),
                expected: field.field_type,
                actual: requested.to_string(),
            })
        }
    }
}

/// Flat, serializable form of a [`Symbol`].
///
/// This is the unit written to the intermediate JSON file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedSymbol {
    /// Definition name
    pub definition: String,
    /// Optional identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Identifier>,
    /// Optional source tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLineNumber>,
    /// One value per declared field, `null` when unset
    pub fields: Vec<Option<FieldValue>>,
}

impl SerializedSymbol {
    /// Rebuilds the symbol using the definition registered in `registry`.
    pub fn into_symbol(self, registry: &SymbolRegistry) -> Result<Symbol> {
        let definition = registry.get(&self.definition)?;
        Symbol::from_values(definition, self.source, self.id, self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{FieldDefinition, SymbolRegistry};

    fn registry() -> (SymbolRegistry, DefinitionHandle) {
        let mut registry = SymbolRegistry::new();
        let handle = registry
            .define(
                "Sample",
                vec![
                    FieldDefinition::new("Name", FieldType::String),
                    FieldDefinition::new("Size", FieldType::LargeNumber),
                    FieldDefinition::new("Kind", FieldType::Number),
                    FieldDefinition::new("Enabled", FieldType::Bool),
                ],
            )
            .expect("define");
        (registry, handle)
    }

    #[test]
    fn test_set_rejects_wrong_kind() {
        let (_, handle) = registry();
        let mut symbol = Symbol::new(handle, None, None);
        let err = symbol.set(1usize, "big").expect_err("must fail");
        assert!(matches!(err, Error::TypeMismatch { ref field, .. } if field == "Size"));
    }

    #[test]
    fn test_out_of_range_index() {
        let (_, handle) = registry();
        let mut symbol = Symbol::new(handle, None, None);
        assert!(matches!(
            symbol.set(4usize, true),
            Err(Error::SchemaViolation { index: 4, field_count: 4, .. })
        ));
        assert!(matches!(symbol.get(9usize), Err(Error::SchemaViolation { .. })));
    }

    #[test]
    fn test_typed_getter_mismatch() {
        let (_, handle) = registry();
        let mut symbol = Symbol::new(handle, None, None);
        symbol.set(0usize, "payload").expect("set");
        assert_eq!(symbol.get_str(0usize), Ok(Some("payload")));
        assert!(matches!(symbol.get_bool(0usize), Err(Error::TypeMismatch { .. })));
        assert_eq!(symbol.get_bool(3usize), Ok(None));
    }

    #[test]
    fn test_flat_round_trip() {
        let (registry, handle) = registry();
        let mut symbol = Symbol::new(
            handle,
            Some(SourceLineNumber::file("a.dat")),
            Some(Identifier::new("pay1")),
        );
        symbol.set(0usize, "a.dat").expect("set");
        symbol.set(1usize, 16u64).expect("set");
        symbol.set(2usize, 2i32).expect("set");
        symbol.set(3usize, false).expect("set");

        let json = serde_json::to_string(&symbol.to_serialized()).expect("serialize");
        let loaded: SerializedSymbol = serde_json::from_str(&json).expect("deserialize");
        let rebuilt = loaded.into_symbol(&registry).expect("rebuild");

        assert_eq!(rebuilt, symbol);
    }

    #[test]
    fn test_from_values_checks_count() {
        let (_, handle) = registry();
        assert!(matches!(
            Symbol::from_values(handle, None, None, vec![None]),
            Err(Error::ValueCount { expected: 4, actual: 1, .. })
        ));
    }
}
