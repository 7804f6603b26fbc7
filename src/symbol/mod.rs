//! Typed symbol model.
//!
//! Every fact the binder produces is carried as a [`Symbol`]: a fixed,
//! ordered set of typed fields described by a [`SymbolDefinition`].
//! Definitions live in an explicit [`SymbolRegistry`] built at startup and
//! passed to whoever creates symbols.
//!
//! A symbol flattens to one optional [`FieldValue`] per field
//! ([`Symbol::to_values`]) and can be rebuilt from that list, which is the
//! serialization contract for the intermediate representation.

mod definition;
mod error;
mod field;
mod intermediate;

pub use definition::{DefinitionHandle, SymbolDefinition, SymbolRegistry};
pub use error::{Error, Result};
pub use field::{FieldDefinition, FieldIndex, FieldType, FieldValue};
pub use intermediate::{Identifier, SerializedSymbol, SourceLineNumber, Symbol};
