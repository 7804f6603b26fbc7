//! Bundle relationships.
//!
//! A related bundle is another, previously built bundle that the bundle under
//! construction detects, upgrades, extends or patches. The binder only
//! records the relationship; the bootstrapper engine decides what to do with
//! it at install time.

use crate::symbol::{
    self, FieldDefinition, FieldIndex, FieldType, Identifier, SourceLineNumber, Symbol,
    SymbolDefinition, SymbolRegistry,
};
use std::fmt;
use std::str::FromStr;
use thiserror::Error as DeriveError;

/// Name of the related bundle symbol definition.
pub const RELATED_BUNDLE: &str = "WixRelatedBundle";

/// Relation errors.
#[derive(Debug, DeriveError, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Stored or supplied action value is not one of the four kinds.
    #[error("invalid related bundle action: {0}")]
    InvalidAction(String),

    /// Related bundle id must not be empty.
    #[error("related bundle id must not be empty")]
    EmptyBundleId,

    /// Required field missing from a loaded symbol.
    #[error("related bundle symbol is missing its {0} field")]
    MissingField(&'static str),

    /// Underlying symbol model error.
    #[error(transparent)]
    Symbol(#[from] symbol::Error),
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Fields of the related bundle definition, in index order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RelatedBundleField {
    /// Id of the related bundle
    BundleId,
    /// [`RelatedBundleAction`], stored as a number
    Action,
}

impl FieldIndex for RelatedBundleField {
    fn index(self) -> usize {
        self as usize
    }
}

/// Returns the related bundle definition.
pub fn related_bundle_definition() -> SymbolDefinition {
    SymbolDefinition::new(
        RELATED_BUNDLE,
        vec![
            FieldDefinition::new("BundleId", FieldType::String),
            FieldDefinition::new("Action", FieldType::Number),
        ],
    )
}

/// How the bundle being built relates to another bundle.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RelatedBundleAction {
    /// Acknowledge presence only.
    Detect,
    /// Supersede an older installed bundle.
    Upgrade,
    /// Install alongside the related bundle.
    Addon,
    /// Apply on top of the installed bundle.
    Patch,
}

impl RelatedBundleAction {
    /// All kinds, in stored-number order.
    pub const ALL: [RelatedBundleAction; 4] = [
        RelatedBundleAction::Detect,
        RelatedBundleAction::Upgrade,
        RelatedBundleAction::Addon,
        RelatedBundleAction::Patch,
    ];

    /// Manifest name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelatedBundleAction::Detect => "Detect",
            RelatedBundleAction::Upgrade => "Upgrade",
            RelatedBundleAction::Addon => "Addon",
            RelatedBundleAction::Patch => "Patch",
        }
    }

    /// Number stored in the symbol's `Action` field.
    pub fn as_number(&self) -> i32 {
        *self as i32
    }
}

impl fmt::Display for RelatedBundleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<i32> for RelatedBundleAction {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or_else(|| Error::InvalidAction(value.to_string()))
    }
}

impl FromStr for RelatedBundleAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidAction(s.to_string()))
    }
}

/// Declared relationship to another bundle.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BundleRelation {
    /// Id of the related bundle, never empty
    pub bundle_id: String,
    /// Relationship kind
    pub action: RelatedBundleAction,
}

/// Typed view of a `WixRelatedBundle` symbol.
#[derive(Clone, Debug, PartialEq)]
pub struct RelatedBundleSymbol {
    symbol: Symbol,
}

impl RelatedBundleSymbol {
    /// Wraps an existing symbol after checking its definition.
    pub fn from_symbol(symbol: Symbol) -> Result<Self> {
        if symbol.definition().name() != RELATED_BUNDLE {
            return Err(symbol::Error::UnknownDefinition(
                symbol.definition().name().to_string(),
            )
            .into());
        }
        Ok(Self { symbol })
    }

    /// Id of the related bundle.
    pub fn bundle_id(&self) -> Result<&str> {
        self.symbol
            .get_str(RelatedBundleField::BundleId)?
            .ok_or(Error::MissingField("BundleId"))
    }

    /// Relationship kind.
    pub fn action(&self) -> Result<RelatedBundleAction> {
        let raw = self
            .symbol
            .get_number(RelatedBundleField::Action)?
            .ok_or(Error::MissingField("Action"))?;
        RelatedBundleAction::try_from(raw)
    }

    /// Reads both fields back into a plain relation.
    pub fn relation(&self) -> Result<BundleRelation> {
        Ok(BundleRelation {
            bundle_id: self.bundle_id()?.to_string(),
            action: self.action()?,
        })
    }

    /// The underlying generic symbol.
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Unwraps into the generic symbol.
    pub fn into_symbol(self) -> Symbol {
        self.symbol
    }
}

/// Builds the related bundle symbol for one declared relationship.
///
/// Stateless; each call yields an independent symbol.
pub fn classify(
    registry: &SymbolRegistry,
    relation: &BundleRelation,
    source: Option<SourceLineNumber>,
) -> Result<RelatedBundleSymbol> {
    if relation.bundle_id.trim().is_empty() {
        return Err(Error::EmptyBundleId);
    }

    let definition = registry.get(RELATED_BUNDLE)?;
    let id = Identifier::new(format!(
        "{}.{}",
        relation.action.as_str(),
        relation.bundle_id
    ));
    let mut symbol = Symbol::new(definition, source, Some(id));
    symbol.set(RelatedBundleField::BundleId, relation.bundle_id.as_str())?;
    symbol.set(RelatedBundleField::Action, relation.action.as_number())?;

    log::debug!(
        "Classified related bundle {} as {}",
        relation.bundle_id,
        relation.action
    );

    Ok(RelatedBundleSymbol { symbol })
}
