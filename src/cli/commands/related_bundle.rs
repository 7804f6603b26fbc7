//! `related-bundle` command.

use super::emit;
use crate::cli::{RelatedBundleArgs, RuntimeConfig};
use crate::error::Result;
use crate::relation::{self, BundleRelation, RelatedBundleAction};
use crate::symbol::{SourceLineNumber, SymbolRegistry};

/// Classifies one declared bundle relationship and emits its record.
pub(super) async fn execute_related_bundle(
    args: &RelatedBundleArgs,
    config: &RuntimeConfig,
) -> Result<()> {
    let relation = BundleRelation {
        bundle_id: args.bundle_id.trim().to_string(),
        action: args.action.parse::<RelatedBundleAction>()?,
    };

    let registry = SymbolRegistry::with_builtin_definitions();
    let symbol = relation::classify(
        &registry,
        &relation,
        Some(SourceLineNumber::file("--bundle-id")),
    )?
    .into_symbol();

    config.output().verbose(&format!(
        "{} relationship to {}",
        relation.action, relation.bundle_id
    ));

    emit(
        config,
        std::slice::from_ref(&symbol),
        args.output.as_deref(),
        args.intermediate.as_deref(),
    )
    .await
}
