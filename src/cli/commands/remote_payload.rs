//! `remote-payload` command.

use super::emit;
use crate::cli::{RemotePayloadArgs, RuntimeConfig};
use crate::error::Result;
use crate::payload;
use crate::symbol::SymbolRegistry;

/// Harvests payload identities and emits one record per payload.
pub(super) async fn execute_remote_payload(
    args: &RemotePayloadArgs,
    config: &RuntimeConfig,
) -> Result<()> {
    let settings = args.to_settings()?;
    let output = config.output();

    output.info(&format!(
        "Resolving {} payload argument(s) with {} job(s)",
        settings.inputs().len(),
        settings.jobs()
    ));

    let identities = payload::resolve(&settings).await?;

    let registry = SymbolRegistry::with_builtin_definitions();
    let mut symbols = Vec::with_capacity(identities.len());
    for identity in &identities {
        output.verbose(&format!(
            "{} {} ({} bytes)",
            identity.kind, identity.canonical_name, identity.size
        ));
        symbols.push(identity.to_symbol(&registry)?);
    }

    if identities.is_empty() {
        output.warn("No payload files matched");
    }

    emit(
        config,
        &symbols,
        args.output.as_deref(),
        args.intermediate.as_deref(),
    )
    .await
}
