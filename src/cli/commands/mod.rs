//! Command execution.
//!
//! Each subcommand produces an ordered list of symbols. Emission is shared:
//! the manifest first, then the optional JSON intermediate. Nothing is
//! written unless the command produced every symbol, and a failed write
//! removes whatever this run already wrote.

mod related_bundle;
mod remote_payload;

use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::{BinderError, Result};
use crate::manifest;
use crate::symbol::{SerializedSymbol, Symbol};
use std::io::Write;
use std::path::Path;

use related_bundle::execute_related_bundle;
use remote_payload::execute_remote_payload;

/// Execute the command based on parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    if let Err(validation_error) = args.validate() {
        let output = super::OutputManager::new(false, false);
        let error = BinderError::from(validation_error);
        output.error(&error.to_string());
        for suggestion in error.recovery_suggestions() {
            output.error_detail(&format!("• {}", suggestion));
        }
        return Ok(2);
    }

    let config = RuntimeConfig::from(&args);

    let result = match &args.command {
        Command::RemotePayload(remote) => execute_remote_payload(remote, &config).await,
        Command::RelatedBundle(related) => execute_related_bundle(related, &config).await,
    };

    match result {
        Ok(()) => Ok(0),
        Err(e) => {
            let output = config.output();
            output.error(&format!("Command '{}' failed: {}", args.command.name(), e));
            for suggestion in e.recovery_suggestions() {
                output.error_detail(&format!("• {}", suggestion));
            }
            Ok(1)
        }
    }
}

/// Writes the manifest and the intermediate JSON (if requested).
///
/// Both are serialized before any file is touched. If the second write
/// fails the first output is removed, so a failed run leaves neither.
async fn emit(
    config: &RuntimeConfig,
    symbols: &[Symbol],
    output: Option<&Path>,
    intermediate: Option<&Path>,
) -> Result<()> {
    let rendered = manifest::render(symbols)?;
    let intermediate = match intermediate {
        Some(path) => {
            let serialized: Vec<SerializedSymbol> = symbols.iter().map(Symbol::to_serialized).collect();
            Some((path, serde_json::to_vec_pretty(&serialized)?))
        }
        None => None,
    };

    match output {
        Some(path) => {
            manifest::write_rendered(path, &rendered).await?;
            if let Some((json_path, json)) = &intermediate
                && let Err(e) = manifest::write_output(json_path, json).await
            {
                manifest::discard_output(path).await;
                return Err(e.into());
            }
            config.output().success(&format!(
                "Wrote {} record(s) to {}",
                symbols.len(),
                path.display()
            ));
        }
        None => {
            if let Some((json_path, json)) = &intermediate {
                manifest::write_output(json_path, json).await?;
            }
            let written = {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(rendered.as_bytes()).and_then(|()| stdout.flush())
            };
            if let Err(e) = written {
                if let Some((json_path, _)) = &intermediate {
                    manifest::discard_output(json_path).await;
                }
                return Err(e.into());
            }
        }
    }

    if let Some((json_path, _)) = &intermediate {
        config
            .output()
            .verbose(&format!("Wrote intermediate symbols to {}", json_path.display()));
    }
    Ok(())
}
