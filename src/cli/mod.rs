//! Command line interface for kodegen_bundler_payload.
//!
//! Argument parsing, command dispatch and colored user feedback.

mod args;
pub mod commands;
mod output;

pub use args::{
    Args, Command, DOWNLOAD_URL_ENV, RelatedBundleArgs, RemotePayloadArgs, RuntimeConfig,
    validate_download_url,
};
pub use commands::execute_command;
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}
