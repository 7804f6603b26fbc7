//! kodegen_bundler_payload - payload identity and bundle relation binder.
//!
//! Resolves remote payload files into manifest records and declares bundle
//! relationships. Exit code 0 on success, 1 when a command fails and 2 for
//! invalid arguments.

use kodegen_bundler_payload::cli;
use kodegen_bundler_payload::cli::OutputManager;
use std::process;

#[tokio::main]
async fn main() {
    env_logger::init();

    match cli::run().await {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            let output = OutputManager::new(false, false);
            output.error(&format!("Fatal error: {e}"));
            for suggestion in e.recovery_suggestions() {
                output.error_detail(&suggestion);
            }
            process::exit(1);
        }
    }
}
