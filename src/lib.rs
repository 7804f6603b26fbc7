//! # Kodegen Bundler Payload
//!
//! Binder layer for installer bundles: turns local files that stand in for
//! remotely downloaded payloads into content-addressed manifest records, and
//! declares how a bundle relates to other bundles.
//!
//! ## Features
//!
//! - **Content identity**: SHA-512 hash, exact size, PE version resource
//!   fields and Windows update package detection
//! - **Signer identity**: public key hash and thumbprint of the leaf
//!   Authenticode certificate, without trust evaluation
//! - **Deterministic expansion**: files, wildcards and recursive directory
//!   walks in a stable order, with base-path relative download URLs
//! - **Typed symbols**: schema-checked records with a flat JSON form
//!
//! ## Usage
//!
//! ```bash
//! kodegen_bundler_payload remote-payload burn.exe -u https://www.example.com/files/{0} -o out.xml
//! kodegen_bundler_payload remote-payload -r -b payloads 'payloads/*' -c -o out.xml
//! kodegen_bundler_payload related-bundle --bundle-id {GUID} --action upgrade
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cli;
pub mod error;
pub mod manifest;
pub mod payload;
pub mod relation;
pub mod symbol;

pub use cli::Args;
pub use error::{BinderError, CliError, Result};
pub use payload::{HarvestSettings, HarvestSettingsBuilder, PayloadIdentity, PayloadKind};
pub use relation::{BundleRelation, RelatedBundleAction};
pub use symbol::{Symbol, SymbolRegistry};
