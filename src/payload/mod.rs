//! Remote payload identity.
//!
//! Turns local files that stand in for remotely hosted payloads into
//! content-addressed identities: SHA-512 hash, byte size, PE version fields,
//! signer certificate and download URL.
//!
//! # Pipeline
//!
//! 1. [`expand`] turns file, directory and wildcard arguments into candidates
//! 2. [`hash`] computes the content digest of each candidate
//! 3. [`format`] classifies the file and reads version metadata
//! 4. [`certificate`] extracts the signer identity when requested
//! 5. [`resolver`] runs 2-4 concurrently and restores expansion order
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_payload::payload::{self, HarvestSettingsBuilder};
//!
//! # async fn example() -> payload::Result<()> {
//! let settings = HarvestSettingsBuilder::new()
//!     .input("burn.exe")
//!     .download_url("https://www.example.com/files/{0}")
//!     .build()?;
//!
//! for identity in payload::resolve(&settings).await? {
//!     println!("{} {} {}", identity.name, identity.size, identity.hash);
//! }
//! # Ok(())
//! # }
//! ```

pub mod certificate;
mod der;
mod error;
pub mod expand;
pub mod format;
pub mod hash;
pub mod resolver;
mod settings;

pub use certificate::CertificateIdentity;
pub use error::{Context, Error, ErrorExt, Result};
pub use format::{PayloadKind, VersionInfo};
pub use resolver::{harvest, resolve};
pub use settings::{HarvestSettings, HarvestSettingsBuilder, PayloadArgument, URL_PLACEHOLDER};

use crate::symbol::{
    FieldDefinition, FieldIndex, FieldType, Identifier, SourceLineNumber, Symbol,
    SymbolDefinition, SymbolRegistry,
};
use std::path::PathBuf;

/// Name of the remote payload symbol definition.
pub const REMOTE_PAYLOAD: &str = "WixBundleRemotePayload";

/// Fields of the remote payload definition, in index order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RemotePayloadField {
    /// Record name (file name)
    Name,
    /// [`PayloadKind`] number
    Kind,
    /// Local file the identity was computed from
    SourceFile,
    /// Base-path relative name used for the download URL
    CanonicalName,
    /// Download URL
    DownloadUrl,
    /// SHA-512, uppercase hex
    Hash,
    /// Byte size
    Size,
    /// PE `ProductName`
    ProductName,
    /// PE `FileDescription`
    Description,
    /// PE file version
    Version,
    /// Signer public key hash
    CertificatePublicKey,
    /// Signer certificate thumbprint
    CertificateThumbprint,
}

impl FieldIndex for RemotePayloadField {
    fn index(self) -> usize {
        self as usize
    }
}

/// Returns the remote payload definition.
pub fn remote_payload_definition() -> SymbolDefinition {
    SymbolDefinition::new(
        REMOTE_PAYLOAD,
        vec![
            FieldDefinition::new("Name", FieldType::String),
            FieldDefinition::new("Kind", FieldType::Number),
            FieldDefinition::new("SourceFile", FieldType::Path),
            FieldDefinition::new("CanonicalName", FieldType::String),
            FieldDefinition::new("DownloadUrl", FieldType::String),
            FieldDefinition::new("Hash", FieldType::String),
            FieldDefinition::new("Size", FieldType::LargeNumber),
            FieldDefinition::new("ProductName", FieldType::String),
            FieldDefinition::new("Description", FieldType::String),
            FieldDefinition::new("Version", FieldType::String),
            FieldDefinition::new("CertificatePublicKey", FieldType::String),
            FieldDefinition::new("CertificateThumbprint", FieldType::String),
        ],
    )
}

/// Facts computed from a file's bytes, independent of where it was found.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedContent {
    /// Manifest element kind
    pub kind: PayloadKind,
    /// SHA-512, uppercase hex
    pub hash: String,
    /// Byte size
    pub size: u64,
    /// PE version fields
    pub version_info: Option<VersionInfo>,
    /// Signer identity, only when requested and present
    pub certificate: Option<CertificateIdentity>,
}

/// Complete identity of one remote payload.
#[derive(Clone, Debug, PartialEq)]
pub struct PayloadIdentity {
    /// Absolute path of the local representative file
    pub source_path: PathBuf,
    /// File name, emitted as the record name
    pub name: String,
    /// Base-path relative path with forward slashes
    pub canonical_name: String,
    /// Download URL, when one was computed
    pub download_url: Option<String>,
    /// Manifest element kind
    pub kind: PayloadKind,
    /// SHA-512 of the exact file bytes, uppercase hex
    pub hash: String,
    /// Exact byte count
    pub size: u64,
    /// PE version fields
    pub version_info: Option<VersionInfo>,
    /// Signer identity
    pub certificate: Option<CertificateIdentity>,
}

impl PayloadIdentity {
    /// Records this identity as a remote payload symbol.
    pub fn to_symbol(&self, registry: &SymbolRegistry) -> Result<Symbol> {
        let definition = registry.get(REMOTE_PAYLOAD)?;
        let mut symbol = Symbol::new(
            definition,
            Some(SourceLineNumber::file(&self.source_path)),
            Some(Identifier::new(self.canonical_name.as_str())),
        );

        let version = self.version_info.as_ref();
        let certificate = self.certificate.as_ref();

        symbol.set(RemotePayloadField::Name, self.name.as_str())?;
        symbol.set(RemotePayloadField::Kind, self.kind.as_number())?;
        symbol.set(
            RemotePayloadField::SourceFile,
            self.source_path.to_string_lossy().into_owned(),
        )?;
        symbol.set(RemotePayloadField::CanonicalName, self.canonical_name.as_str())?;
        symbol.set_optional(RemotePayloadField::DownloadUrl, self.download_url.as_deref())?;
        symbol.set(RemotePayloadField::Hash, self.hash.as_str())?;
        symbol.set(RemotePayloadField::Size, self.size)?;
        symbol.set_optional(
            RemotePayloadField::ProductName,
            version.and_then(|v| v.product_name.as_deref()),
        )?;
        symbol.set_optional(
            RemotePayloadField::Description,
            version.and_then(|v| v.description.as_deref()),
        )?;
        symbol.set_optional(
            RemotePayloadField::Version,
            version.and_then(|v| v.file_version.as_deref()),
        )?;
        symbol.set_optional(
            RemotePayloadField::CertificatePublicKey,
            certificate.map(|c| c.public_key.as_str()),
        )?;
        symbol.set_optional(
            RemotePayloadField::CertificateThumbprint,
            certificate.map(|c| c.thumbprint.as_str()),
        )?;

        Ok(symbol)
    }
}
