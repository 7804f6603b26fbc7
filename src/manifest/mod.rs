//! Manifest emission.
//!
//! Renders resolved symbols as manifest records, one XML element per line:
//!
//! ```text
//! <ExePackagePayload Name="burn.exe" ProductName="..." DownloadUrl="..." Hash="..." Size="463360" Version="3.14.1703.0" />
//! <RelatedBundle BundleId="{...}" Action="Upgrade" />
//! ```
//!
//! Optional attributes are omitted when their field is unset. Rendering is
//! done in full before anything touches the output file, so a failed run
//! never leaves a partial manifest behind.

use crate::payload::{PayloadKind, REMOTE_PAYLOAD, RemotePayloadField};
use crate::relation::{RELATED_BUNDLE, RelatedBundleAction, RelatedBundleField};
use crate::symbol::{self, Symbol};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Element name of a relation record.
pub const RELATED_BUNDLE_ELEMENT: &str = "RelatedBundle";

/// Manifest emission errors
#[derive(Debug, Error)]
pub enum Error {
    /// The symbol's definition has no manifest record.
    #[error("symbols of type {0} have no manifest record")]
    UnsupportedDefinition(String),

    /// A required field is unset.
    #[error("{definition} symbol is missing required field {field}")]
    MissingField {
        /// Definition name
        definition: String,
        /// Field name
        field: &'static str,
    },

    /// The payload kind number is not a known kind.
    #[error("unknown payload kind {0}")]
    InvalidKind(i32),

    /// Relation record with an unknown action.
    #[error(transparent)]
    Relation(#[from] crate::relation::Error),

    /// Field access error.
    #[error(transparent)]
    Symbol(#[from] symbol::Error),

    /// Writing an output file failed.
    #[error("failed to write {path}: {error}")]
    Write {
        /// Output path
        path: PathBuf,
        /// Underlying error
        #[source]
        error: std::io::Error,
    },
}

/// Convenience alias for manifest results.
pub type Result<T> = std::result::Result<T, Error>;

/// One manifest record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    name: &'static str,
    attributes: Vec<(&'static str, String)>,
}

impl Element {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            attributes: Vec::new(),
        }
    }

    fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attributes.push((name, value.into()));
        self
    }

    fn opt_attr(self, name: &'static str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.attr(name, value),
            None => self,
        }
    }

    /// Element name.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Value of an attribute, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        for (name, value) in &self.attributes {
            write!(f, " {}=\"{}\"", name, escape(value))?;
        }
        f.write_str(" />")
    }
}

/// Builds the manifest record for a symbol.
pub fn element(symbol: &Symbol) -> Result<Element> {
    match symbol.definition().name() {
        REMOTE_PAYLOAD => payload_element(symbol),
        RELATED_BUNDLE => relation_element(symbol),
        other => Err(Error::UnsupportedDefinition(other.to_string())),
    }
}

/// Renders every symbol, one record per line, in the given order.
pub fn render(symbols: &[Symbol]) -> Result<String> {
    let mut out = String::new();
    for symbol in symbols {
        out.push_str(&element(symbol)?.to_string());
        out.push('\n');
    }
    Ok(out)
}

/// Renders `symbols` and writes them to `path`, creating parent directories.
pub async fn write(path: &Path, symbols: &[Symbol]) -> Result<()> {
    let rendered = render(symbols)?;
    write_rendered(path, &rendered).await?;
    log::info!("Wrote {} manifest record(s) to {}", symbols.len(), path.display());
    Ok(())
}

/// Writes already rendered records to `path`, creating parent directories.
pub async fn write_rendered(path: &Path, rendered: &str) -> Result<()> {
    write_output(path, rendered.as_bytes()).await
}

/// Writes one output file, creating parent directories.
pub async fn write_output(path: &Path, contents: &[u8]) -> Result<()> {
    let io_error = |error| Error::Write {
        path: path.to_path_buf(),
        error,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
    }
    tokio::fs::write(path, contents).await.map_err(io_error)
}

/// Removes an output file written earlier in a run that later failed.
pub async fn discard_output(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        log::warn!("Failed to remove partial output {}: {}", path.display(), e);
    }
}

fn payload_element(symbol: &Symbol) -> Result<Element> {
    let kind_number = required(symbol, "Kind", symbol.get_number(RemotePayloadField::Kind)?)?;
    let kind = PayloadKind::from_number(kind_number).ok_or(Error::InvalidKind(kind_number))?;
    let name = required(symbol, "Name", symbol.get_str(RemotePayloadField::Name)?)?;
    let hash = required(symbol, "Hash", symbol.get_str(RemotePayloadField::Hash)?)?;
    let size = required(symbol, "Size", symbol.get_large_number(RemotePayloadField::Size)?)?;

    Ok(Element::new(kind.element_name())
        .attr("Name", name)
        .opt_attr("ProductName", symbol.get_str(RemotePayloadField::ProductName)?)
        .opt_attr("Description", symbol.get_str(RemotePayloadField::Description)?)
        .opt_attr(
            "CertificatePublicKey",
            symbol.get_str(RemotePayloadField::CertificatePublicKey)?,
        )
        .opt_attr(
            "CertificateThumbprint",
            symbol.get_str(RemotePayloadField::CertificateThumbprint)?,
        )
        .opt_attr("DownloadUrl", symbol.get_str(RemotePayloadField::DownloadUrl)?)
        .attr("Hash", hash)
        .attr("Size", size.to_string())
        .opt_attr("Version", symbol.get_str(RemotePayloadField::Version)?))
}

fn relation_element(symbol: &Symbol) -> Result<Element> {
    let bundle_id = required(symbol, "BundleId", symbol.get_str(RelatedBundleField::BundleId)?)?;
    let action = RelatedBundleAction::try_from(required(
        symbol,
        "Action",
        symbol.get_number(RelatedBundleField::Action)?,
    )?)?;

    Ok(Element::new(RELATED_BUNDLE_ELEMENT)
        .attr("BundleId", bundle_id)
        .attr("Action", action.as_str()))
}

fn required<T>(symbol: &Symbol, field: &'static str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| Error::MissingField {
        definition: symbol.definition().name().to_string(),
        field,
    })
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\n' => escaped.push_str("&#xA;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
