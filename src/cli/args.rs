//! Command line argument parsing and validation.
//!
//! Two subcommands: `remote-payload` harvests payload identities from local
//! files, `related-bundle` declares a relationship to another bundle. Both
//! write manifest records to `--output` or stdout.

use crate::error::CliError;
use crate::payload::{HarvestSettings, HarvestSettingsBuilder, PayloadArgument, URL_PLACEHOLDER};
use crate::relation::RelatedBundleAction;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Environment variable holding a default download URL template
pub const DOWNLOAD_URL_ENV: &str = "KODEGEN_PAYLOAD_DOWNLOAD_URL";

/// Binder for installer bundle payloads and bundle relations
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_bundler_payload",
    version,
    about = "Content-addressed payload manifests for installer bundles",
    long_about = "Computes hash, size, version and signer identity for files that an installer
bundle downloads at install time, and declares relationships to other bundles.

Usage:
  kodegen_bundler_payload remote-payload setup.exe -u https://example.com/files/{0} -o out.xml
  kodegen_bundler_payload remote-payload -r -b payloads 'payloads/*' -c
  kodegen_bundler_payload related-bundle --bundle-id {GUID} --action upgrade"
)]
pub struct Args {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Show per-payload progress
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Harvest remote payload identities from local files
    #[command(alias = "remotepayload")]
    RemotePayload(RemotePayloadArgs),

    /// Declare a relationship to another bundle
    #[command(alias = "relatedbundle")]
    RelatedBundle(RelatedBundleArgs),
}

impl Command {
    /// Subcommand name for messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::RemotePayload(_) => "remote-payload",
            Command::RelatedBundle(_) => "related-bundle",
        }
    }
}

/// Arguments of `remote-payload`
#[derive(clap::Args, Debug, Clone)]
pub struct RemotePayloadArgs {
    /// Payload files, directories or wildcard patterns
    #[arg(value_name = "FILES", required = true)]
    pub files: Vec<PathBuf>,

    /// Manifest output file (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Download URL template; `{0}` is replaced by the payload's relative path
    #[arg(
        short = 'u',
        long,
        visible_alias = "downloadurl",
        alias = "du",
        env = DOWNLOAD_URL_ENV,
        value_name = "TEMPLATE"
    )]
    pub download_url: Option<String>,

    /// Directory that relative download paths are computed from
    #[arg(short, long = "base-path", visible_alias = "basepath", alias = "bp", value_name = "DIR")]
    pub base_paths: Vec<PathBuf>,

    /// Walk directories and apply base paths
    #[arg(short, long)]
    pub recurse: bool,

    /// Record the signer certificate of signed payloads
    #[arg(short = 'c', long, visible_alias = "usecertificate")]
    pub use_certificate: bool,

    /// Download URL for one specific file, as PATH=URL
    #[arg(long = "payload-url", value_name = "PATH=URL")]
    pub payload_urls: Vec<String>,

    /// Also write the symbols as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub intermediate: Option<PathBuf>,

    /// Payloads resolved concurrently (default: one per CPU)
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,
}

/// Arguments of `related-bundle`
#[derive(clap::Args, Debug, Clone)]
pub struct RelatedBundleArgs {
    /// Id of the related bundle
    #[arg(long, visible_alias = "id", value_name = "ID")]
    pub bundle_id: String,

    /// Relationship: detect, upgrade, addon or patch
    #[arg(long, default_value = "detect", value_name = "ACTION")]
    pub action: String,

    /// Manifest output file (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Also write the symbol as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub intermediate: Option<PathBuf>,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), CliError> {
        match &self.command {
            Command::RemotePayload(args) => args.validate(),
            Command::RelatedBundle(args) => args.validate(),
        }
    }

    /// Where the manifest goes; `None` means stdout.
    pub fn output(&self) -> Option<&PathBuf> {
        match &self.command {
            Command::RemotePayload(args) => args.output.as_ref(),
            Command::RelatedBundle(args) => args.output.as_ref(),
        }
    }
}

impl RemotePayloadArgs {
    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), CliError> {
        if self.files.is_empty() {
            return Err(CliError::MissingArgument {
                argument: "FILES".to_string(),
            });
        }

        if let Some(template) = &self.download_url {
            validate_download_url(template)?;
        }

        if self.jobs == Some(0) {
            return Err(invalid("--jobs must be at least 1".to_string()));
        }

        for entry in &self.payload_urls {
            let (path, url) = split_payload_url(entry).map_err(invalid)?;
            url::Url::parse(url).map_err(|e| CliError::InvalidDownloadUrl {
                template: url.to_string(),
                reason: e.to_string(),
            })?;
            if !self.files.iter().any(|file| file.as_os_str() == path) {
                return Err(invalid(format!(
                    "--payload-url names {path}, which is not a payload argument"
                )));
            }
        }

        Ok(())
    }

    /// Converts validated arguments into harvest settings.
    pub fn to_settings(&self) -> crate::payload::Result<HarvestSettings> {
        let mut overrides = Vec::with_capacity(self.payload_urls.len());
        for entry in &self.payload_urls {
            let (path, url) = split_payload_url(entry).map_err(crate::payload::Error::GenericError)?;
            overrides.push((PathBuf::from(path), url.to_string()));
        }

        let mut builder = HarvestSettingsBuilder::new()
            .recurse(self.recurse)
            .use_certificate(self.use_certificate);

        for file in &self.files {
            let mut argument = PayloadArgument::new(file);
            argument.download_url = overrides
                .iter()
                .find(|(path, _)| path == file)
                .map(|(_, url)| url.clone());
            builder = builder.argument(argument);
        }
        for base in &self.base_paths {
            builder = builder.base_path(base);
        }
        if let Some(template) = &self.download_url {
            builder = builder.download_url(template);
        }
        if let Some(jobs) = self.jobs {
            builder = builder.jobs(jobs);
        }

        builder.build()
    }
}

impl RelatedBundleArgs {
    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), CliError> {
        if self.bundle_id.trim().is_empty() {
            return Err(CliError::MissingArgument {
                argument: "--bundle-id".to_string(),
            });
        }
        self.action
            .parse::<RelatedBundleAction>()
            .map(|_| ())
            .map_err(|e| invalid(e.to_string()))
    }
}

/// Checks that a template has the placeholder and forms a URL once filled.
pub fn validate_download_url(template: &str) -> Result<(), CliError> {
    let error = |reason: String| CliError::InvalidDownloadUrl {
        template: template.to_string(),
        reason,
    };

    if !template.contains(URL_PLACEHOLDER) {
        return Err(error(format!("missing the {URL_PLACEHOLDER} placeholder")));
    }

    let sample = template.replace(URL_PLACEHOLDER, "payload/file.dat");
    url::Url::parse(&sample)
        .map(|_| ())
        .map_err(|e| error(e.to_string()))
}

fn invalid(reason: String) -> CliError {
    CliError::InvalidArguments { reason }
}

fn split_payload_url(entry: &str) -> Result<(&str, &str), String> {
    match entry.split_once('=') {
        Some((path, url)) if !path.is_empty() && !url.is_empty() => Ok((path, url)),
        _ => Err(format!("--payload-url expects PATH=URL, got '{entry}'")),
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            output: super::OutputManager::new(verbose, quiet),
        }
    }

    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        // Progress would interleave with a manifest written to stdout.
        let quiet = args.quiet || args.output().is_none();
        Self::new(args.verbose && !quiet, quiet)
    }
}
