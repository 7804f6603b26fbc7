//! Harvest configuration.
//!
//! [`HarvestSettings`] is the only configuration the payload resolver sees.
//! It is assembled from validated command line arguments through
//! [`HarvestSettingsBuilder`].
//!
//! # Examples
//!
//! ```no_run
//! use kodegen_bundler_payload::payload::HarvestSettingsBuilder;
//!
//! # fn example() -> kodegen_bundler_payload::payload::Result<()> {
//! let settings = HarvestSettingsBuilder::new()
//!     .input("payloads/setup.exe")
//!     .input("payloads/data/*")
//!     .base_path("payloads")
//!     .download_url("https://www.example.com/files/{0}")
//!     .recurse(true)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use super::error::{ErrorExt, Result};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};

/// Placeholder substituted with the payload's relative path in URL templates.
pub const URL_PLACEHOLDER: &str = "{0}";

/// One payload argument: a file, directory or wildcard pattern.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PayloadArgument {
    /// Path or pattern as supplied
    pub path: PathBuf,
    /// Download URL for this exact file, overriding the template
    pub download_url: Option<String>,
}

impl PayloadArgument {
    /// Creates an argument without a per-file URL.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            download_url: None,
        }
    }

    /// True when the path contains wildcard characters.
    pub fn is_pattern(&self) -> bool {
        self.path
            .to_string_lossy()
            .contains(['*', '?', '['])
    }
}

/// Settings for one harvest invocation.
#[derive(Clone, Debug)]
pub struct HarvestSettings {
    inputs: Vec<PayloadArgument>,
    base_paths: Vec<PathBuf>,
    download_url: Option<String>,
    recurse: bool,
    use_certificate: bool,
    jobs: usize,
}

impl HarvestSettings {
    /// Payload arguments in the order supplied.
    pub fn inputs(&self) -> &[PayloadArgument] {
        &self.inputs
    }

    /// Absolute base paths in the order supplied.
    pub fn base_paths(&self) -> &[PathBuf] {
        &self.base_paths
    }

    /// Download URL template containing [`URL_PLACEHOLDER`].
    pub fn download_url(&self) -> Option<&str> {
        self.download_url.as_deref()
    }

    /// Whether directories are walked and base paths applied.
    pub fn recurse(&self) -> bool {
        self.recurse
    }

    /// Whether signer certificates are extracted.
    pub fn use_certificate(&self) -> bool {
        self.use_certificate
    }

    /// Maximum number of payloads resolved concurrently.
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Substitutes `relative_path` into the URL template.
    pub fn render_download_url(&self, relative_path: &str) -> Option<String> {
        self.download_url
            .as_deref()
            .map(|template| template.replace(URL_PLACEHOLDER, relative_path))
    }
}

/// Builder for [`HarvestSettings`].
#[derive(Debug, Default)]
pub struct HarvestSettingsBuilder {
    inputs: Vec<PayloadArgument>,
    base_paths: Vec<PathBuf>,
    download_url: Option<String>,
    recurse: bool,
    use_certificate: bool,
    jobs: Option<usize>,
}

impl HarvestSettingsBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a payload file, directory or pattern.
    pub fn input<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.inputs.push(PayloadArgument::new(path.as_ref()));
        self
    }

    /// Adds a fully specified payload argument.
    pub fn argument(mut self, argument: PayloadArgument) -> Self {
        self.inputs.push(argument);
        self
    }

    /// Adds a base path used to compute relative download paths.
    pub fn base_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.base_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Sets the download URL template.
    pub fn download_url(mut self, template: impl Into<String>) -> Self {
        self.download_url = Some(template.into());
        self
    }

    /// Enables directory recursion.
    pub fn recurse(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    /// Enables signer certificate extraction.
    pub fn use_certificate(mut self, use_certificate: bool) -> Self {
        self.use_certificate = use_certificate;
        self
    }

    /// Sets the resolution concurrency. Zero means one job per CPU.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Fails when no inputs were given, the URL template lacks the `{0}`
    /// placeholder, or a base path cannot be made absolute.
    pub fn build(self) -> Result<HarvestSettings> {
        if self.inputs.is_empty() {
            crate::bail!("no payload files specified");
        }

        if let Some(template) = &self.download_url
            && !template.contains(URL_PLACEHOLDER)
        {
            crate::bail!("download URL template '{template}' has no {URL_PLACEHOLDER} placeholder");
        }

        let base_paths = self
            .base_paths
            .iter()
            .map(|base| {
                base.absolutize()
                    .map(|p| p.into_owned())
                    .fs_context("resolving base path", base)
            })
            .collect::<Result<Vec<_>>>()?;

        let jobs = match self.jobs {
            Some(0) | None => num_cpus::get(),
            Some(jobs) => jobs,
        };

        Ok(HarvestSettings {
            inputs: self.inputs,
            base_paths,
            download_url: self.download_url,
            recurse: self.recurse,
            use_certificate: self.use_certificate,
            jobs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_inputs() {
        assert!(HarvestSettingsBuilder::new().build().is_err());
    }

    #[test]
    fn test_template_requires_placeholder() {
        let result = HarvestSettingsBuilder::new()
            .input("a.exe")
            .download_url("https://example.com/files/")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_render_and_defaults() {
        let settings = HarvestSettingsBuilder::new()
            .input("a.exe")
            .base_path("relative/base")
            .download_url("https://example.com/{0}")
            .build()
            .expect("settings");
        assert!(settings.jobs() >= 1);
        assert!(settings.base_paths()[0].is_absolute());
        assert_eq!(
            settings.render_download_url("sub/a.exe").as_deref(),
            Some("https://example.com/sub/a.exe")
        );
    }

    #[test]
    fn test_pattern_detection() {
        assert!(PayloadArgument::new("data/*.dat").is_pattern());
        assert!(PayloadArgument::new("data/file?.dat").is_pattern());
        assert!(!PayloadArgument::new("data/file.dat").is_pattern());
    }
}
