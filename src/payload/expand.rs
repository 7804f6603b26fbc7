//! Expansion of payload arguments into individual files.
//!
//! Output order is part of the manifest contract: arguments are expanded in
//! the order given, wildcard matches in the glob crate's sorted order, and
//! the files under a directory in byte order of their `/` separated path
//! relative to that directory.
//!
//! Symbolic links are followed everywhere: a literal or matched link is
//! resolved like a file, and directory walks descend through links. A link
//! cycle inside a walk is skipped with a warning.

use super::error::{Error, ErrorExt, Result};
use super::settings::{HarvestSettings, PayloadArgument};
use path_absolutize::Absolutize;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// One file selected for resolution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Candidate {
    /// Absolute path of the local file
    pub path: PathBuf,
    /// File name, emitted as the record name
    pub name: String,
    /// Path relative to the best matching base path, forward slashes
    pub canonical_name: String,
    /// Computed download URL
    pub download_url: Option<String>,
    /// Modification time, used to reuse resolutions within one run
    pub modified: Option<SystemTime>,
}

/// Expands every argument in `settings` into candidate files.
///
/// A pattern that matches nothing is skipped. A literal path that does not
/// exist fails the whole expansion with [`Error::FileNotFound`].
pub fn expand(settings: &HarvestSettings) -> Result<Vec<Candidate>> {
    let mut candidates = Vec::new();

    for argument in settings.inputs() {
        if argument.is_pattern() {
            expand_pattern(settings, argument, &mut candidates)?;
            continue;
        }

        let metadata = std::fs::metadata(&argument.path).fs_context("reading payload", &argument.path)?;
        if metadata.is_file() {
            candidates.push(candidate(settings, &argument.path, argument.download_url.as_deref())?);
        } else if metadata.is_dir() && settings.recurse() {
            walk_directory(settings, &argument.path, &mut candidates)?;
        } else {
            return Err(Error::FileUnreadable {
                path: argument.path.clone(),
                reason: if metadata.is_dir() {
                    "is a directory; enable recursion to harvest its files".to_string()
                } else {
                    "not a regular file".to_string()
                },
            });
        }
    }

    log::info!("Expanded {} payload argument(s) into {} file(s)", settings.inputs().len(), candidates.len());
    Ok(candidates)
}

fn expand_pattern(
    settings: &HarvestSettings,
    argument: &PayloadArgument,
    candidates: &mut Vec<Candidate>,
) -> Result<()> {
    let pattern = argument.path.to_string_lossy();
    let mut matched = 0usize;

    for entry in glob::glob(&pattern)? {
        let path = entry?;
        matched += 1;
        if path.is_file() {
            candidates.push(candidate(settings, &path, None)?);
        } else if path.is_dir() && settings.recurse() {
            walk_directory(settings, &path, candidates)?;
        } else {
            log::debug!("Skipping {} matched by {}", path.display(), pattern);
        }
    }

    if matched == 0 {
        log::warn!("Pattern {} matched no files", pattern);
    }
    Ok(())
}

fn walk_directory(settings: &HarvestSettings, dir: &Path, candidates: &mut Vec<Candidate>) -> Result<()> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.loop_ancestor().is_some() => {
                log::warn!("Skipping symlink loop: {}", e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if entry.file_type().is_file() {
            let relative = forward_slashes(entry.path().strip_prefix(dir)?);
            files.push((relative, entry.into_path()));
        }
    }

    // Byte order of the relative path, so `a.dat` precedes `a/b.dat`.
    files.sort_by(|a, b| a.0.cmp(&b.0));
    for (_, path) in files {
        candidates.push(candidate(settings, &path, None)?);
    }
    Ok(())
}

fn candidate(settings: &HarvestSettings, path: &Path, explicit_url: Option<&str>) -> Result<Candidate> {
    let absolute = path
        .absolutize()
        .fs_context("resolving payload path", path)?
        .into_owned();
    let name = absolute
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::FileUnreadable {
            path: path.to_path_buf(),
            reason: "path has no file name".to_string(),
        })?;

    let canonical_name = if settings.recurse() {
        match best_base_path(settings.base_paths(), &absolute) {
            Some(base) => forward_slashes(absolute.strip_prefix(base)?),
            None => name.clone(),
        }
    } else {
        name.clone()
    };

    let download_url = match explicit_url {
        Some(url) if !settings.recurse() => Some(url.to_string()),
        _ => settings.render_download_url(&canonical_name),
    };

    let modified = std::fs::metadata(&absolute)
        .and_then(|m| m.modified())
        .ok();

    Ok(Candidate {
        path: absolute,
        name,
        canonical_name,
        download_url,
        modified,
    })
}

/// Longest base path containing `path`; the earliest wins a tie.
pub fn best_base_path<'a>(base_paths: &'a [PathBuf], path: &Path) -> Option<&'a Path> {
    let mut best: Option<&Path> = None;
    for base in base_paths {
        if !path.starts_with(base) || path == base.as_path() {
            continue;
        }
        let longer = best.is_none_or(|current| base.components().count() > current.components().count());
        if longer {
            best = Some(base);
        }
    }
    best
}

/// Joins the normal components of `relative` with `/`.
pub fn forward_slashes(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
