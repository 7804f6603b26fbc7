//! Payload resolution.
//!
//! Expands the configured arguments, then hashes and inspects each distinct
//! file concurrently. Results are put back into expansion order before they
//! are returned, so the manifest never depends on task completion order.
//! The first hard error aborts the remaining work and no identity is
//! returned.

use super::certificate::extract_certificate;
use super::error::{Context, Result};
use super::expand::{Candidate, expand};
use super::format::{InspectedFile, PayloadFormat};
use super::hash::hash_file;
use super::settings::HarvestSettings;
use super::{PayloadIdentity, ResolvedContent};
use crate::symbol::{Symbol, SymbolRegistry};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Resolves every payload named by `settings`.
pub async fn resolve(settings: &HarvestSettings) -> Result<Vec<PayloadIdentity>> {
    let expansion_settings = settings.clone();
    let candidates = tokio::task::spawn_blocking(move || expand(&expansion_settings)).await??;

    // Same file, same mtime: resolve once.
    let mut unique: Vec<PathBuf> = Vec::new();
    let mut slots: HashMap<(PathBuf, Option<SystemTime>), usize> = HashMap::new();
    let assignments: Vec<usize> = candidates
        .iter()
        .map(|c| {
            *slots
                .entry((c.path.clone(), c.modified))
                .or_insert_with(|| {
                    unique.push(c.path.clone());
                    unique.len() - 1
                })
        })
        .collect();

    if unique.len() < candidates.len() {
        log::debug!(
            "{} duplicate payload reference(s) reuse an earlier resolution",
            candidates.len() - unique.len()
        );
    }

    let resolved = resolve_all(unique, settings.use_certificate(), settings.jobs()).await?;

    let identities = candidates
        .into_iter()
        .zip(assignments)
        .map(|(candidate, slot)| identity(candidate, resolved[slot].clone()))
        .collect::<Vec<_>>();

    log::info!("Resolved {} payload(s)", identities.len());
    Ok(identities)
}

/// Resolves payloads and records each as a remote payload symbol.
pub async fn harvest(settings: &HarvestSettings, registry: &SymbolRegistry) -> Result<Vec<Symbol>> {
    resolve(settings)
        .await?
        .iter()
        .map(|identity| identity.to_symbol(registry))
        .collect()
}

async fn resolve_all(paths: Vec<PathBuf>, use_certificate: bool, jobs: usize) -> Result<Vec<ResolvedContent>> {
    let permits = Arc::new(Semaphore::new(jobs.max(1)));
    let mut tasks = JoinSet::new();

    for (index, path) in paths.iter().cloned().enumerate() {
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            let content = resolve_content(&path, use_certificate)
                .await
                .with_context(|| format!("resolving {}", path.display()));
            (index, content)
        });
    }

    let mut results: Vec<Option<ResolvedContent>> = vec![None; paths.len()];
    while let Some(joined) = tasks.join_next().await {
        let (index, content) = match joined {
            Ok(done) => done,
            Err(e) => {
                tasks.abort_all();
                return Err(e.into());
            }
        };
        match content {
            Ok(content) => results[index] = Some(content),
            Err(e) => {
                tasks.abort_all();
                return Err(e);
            }
        }
    }

    results
        .into_iter()
        .zip(paths)
        .map(|(content, path)| {
            content.with_context(|| format!("no resolution recorded for {}", path.display()))
        })
        .collect()
}

/// Hashes and inspects a single file.
pub async fn resolve_content(path: &Path, use_certificate: bool) -> Result<ResolvedContent> {
    let digest = hash_file(path).await?;

    let inspect_path = path.to_path_buf();
    let inspected = tokio::task::spawn_blocking(move || InspectedFile::inspect(&inspect_path)).await??;

    let certificate = if use_certificate {
        let certificate = inspected.signature().and_then(extract_certificate);
        if certificate.is_none() {
            log::debug!("{} carries no readable signer certificate", path.display());
        }
        certificate
    } else {
        None
    };

    Ok(ResolvedContent {
        kind: inspected.kind(),
        hash: digest.hash,
        size: inspected.resolve_content_size(digest.size),
        version_info: inspected.extract_version_info().cloned(),
        certificate,
    })
}

fn identity(candidate: Candidate, content: ResolvedContent) -> PayloadIdentity {
    PayloadIdentity {
        source_path: candidate.path,
        name: candidate.name,
        canonical_name: candidate.canonical_name,
        download_url: candidate.download_url,
        kind: content.kind,
        hash: content.hash,
        size: content.size,
        version_info: content.version_info,
        certificate: content.certificate,
    }
}
