use std::fs;

use anyhow::{anyhow, Result};
use duopack_core::{
    find_stanza, looks_like_error_page, Fetcher, PackageDescriptor, RepoTier, ARCHITECTURE_TAG,
    LEGACY_ARCHIVE_EXT, MODERN_ARCHIVE_EXT,
};
use duopack_registry::RepositoryRegistry;
use log::debug;

use crate::types::Resolution;

/// Locates a package across the configured repositories and downloads its
/// archive. The order is fixed: verified repositories are consulted through
/// their cached indexes first; only when none yields a usable artifact does
/// the resolver fall back to probing unverified repositories by the legacy
/// URL convention.
pub fn resolve(
    registry: &RepositoryRegistry,
    fetcher: &dyn Fetcher,
    name: &str,
) -> Result<Resolution> {
    if let Some(resolution) = resolve_modern(registry, fetcher, name) {
        return Ok(resolution);
    }
    if let Some(resolution) = resolve_legacy(registry, fetcher, name) {
        return Ok(resolution);
    }
    Err(anyhow!("package '{name}' not found in any repository"))
}

fn resolve_modern(
    registry: &RepositoryRegistry,
    fetcher: &dyn Fetcher,
    name: &str,
) -> Option<Resolution> {
    for (pos, repo) in registry.repositories().iter().enumerate() {
        if repo.tier != RepoTier::VerifiedModern {
            continue;
        }
        let Some(stanzas) = registry.load_cached_index(pos) else {
            continue;
        };
        let Some(stanza) = find_stanza(&stanzas, name) else {
            continue;
        };
        if stanza.architecture != ARCHITECTURE_TAG {
            debug!(
                "{}: architecture '{}' does not match '{ARCHITECTURE_TAG}', skipping",
                repo.url, stanza.architecture
            );
            continue;
        }

        let relative = stanza.filename.strip_prefix("./").unwrap_or(&stanza.filename);
        let url = format!("{}/{relative}", repo.url);
        let artifact = registry
            .cache_dir()
            .join(format!("{name}.{MODERN_ARCHIVE_EXT}"));

        debug!("downloading {url}");
        if let Err(err) = fetcher.fetch(&url, &artifact) {
            debug!("{url}: fetch failed ({err:#}), trying next repository");
            continue;
        }
        if looks_like_error_page(&artifact) {
            debug!("{url}: body is an error page, trying next repository");
            let _ = fs::remove_file(&artifact);
            continue;
        }

        return Some(Resolution {
            descriptor: PackageDescriptor::from_stanza(stanza),
            artifact,
        });
    }
    None
}

fn resolve_legacy(
    registry: &RepositoryRegistry,
    fetcher: &dyn Fetcher,
    name: &str,
) -> Option<Resolution> {
    for repo in registry.repositories() {
        if repo.tier != RepoTier::Unverified {
            continue;
        }

        let base = format!("{}/{name}/{name}", repo.url);
        let artifact = registry
            .cache_dir()
            .join(format!("{name}.{LEGACY_ARCHIVE_EXT}"));

        debug!("trying legacy download from {base}.{LEGACY_ARCHIVE_EXT}");
        if let Err(err) = fetcher.fetch(&format!("{base}.{LEGACY_ARCHIVE_EXT}"), &artifact) {
            debug!("{}: legacy fetch failed ({err:#})", repo.url);
            continue;
        }
        if looks_like_error_page(&artifact) {
            let _ = fs::remove_file(&artifact);
            continue;
        }

        // Companions are best-effort: a missing version file just means the
        // version is unknown, and the file-list hint is advisory.
        let version_scratch = registry.cache_dir().join(format!("{name}.version.tmp"));
        let flist_scratch = registry.cache_dir().join(format!("{name}.flist.tmp"));
        if let Err(err) = fetcher.fetch(&format!("{base}.version"), &version_scratch) {
            debug!("{}: no version companion ({err:#})", repo.url);
        }
        if let Err(err) = fetcher.fetch(&format!("{base}.flist"), &flist_scratch) {
            debug!("{}: no file-list companion ({err:#})", repo.url);
        }

        let version = fs::read_to_string(&version_scratch)
            .ok()
            .and_then(|content| content.lines().next().map(|line| line.trim().to_string()))
            .filter(|line| !line.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        let _ = fs::remove_file(&version_scratch);
        let _ = fs::remove_file(&flist_scratch);

        return Some(Resolution {
            descriptor: PackageDescriptor::legacy(name, &version),
            artifact,
        });
    }
    None
}
