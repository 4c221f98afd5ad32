use std::fs;

use duopack_core::{find_stanza, PackageDescriptor, PackageFormat, RepoTier};
use duopack_registry::RepositoryRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub repo_url: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub format: PackageFormat,
}

/// Scans every cached index and name list for the query: modern stanzas
/// match on package name or description, legacy lists on the bare name.
pub fn search(registry: &RepositoryRegistry, query: &str) -> Vec<SearchHit> {
    let mut hits = Vec::new();

    for (pos, repo) in registry.repositories().iter().enumerate() {
        match repo.tier {
            RepoTier::VerifiedModern => {
                let Some(stanzas) = registry.load_cached_index(pos) else {
                    continue;
                };
                for stanza in &stanzas {
                    if stanza.package.contains(query) || stanza.description.contains(query) {
                        hits.push(SearchHit {
                            repo_url: repo.url.clone(),
                            name: stanza.package.clone(),
                            version: stanza.version.clone(),
                            description: stanza.description.clone(),
                            format: PackageFormat::Modern,
                        });
                    }
                }
            }
            RepoTier::Unverified => {
                let Ok(content) = fs::read_to_string(registry.legacy_list_cache_path(pos)) else {
                    continue;
                };
                for line in content.lines() {
                    let line = line.trim();
                    if !line.is_empty() && line.contains(query) {
                        hits.push(SearchHit {
                            repo_url: repo.url.clone(),
                            name: line.to_string(),
                            version: String::new(),
                            description: String::new(),
                            format: PackageFormat::Legacy,
                        });
                    }
                }
            }
        }
    }

    hits
}

/// First cached-index stanza matching `name` across verified repositories,
/// in priority order. Feeds `show` and upgrade planning; does not touch the
/// network.
pub fn find_cached_descriptor(
    registry: &RepositoryRegistry,
    name: &str,
) -> Option<PackageDescriptor> {
    for (pos, repo) in registry.repositories().iter().enumerate() {
        if repo.tier != RepoTier::VerifiedModern {
            continue;
        }
        let Some(stanzas) = registry.load_cached_index(pos) else {
            continue;
        };
        if let Some(stanza) = find_stanza(&stanzas, name) {
            return Some(PackageDescriptor::from_stanza(stanza));
        }
    }
    None
}
