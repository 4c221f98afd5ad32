use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use duopack_core::{
    parse_index, sort_by_tier, Fetcher, IndexStanza, RepoTier, Repository, ARCHITECTURE_TAG,
    INDEX_FILE_NAME, LEGACY_LIST_FILE_NAME, RELEASE_FILE_NAME,
};
use log::{debug, warn};

pub const REPOS_FILE_NAME: &str = "repos.list";

// Seeded when nothing is configured. The last entry is the project's own
// repository and is trusted as modern before any probe runs.
const DEFAULT_REPOSITORIES: [(&str, RepoTier); 3] = [
    ("https://packages.duopack.dev/stable", RepoTier::Unverified),
    (
        "https://raw.githubusercontent.com/duopack/community-repo/refs/heads/main",
        RepoTier::Unverified,
    ),
    (
        "https://raw.githubusercontent.com/duopack/duopack/refs/heads/main/repo",
        RepoTier::VerifiedModern,
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoAddOutcome {
    Added,
    AlreadyPresent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRefresh {
    pub url: String,
    pub tier: RepoTier,
    pub ok: bool,
}

/// Priority-ordered view of the configured repositories, persisted as a
/// plain line-per-URL file under the state root.
#[derive(Debug, Clone)]
pub struct RepositoryRegistry {
    root: PathBuf,
    repos: Vec<Repository>,
}

impl RepositoryRegistry {
    /// Loads `repos.list` from the state root, or seeds the defaults when
    /// nothing is configured. No probing happens here; every loaded entry
    /// starts out `Unverified` except the pre-trusted default.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let repos_file = root.join(REPOS_FILE_NAME);

        let mut repos = Vec::new();
        if repos_file.exists() {
            let content = fs::read_to_string(&repos_file)
                .with_context(|| format!("failed to read {}", repos_file.display()))?;
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                repos.push(Repository::unverified(line));
            }
        }

        if repos.is_empty() {
            repos = DEFAULT_REPOSITORIES
                .iter()
                .map(|(url, tier)| Repository::new(*url, *tier))
                .collect();
        }

        // The working list is kept tier-sorted at all times; before any
        // probe runs this only lifts the pre-trusted default to the front.
        sort_by_tier(&mut repos);
        Ok(Self { root, repos })
    }

    pub fn repositories(&self) -> &[Repository] {
        &self.repos
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn packages_cache_path(&self, pos: usize) -> PathBuf {
        self.cache_dir().join(format!("Packages_{pos}"))
    }

    pub fn legacy_list_cache_path(&self, pos: usize) -> PathBuf {
        self.cache_dir().join(format!("package_list_{pos}"))
    }

    /// Reads the cached modern index for the repository at `pos`, if one was
    /// fetched by a previous cache refresh.
    pub fn load_cached_index(&self, pos: usize) -> Option<Vec<IndexStanza>> {
        let path = self.packages_cache_path(pos);
        let content = fs::read_to_string(&path).ok()?;
        Some(parse_index(&content))
    }

    /// Classifies every repository by probing its `Release` resource, then
    /// re-sorts. Equal-tier repositories keep their relative order.
    pub fn probe(&mut self, fetcher: &dyn Fetcher) -> Result<()> {
        fs::create_dir_all(self.cache_dir())
            .with_context(|| format!("failed to create {}", self.cache_dir().display()))?;

        for repo in &mut self.repos {
            repo.tier = if probe_release(fetcher, &self.root, &repo.url) {
                RepoTier::VerifiedModern
            } else {
                RepoTier::Unverified
            };
            debug!("probed {} as {}", repo.url, repo.tier.as_str());
        }

        sort_by_tier(&mut self.repos);
        Ok(())
    }

    /// Appends a repository. A URL that is already configured is left
    /// untouched. New entries are probed and the list re-sorted.
    pub fn add(&mut self, url: &str, fetcher: &dyn Fetcher) -> Result<RepoAddOutcome> {
        if self.repos.iter().any(|repo| repo.url == url) {
            return Ok(RepoAddOutcome::AlreadyPresent);
        }

        let repos_file = self.root.join(REPOS_FILE_NAME);
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&repos_file)
            .with_context(|| format!("failed to open {}", repos_file.display()))?;
        writeln!(file, "{url}")
            .with_context(|| format!("failed to append to {}", repos_file.display()))?;

        let tier = if probe_release(fetcher, &self.root, url) {
            RepoTier::VerifiedModern
        } else {
            RepoTier::Unverified
        };
        self.repos.push(Repository::new(url, tier));
        sort_by_tier(&mut self.repos);
        Ok(RepoAddOutcome::Added)
    }

    /// Removes a repository and rewrites the persisted list.
    pub fn remove(&mut self, url: &str) -> Result<()> {
        let before = self.repos.len();
        self.repos.retain(|repo| repo.url != url);
        if self.repos.len() == before {
            return Err(anyhow!("repository not found: {url}"));
        }

        let repos_file = self.root.join(REPOS_FILE_NAME);
        let mut content = String::new();
        for repo in &self.repos {
            content.push_str(&repo.url);
            content.push('\n');
        }
        fs::write(&repos_file, content)
            .with_context(|| format!("failed to write {}", repos_file.display()))?;
        Ok(())
    }

    /// Refreshes the per-repository caches that resolution and search read:
    /// the `Packages` index for verified repositories, the plain name list
    /// for unverified ones. A failing repository is reported and skipped.
    pub fn refresh_caches(&self, fetcher: &dyn Fetcher) -> Result<Vec<CacheRefresh>> {
        fs::create_dir_all(self.cache_dir())
            .with_context(|| format!("failed to create {}", self.cache_dir().display()))?;

        let mut reports = Vec::with_capacity(self.repos.len());
        for (pos, repo) in self.repos.iter().enumerate() {
            let (url, dest) = match repo.tier {
                RepoTier::VerifiedModern => (
                    format!("{}/{INDEX_FILE_NAME}", repo.url),
                    self.packages_cache_path(pos),
                ),
                RepoTier::Unverified => (
                    format!("{}/{LEGACY_LIST_FILE_NAME}", repo.url),
                    self.legacy_list_cache_path(pos),
                ),
            };

            let ok = match fetcher.fetch(&url, &dest) {
                Ok(()) => true,
                Err(err) => {
                    warn!("cache refresh failed for {}: {err:#}", repo.url);
                    false
                }
            };
            reports.push(CacheRefresh {
                url: repo.url.clone(),
                tier: repo.tier,
                ok,
            });
        }
        Ok(reports)
    }
}

fn probe_release(fetcher: &dyn Fetcher, root: &Path, url: &str) -> bool {
    let scratch = root.join("cache").join("release.tmp");
    let release_url = format!("{url}/{RELEASE_FILE_NAME}");

    if fetcher.fetch(&release_url, &scratch).is_err() {
        return false;
    }

    let found = fs::read_to_string(&scratch)
        .map(|content| {
            content.lines().any(|line| {
                line.starts_with("Architectures:") && line.contains(ARCHITECTURE_TAG)
            })
        })
        .unwrap_or(false);
    let _ = fs::remove_file(&scratch);
    found
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    use anyhow::{anyhow, Result};
    use duopack_core::{Fetcher, RepoTier};

    use super::{RepoAddOutcome, RepositoryRegistry, REPOS_FILE_NAME};

    struct MapFetcher {
        bodies: HashMap<String, Vec<u8>>,
    }

    impl MapFetcher {
        fn new(entries: &[(&str, &[u8])]) -> Self {
            Self {
                bodies: entries
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_vec()))
                    .collect(),
            }
        }
    }

    impl Fetcher for MapFetcher {
        fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
            let Some(body) = self.bodies.get(url) else {
                return Err(anyhow!("no route for {url}"));
            };
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(dest, body)?;
            Ok(())
        }
    }

    #[test]
    fn open_skips_comment_and_blank_lines() {
        let root = test_root();
        fs::create_dir_all(&root).expect("must create root");
        fs::write(
            root.join(REPOS_FILE_NAME),
            "# mirrors\n\nhttps://one.example\n  \nhttps://two.example\n",
        )
        .expect("must write repos file");

        let registry = RepositoryRegistry::open(&root).expect("must open");
        let urls: Vec<&str> = registry
            .repositories()
            .iter()
            .map(|repo| repo.url.as_str())
            .collect();
        assert_eq!(urls, vec!["https://one.example", "https://two.example"]);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn open_seeds_three_defaults_with_one_pretrusted() {
        let root = test_root();
        fs::create_dir_all(&root).expect("must create root");

        let registry = RepositoryRegistry::open(&root).expect("must open");
        let repos = registry.repositories();
        assert_eq!(repos.len(), 3);

        // The project's own repository is trusted before any probe runs and
        // therefore sorts first; the other two defaults keep their seeded
        // relative order.
        assert_eq!(repos[0].tier, RepoTier::VerifiedModern);
        assert!(repos[0].url.contains("duopack/duopack"));
        assert_eq!(repos[1].tier, RepoTier::Unverified);
        assert!(repos[1].url.contains("packages.duopack.dev"));
        assert_eq!(repos[2].tier, RepoTier::Unverified);
        assert!(repos[2].url.contains("community-repo"));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn probe_classifies_by_release_architectures_and_sorts_stably() {
        let root = test_root();
        fs::create_dir_all(&root).expect("must create root");
        fs::write(
            root.join(REPOS_FILE_NAME),
            "https://a.example\nhttps://b.example\nhttps://c.example\nhttps://d.example\n",
        )
        .expect("must write repos file");

        let fetcher = MapFetcher::new(&[
            (
                "https://b.example/Release",
                b"Origin: b\nArchitectures: duopack\n".as_slice(),
            ),
            (
                "https://c.example/Release",
                b"Architectures: armhf arm64\n".as_slice(),
            ),
            (
                "https://d.example/Release",
                b"Architectures: duopack armhf\n".as_slice(),
            ),
        ]);

        let mut registry = RepositoryRegistry::open(&root).expect("must open");
        registry.probe(&fetcher).expect("must probe");

        let ordered: Vec<(&str, RepoTier)> = registry
            .repositories()
            .iter()
            .map(|repo| (repo.url.as_str(), repo.tier))
            .collect();
        assert_eq!(
            ordered,
            vec![
                ("https://b.example", RepoTier::VerifiedModern),
                ("https://d.example", RepoTier::VerifiedModern),
                ("https://a.example", RepoTier::Unverified),
                ("https://c.example", RepoTier::Unverified),
            ]
        );
        assert!(!root.join("cache").join("release.tmp").exists());

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn add_is_idempotent_for_known_urls() {
        let root = test_root();
        fs::create_dir_all(&root).expect("must create root");
        fs::write(root.join(REPOS_FILE_NAME), "https://one.example\n").expect("must write file");

        let fetcher = MapFetcher::new(&[]);
        let mut registry = RepositoryRegistry::open(&root).expect("must open");
        let outcome = registry
            .add("https://one.example", &fetcher)
            .expect("must add");
        assert_eq!(outcome, RepoAddOutcome::AlreadyPresent);

        let persisted = fs::read_to_string(root.join(REPOS_FILE_NAME)).expect("must read file");
        assert_eq!(persisted, "https://one.example\n");

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn add_appends_probes_and_resorts() {
        let root = test_root();
        fs::create_dir_all(&root).expect("must create root");
        fs::write(root.join(REPOS_FILE_NAME), "https://legacy.example\n").expect("must write");

        let fetcher = MapFetcher::new(&[(
            "https://modern.example/Release",
            b"Architectures: duopack\n".as_slice(),
        )]);
        let mut registry = RepositoryRegistry::open(&root).expect("must open");
        let outcome = registry
            .add("https://modern.example", &fetcher)
            .expect("must add");
        assert_eq!(outcome, RepoAddOutcome::Added);

        // The probed-verified newcomer sorts ahead of the unverified entry.
        assert_eq!(registry.repositories()[0].url, "https://modern.example");

        let persisted = fs::read_to_string(root.join(REPOS_FILE_NAME)).expect("must read file");
        assert_eq!(persisted, "https://legacy.example\nhttps://modern.example\n");

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn remove_unknown_url_fails() {
        let root = test_root();
        fs::create_dir_all(&root).expect("must create root");
        fs::write(root.join(REPOS_FILE_NAME), "https://one.example\n").expect("must write");

        let mut registry = RepositoryRegistry::open(&root).expect("must open");
        let err = registry
            .remove("https://missing.example")
            .expect_err("must report missing repository");
        assert!(err.to_string().contains("not found"));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn remove_rewrites_persisted_list() {
        let root = test_root();
        fs::create_dir_all(&root).expect("must create root");
        fs::write(
            root.join(REPOS_FILE_NAME),
            "https://one.example\nhttps://two.example\n",
        )
        .expect("must write");

        let mut registry = RepositoryRegistry::open(&root).expect("must open");
        registry.remove("https://one.example").expect("must remove");

        let persisted = fs::read_to_string(root.join(REPOS_FILE_NAME)).expect("must read file");
        assert_eq!(persisted, "https://two.example\n");
        assert_eq!(registry.repositories().len(), 1);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn refresh_caches_fetches_per_tier_and_tolerates_failures() {
        let root = test_root();
        fs::create_dir_all(&root).expect("must create root");
        fs::write(
            root.join(REPOS_FILE_NAME),
            "https://modern.example\nhttps://legacy.example\nhttps://dead.example\n",
        )
        .expect("must write");

        let fetcher = MapFetcher::new(&[
            (
                "https://modern.example/Release",
                b"Architectures: duopack\n".as_slice(),
            ),
            (
                "https://modern.example/Packages",
                b"Package: tool\nVersion: 1.0\nArchitecture: duopack\nFilename: ./pool/tool.dpk\n"
                    .as_slice(),
            ),
            (
                "https://legacy.example/package.list",
                b"tool\nother\n".as_slice(),
            ),
        ]);

        let mut registry = RepositoryRegistry::open(&root).expect("must open");
        registry.probe(&fetcher).expect("must probe");
        let reports = registry.refresh_caches(&fetcher).expect("must refresh");

        assert_eq!(reports.len(), 3);
        assert!(reports[0].ok, "verified repo cache should refresh");
        assert!(reports[1].ok, "legacy repo list should refresh");
        assert!(!reports[2].ok, "dead repo should be reported, not fatal");

        let index = registry
            .load_cached_index(0)
            .expect("must load cached index");
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].package, "tool");

        let list = fs::read_to_string(registry.legacy_list_cache_path(1)).expect("must read list");
        assert!(list.contains("other"));

        let _ = fs::remove_dir_all(&root);
    }

    fn test_root() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "duopack-registry-tests-{}-{nanos}",
            std::process::id()
        ))
    }
}
