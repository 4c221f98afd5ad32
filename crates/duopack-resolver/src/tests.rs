use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};
use duopack_core::{Fetcher, PackageFormat};
use duopack_registry::RepositoryRegistry;

use crate::{find_cached_descriptor, resolve, search};

const ERROR_PAGE: &[u8] = b"<html><head><title>404 Not Found</title></head><body></body></html>";

#[derive(Default)]
struct MapFetcher {
    bodies: HashMap<String, Vec<u8>>,
}

impl MapFetcher {
    fn new() -> Self {
        Self::default()
    }

    fn route(mut self, url: &str, body: &[u8]) -> Self {
        self.bodies.insert(url.to_string(), body.to_vec());
        self
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

/// Two verified repositories and one legacy repository, matching the probe
/// results a real run would produce.
fn base_fetcher() -> MapFetcher {
    MapFetcher::new()
        .route("https://first.example/Release", b"Architectures: duopack\n")
        .route("https://second.example/Release", b"Architectures: duopack\n")
}

fn stanza(name: &str, version: &str, arch: &str, filename: &str) -> String {
    format!(
        "Package: {name}\nVersion: {version}\nArchitecture: {arch}\nFilename: {filename}\nDescription: test package {name}\n\n"
    )
}

/// Builds a registry with indexes already cached, as a prior `update` would
/// have left them.
fn cached_registry(root: &Path, fetcher: &MapFetcher) -> RepositoryRegistry {
    fs::create_dir_all(root).expect("must create root");
    fs::write(
        root.join("repos.list"),
        "https://first.example\nhttps://second.example\nhttps://legacy.example\n",
    )
    .expect("must write repos file");

    let mut registry = RepositoryRegistry::open(root).expect("must open registry");
    registry.probe(fetcher).expect("must probe");
    registry.refresh_caches(fetcher).expect("must refresh");
    registry
}

#[test]
fn resolve_prefers_first_verified_repository() {
    let root = test_root();
    let fetcher = base_fetcher()
        .route(
            "https://first.example/Packages",
            stanza("tool", "1.2.0", "duopack", "./pool/tool.dpk").as_bytes(),
        )
        .route(
            "https://second.example/Packages",
            stanza("tool", "9.9.9", "duopack", "./pool/tool.dpk").as_bytes(),
        )
        .route("https://first.example/pool/tool.dpk", b"archive-bytes")
        .route("https://second.example/pool/tool.dpk", b"other-bytes");

    let registry = cached_registry(&root, &fetcher);
    let resolution = resolve(&registry, &fetcher, "tool").expect("must resolve");

    assert_eq!(resolution.descriptor.version, "1.2.0");
    assert_eq!(resolution.descriptor.format, PackageFormat::Modern);
    let body = fs::read(&resolution.artifact).expect("must read artifact");
    assert_eq!(body, b"archive-bytes");

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn resolve_advances_past_failed_fetch_to_next_verified_repository() {
    let root = test_root();
    // first.example has no payload route: the download fails and resolution
    // must fall through to second.example.
    let fetcher = base_fetcher()
        .route(
            "https://first.example/Packages",
            stanza("tool", "1.0.0", "duopack", "./pool/tool.dpk").as_bytes(),
        )
        .route(
            "https://second.example/Packages",
            stanza("tool", "2.0.0", "duopack", "pool/tool.dpk").as_bytes(),
        )
        .route("https://second.example/pool/tool.dpk", b"from-second");

    let registry = cached_registry(&root, &fetcher);
    let resolution = resolve(&registry, &fetcher, "tool").expect("must resolve");

    assert_eq!(resolution.descriptor.version, "2.0.0");
    assert_eq!(
        fs::read(&resolution.artifact).expect("must read artifact"),
        b"from-second"
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn resolve_treats_soft_404_body_as_failure() {
    let root = test_root();
    let fetcher = base_fetcher()
        .route(
            "https://first.example/Packages",
            stanza("tool", "1.0.0", "duopack", "./pool/tool.dpk").as_bytes(),
        )
        .route(
            "https://second.example/Packages",
            stanza("tool", "2.0.0", "duopack", "./pool/tool.dpk").as_bytes(),
        )
        .route("https://first.example/pool/tool.dpk", ERROR_PAGE)
        .route("https://second.example/pool/tool.dpk", b"real-archive");

    let registry = cached_registry(&root, &fetcher);
    let resolution = resolve(&registry, &fetcher, "tool").expect("must resolve");

    assert_eq!(resolution.descriptor.version, "2.0.0");
    assert_eq!(
        fs::read(&resolution.artifact).expect("must read artifact"),
        b"real-archive"
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn resolve_skips_stanza_with_foreign_architecture() {
    let root = test_root();
    let fetcher = base_fetcher()
        .route(
            "https://first.example/Packages",
            stanza("tool", "1.0.0", "armhf", "./pool/tool.dpk").as_bytes(),
        )
        .route("https://second.example/Packages", b"\n")
        .route("https://first.example/pool/tool.dpk", b"should-not-fetch");

    let registry = cached_registry(&root, &fetcher);
    let err = resolve(&registry, &fetcher, "tool").expect_err("foreign arch must not resolve");
    assert!(err.to_string().contains("not found"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn resolve_falls_back_to_legacy_with_version_companion() {
    let root = test_root();
    let fetcher = base_fetcher()
        .route("https://first.example/Packages", b"\n")
        .route("https://second.example/Packages", b"\n")
        .route("https://legacy.example/oldtool/oldtool.ppkg", b"legacy-archive")
        .route("https://legacy.example/oldtool/oldtool.version", b"0.4.2\n");

    let registry = cached_registry(&root, &fetcher);
    let resolution = resolve(&registry, &fetcher, "oldtool").expect("must resolve");

    assert_eq!(resolution.descriptor.format, PackageFormat::Legacy);
    assert_eq!(resolution.descriptor.version, "0.4.2");
    assert_eq!(resolution.descriptor.architecture, "legacy");
    assert_eq!(
        fs::read(&resolution.artifact).expect("must read artifact"),
        b"legacy-archive"
    );
    // Companion scratch files are cleaned up by the resolution attempt.
    assert!(!registry.cache_dir().join("oldtool.version.tmp").exists());
    assert!(!registry.cache_dir().join("oldtool.flist.tmp").exists());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn resolve_defaults_legacy_version_to_unknown() {
    let root = test_root();
    let fetcher = base_fetcher()
        .route("https://first.example/Packages", b"\n")
        .route("https://second.example/Packages", b"\n")
        .route("https://legacy.example/oldtool/oldtool.ppkg", b"legacy-archive");

    let registry = cached_registry(&root, &fetcher);
    let resolution = resolve(&registry, &fetcher, "oldtool").expect("must resolve");
    assert_eq!(resolution.descriptor.version, "unknown");

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn resolve_missing_everywhere_leaves_no_scratch_behind() {
    let root = test_root();
    let fetcher = base_fetcher()
        .route("https://first.example/Packages", b"\n")
        .route("https://second.example/Packages", b"\n")
        .route("https://legacy.example/ghost/ghost.ppkg", ERROR_PAGE);

    let registry = cached_registry(&root, &fetcher);
    let before = list_cache(&registry.cache_dir());
    let err = resolve(&registry, &fetcher, "ghost").expect_err("must not resolve");
    assert!(err.to_string().contains("not found in any repository"));
    assert_eq!(list_cache(&registry.cache_dir()), before);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn search_spans_cached_indexes_and_legacy_lists() {
    let root = test_root();
    let first_index = format!(
        "{}{}",
        stanza("ripfetch", "2.1.0", "duopack", "./pool/ripfetch.dpk"),
        stanza("unrelated", "1.0.0", "duopack", "./pool/unrelated.dpk")
    );
    let fetcher = base_fetcher()
        .route("https://first.example/Packages", first_index.as_bytes())
        .route("https://second.example/Packages", b"\n")
        .route("https://legacy.example/package.list", b"ripgrab\nother\n");

    let registry = cached_registry(&root, &fetcher);
    let hits = search(&registry, "rip");

    let names: Vec<&str> = hits.iter().map(|hit| hit.name.as_str()).collect();
    assert_eq!(names, vec!["ripfetch", "ripgrab"]);
    assert_eq!(hits[0].format, PackageFormat::Modern);
    assert_eq!(hits[0].version, "2.1.0");
    assert_eq!(hits[1].format, PackageFormat::Legacy);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn find_cached_descriptor_uses_priority_order_without_network() {
    let root = test_root();
    let fetcher = base_fetcher()
        .route(
            "https://first.example/Packages",
            stanza("tool", "3.0.0", "duopack", "./pool/tool.dpk").as_bytes(),
        )
        .route(
            "https://second.example/Packages",
            stanza("tool", "1.0.0", "duopack", "./pool/tool.dpk").as_bytes(),
        );

    let registry = cached_registry(&root, &fetcher);
    let descriptor = find_cached_descriptor(&registry, "tool").expect("must find");
    assert_eq!(descriptor.version, "3.0.0");
    assert!(find_cached_descriptor(&registry, "ghost").is_none());

    let _ = fs::remove_dir_all(&root);
}

fn list_cache(cache_dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(cache_dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

fn test_root() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    std::env::temp_dir().join(format!(
        "duopack-resolver-tests-{}-{nanos}",
        std::process::id()
    ))
}
