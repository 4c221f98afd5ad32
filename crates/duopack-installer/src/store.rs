use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use duopack_core::SELF_PACKAGE_NAME;

use crate::layout::BaseLayout;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledRecord {
    pub version: String,
    pub manifest: Vec<PathBuf>,
}

/// Per-package install state: `versions/<pkg>` holds the version string,
/// `files/<pkg>` the newline-separated absolute path manifest. A package is
/// installed iff its version file exists; the manifest is the sole source of
/// truth for what the package owns on disk.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    versions_dir: PathBuf,
    files_dir: PathBuf,
}

impl ManifestStore {
    pub fn new(layout: &BaseLayout) -> Self {
        Self {
            versions_dir: layout.versions_dir(),
            files_dir: layout.files_dir(),
        }
    }

    pub fn version_path(&self, name: &str) -> PathBuf {
        self.versions_dir.join(name)
    }

    pub fn manifest_path(&self, name: &str) -> PathBuf {
        self.files_dir.join(name)
    }

    /// Fully replaces the record; a re-install can never leave stale
    /// manifest entries from a previous version behind.
    pub fn save(&self, name: &str, version: &str, manifest: &[PathBuf]) -> Result<()> {
        fs::create_dir_all(&self.versions_dir)
            .with_context(|| format!("failed to create {}", self.versions_dir.display()))?;
        fs::create_dir_all(&self.files_dir)
            .with_context(|| format!("failed to create {}", self.files_dir.display()))?;

        let version_path = self.version_path(name);
        fs::write(&version_path, format!("{version}\n"))
            .with_context(|| format!("failed to write {}", version_path.display()))?;

        let mut lines = String::new();
        for path in manifest {
            lines.push_str(&path.to_string_lossy());
            lines.push('\n');
        }
        let manifest_path = self.manifest_path(name);
        fs::write(&manifest_path, lines)
            .with_context(|| format!("failed to write {}", manifest_path.display()))?;
        Ok(())
    }

    pub fn load(&self, name: &str) -> Result<Option<InstalledRecord>> {
        let version_path = self.version_path(name);
        let version = match fs::read_to_string(&version_path) {
            Ok(content) => content.trim().to_string(),
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read {}", version_path.display()));
            }
        };

        let manifest = match fs::read_to_string(self.manifest_path(name)) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(PathBuf::from)
                .collect(),
            Err(err) if err.kind() == ErrorKind::NotFound => Vec::new(),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read {}", self.manifest_path(name).display())
                });
            }
        };

        Ok(Some(InstalledRecord { version, manifest }))
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        remove_if_exists(&self.manifest_path(name))?;
        remove_if_exists(&self.version_path(name))?;
        Ok(())
    }

    pub fn installed_names(&self) -> Result<Vec<String>> {
        if !self.versions_dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.versions_dir)
            .with_context(|| format!("failed to read {}", self.versions_dir.display()))?
        {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with('.') && entry.file_type()?.is_file() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Records the package manager itself on first run, so it shows up in
    /// listings and the removal flow can protect it.
    pub fn seed_self_record(&self, layout: &BaseLayout) -> Result<()> {
        if self.version_path(SELF_PACKAGE_NAME).exists() {
            return Ok(());
        }
        self.save(
            SELF_PACKAGE_NAME,
            env!("CARGO_PKG_VERSION"),
            &[layout.bin_dir().join(SELF_PACKAGE_NAME)],
        )
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("failed to remove {}", path.display())),
    }
}
