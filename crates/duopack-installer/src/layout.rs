use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const DEFAULT_STATE_ROOT: &str = "/data/duopack";

/// State root override, mainly for tests and sandboxed runs.
const STATE_ROOT_ENV: &str = "DUOPACK_ROOT";

pub fn default_state_root() -> PathBuf {
    match std::env::var(STATE_ROOT_ENV) {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => PathBuf::from(DEFAULT_STATE_ROOT),
    }
}

/// Directory scheme under the state root, plus the filesystem root that
/// root-merge installs write into (`/` in production, a scratch directory in
/// tests).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseLayout {
    root: PathBuf,
    install_root: PathBuf,
}

impl BaseLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            install_root: PathBuf::from("/"),
        }
    }

    pub fn with_install_root(root: impl Into<PathBuf>, install_root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            install_root: install_root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn files_dir(&self) -> PathBuf {
        self.root.join("files")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn legacy_install_dir(&self) -> PathBuf {
        self.root.join("legacy").join("installed")
    }

    pub fn package_install_dir(&self, name: &str) -> PathBuf {
        self.legacy_install_dir().join(name)
    }

    pub fn modern_scratch_dir(&self) -> PathBuf {
        self.cache_dir().join("temp_extract")
    }

    pub fn legacy_scratch_dir(&self, name: &str) -> PathBuf {
        self.cache_dir().join(format!("legacy_extract_{name}"))
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [
            self.versions_dir(),
            self.files_dir(),
            self.cache_dir(),
            self.bin_dir(),
            self.legacy_install_dir(),
        ] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}
