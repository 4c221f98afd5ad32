use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use duopack_core::{detect_compression, Archiver};
use log::{debug, warn};

use crate::layout::BaseLayout;
use crate::patch::{mark_executable, rewrite_legacy_prefix};
use crate::symlink::refresh_farm_links;

/// Payload subdirectory a modern archive must carry; its contents are merged
/// onto the install root.
pub const MODERN_PAYLOAD_DIR: &str = "pkg";

/// Optional file list a modern archive ships for its own manifest.
/// Root-merge leaves no clean enumeration boundary, so the archive has to
/// say what it owns.
pub const MODERN_FILE_LIST: &str = "package.list";

/// Root-merge strategy: extract into scratch, then copy the payload onto the
/// live install root, overwriting on conflict. Fatal on extraction or merge
/// failure; the artifact is left in place for inspection.
pub fn install_modern(
    layout: &BaseLayout,
    archiver: &dyn Archiver,
    artifact: &Path,
) -> Result<Vec<PathBuf>> {
    let kind = detect_compression(artifact)?;
    debug!("extracting {} as {}", artifact.display(), kind.as_str());

    let scratch = layout.modern_scratch_dir();
    replace_dir(&scratch)?;

    if let Err(err) = archiver.extract(artifact, kind, &scratch) {
        let _ = fs::remove_dir_all(&scratch);
        return Err(err).with_context(|| format!("failed to extract {}", artifact.display()));
    }

    let payload = scratch.join(MODERN_PAYLOAD_DIR);
    if !payload.is_dir() {
        let _ = fs::remove_dir_all(&scratch);
        bail!(
            "archive {} has no '{MODERN_PAYLOAD_DIR}' payload directory",
            artifact.display()
        );
    }

    if let Err(err) = merge_tree(&payload, layout.install_root()) {
        let _ = fs::remove_dir_all(&scratch);
        return Err(err).context("failed to merge payload onto install root");
    }

    let manifest = read_shipped_file_list(&scratch.join(MODERN_FILE_LIST))?;
    let _ = fs::remove_dir_all(&scratch);
    Ok(manifest)
}

/// Isolated strategy: extract into a package-namespaced directory, rewrite
/// the legacy prefix in text files, mark files executable, and fan symlinks
/// out into the shared bin directory. The manifest is the isolated
/// directory's top-level entries.
pub fn install_legacy(
    layout: &BaseLayout,
    archiver: &dyn Archiver,
    artifact: &Path,
    name: &str,
) -> Result<Vec<PathBuf>> {
    let kind = detect_compression(artifact)?;
    debug!("extracting {} as {}", artifact.display(), kind.as_str());

    let scratch = layout.legacy_scratch_dir(name);
    replace_dir(&scratch)?;

    if let Err(err) = archiver.extract(artifact, kind, &scratch) {
        let _ = fs::remove_dir_all(&scratch);
        return Err(err).with_context(|| format!("failed to extract {}", artifact.display()));
    }

    let install_dir = layout.package_install_dir(name);
    replace_dir(&install_dir)?;
    if let Err(err) = move_entries(&scratch, &install_dir) {
        let _ = fs::remove_dir_all(&scratch);
        let _ = fs::remove_dir_all(&install_dir);
        return Err(err).context("failed to move files into the install directory");
    }
    let _ = fs::remove_dir_all(&scratch);

    let entries = top_level_entries(&install_dir)?;
    for path in &entries {
        let is_regular_file = fs::symlink_metadata(path)
            .map(|metadata| metadata.is_file())
            .unwrap_or(false);
        if !is_regular_file {
            continue;
        }

        match rewrite_legacy_prefix(path, &install_dir) {
            Ok(true) => debug!("patched legacy prefix in {}", path.display()),
            Ok(false) => {}
            Err(err) => warn!("could not patch {}: {err:#}", path.display()),
        }
        if let Err(err) = mark_executable(path) {
            warn!("could not set permissions on {}: {err:#}", path.display());
        }
    }

    refresh_farm_links(&layout.bin_dir(), &install_dir);
    Ok(entries)
}

fn top_level_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?
    {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        entries.push(entry.path());
    }
    entries.sort();
    Ok(entries)
}

fn read_shipped_file_list(path: &Path) -> Result<Vec<PathBuf>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

fn replace_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("failed to clear {}", dir.display()))?;
    }
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))
}

fn move_entries(src: &Path, dst: &Path) -> Result<()> {
    for entry in fs::read_dir(src).with_context(|| format!("failed to read {}", src.display()))? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        fs::rename(entry.path(), &target).with_context(|| {
            format!(
                "failed to move {} to {}",
                entry.path().display(),
                target.display()
            )
        })?;
    }
    Ok(())
}

/// Recursive overwrite-on-conflict copy of `src`'s contents into `dst`.
fn merge_tree(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).with_context(|| format!("failed to create {}", dst.display()))?;

    for entry in fs::read_dir(src).with_context(|| format!("failed to read {}", src.display()))? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let metadata = fs::symlink_metadata(&src_path)
            .with_context(|| format!("failed to stat {}", src_path.display()))?;

        if metadata.is_dir() {
            merge_tree(&src_path, &dst_path)?;
            continue;
        }

        #[cfg(unix)]
        if metadata.file_type().is_symlink() {
            let target = fs::read_link(&src_path)
                .with_context(|| format!("failed to read symlink {}", src_path.display()))?;
            if fs::symlink_metadata(&dst_path).is_ok() {
                fs::remove_file(&dst_path)
                    .with_context(|| format!("failed to replace {}", dst_path.display()))?;
            }
            std::os::unix::fs::symlink(&target, &dst_path).with_context(|| {
                format!(
                    "failed to create symlink {} -> {}",
                    dst_path.display(),
                    target.display()
                )
            })?;
            continue;
        }

        if fs::symlink_metadata(&dst_path).is_ok() {
            fs::remove_file(&dst_path)
                .with_context(|| format!("failed to replace {}", dst_path.display()))?;
        }
        fs::copy(&src_path, &dst_path).with_context(|| {
            format!(
                "failed to copy {} to {}",
                src_path.display(),
                dst_path.display()
            )
        })?;
    }
    Ok(())
}
