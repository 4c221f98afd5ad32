use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use duopack_core::is_text_file;

/// Install prefix of the predecessor tool. Legacy archives were built
/// against it and carry it in scripts and config files.
pub const LEGACY_COMPAT_PREFIX: &str = "/data/purplpkg";

/// Rewrites every occurrence of the compatibility prefix to the package's
/// isolated install directory. Binary files (NUL byte within the first 512
/// bytes) are left byte-identical. Returns whether the file was rewritten.
pub fn rewrite_legacy_prefix(path: &Path, install_dir: &Path) -> Result<bool> {
    if !is_text_file(path) {
        return Ok(false);
    }

    let content =
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let needle = LEGACY_COMPAT_PREFIX.as_bytes();
    if !contains(&content, needle) {
        return Ok(false);
    }

    let replacement = install_dir.to_string_lossy().into_owned();
    let patched = replace_all(&content, needle, replacement.as_bytes());

    let scratch = PathBuf::from(format!("{}.tmp", path.display()));
    fs::write(&scratch, patched)
        .with_context(|| format!("failed to write {}", scratch.display()))?;
    fs::rename(&scratch, path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(true)
}

#[cfg(unix)]
pub fn mark_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
pub fn mark_executable(_path: &Path) -> Result<()> {
    Ok(())
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

fn replace_all(input: &[u8], needle: &[u8], replacement: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut rest = input;
    while let Some(offset) = rest
        .windows(needle.len())
        .position(|window| window == needle)
    {
        out.extend_from_slice(&rest[..offset]);
        out.extend_from_slice(replacement);
        rest = &rest[offset + needle.len()..];
    }
    out.extend_from_slice(rest);
    out
}
