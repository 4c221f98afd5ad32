use std::fs;
use std::path::Path;

use log::{debug, warn};

/// Creates one `bin/` symlink per top-level entry of the isolated install
/// directory, replacing any stale same-named link. PATH integration is best
/// effort: a failure is logged and the install proceeds, since the package
/// stays usable through its isolated path.
pub fn refresh_farm_links(bin_dir: &Path, install_dir: &Path) {
    let entries = match fs::read_dir(install_dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("cannot enumerate {}: {err}", install_dir.display());
            return;
        }
    };

    for entry in entries.filter_map(|entry| entry.ok()) {
        let file_name = entry.file_name();
        if file_name.to_string_lossy().starts_with('.') {
            continue;
        }

        let source = install_dir.join(&file_name);
        let target = bin_dir.join(&file_name);

        let _ = fs::remove_file(&target);
        match place_link(&source, &target) {
            Ok(()) => debug!("linked {} -> {}", target.display(), source.display()),
            Err(err) => warn!(
                "failed to link {} -> {}: {err}",
                target.display(),
                source.display()
            ),
        }
    }
}

/// Removes the farm links a package's manifest accounts for. Only entries
/// that lstat as symlinks are touched; a same-named regular file in `bin/`
/// belongs to someone else and is left alone.
pub fn remove_farm_links(bin_dir: &Path, manifest: &[impl AsRef<Path>]) {
    for path in manifest {
        let Some(file_name) = path.as_ref().file_name() else {
            continue;
        };
        let link = bin_dir.join(file_name);

        let is_symlink = fs::symlink_metadata(&link)
            .map(|metadata| metadata.file_type().is_symlink())
            .unwrap_or(false);
        if !is_symlink {
            continue;
        }

        match fs::remove_file(&link) {
            Ok(()) => debug!("removed link {}", link.display()),
            Err(err) => warn!("failed to remove link {}: {err}", link.display()),
        }
    }
}

#[cfg(unix)]
fn place_link(source: &Path, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(not(unix))]
fn place_link(_source: &Path, _target: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "symlink farm requires a unix filesystem",
    ))
}
