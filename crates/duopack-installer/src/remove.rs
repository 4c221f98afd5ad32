use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;

use crate::layout::BaseLayout;
use crate::store::ManifestStore;
use crate::symlink::remove_farm_links;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveStatus {
    Removed { version: String },
    NotInstalled,
}

/// Deletes a package: its farm links, then exactly the paths its manifest
/// owns, then the record itself. Paths that are already gone count as
/// removed.
pub fn remove_package(
    layout: &BaseLayout,
    store: &ManifestStore,
    name: &str,
) -> Result<RemoveStatus> {
    let Some(record) = store.load(name)? else {
        return Ok(RemoveStatus::NotInstalled);
    };

    remove_farm_links(&layout.bin_dir(), &record.manifest);

    for path in &record.manifest {
        delete_path(path)?;
        debug!("removed {}", path.display());
    }

    store.delete(name)?;
    Ok(RemoveStatus::Removed {
        version: record.version,
    })
}

fn delete_path(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err).with_context(|| format!("failed to stat {}", path.display())),
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path).with_context(|| format!("failed to remove {}", path.display()))
    } else {
        fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))
    }
}
