use std::path::Path;

use anyhow::Result;

use crate::compression::CompressionKind;

/// Transport seam. An implementation fetches `url` into `dest`, fully
/// replacing any existing file, and must not leave a partial file behind on
/// failure. An `Err` is a transport-level failure the caller may recover
/// from by trying another repository.
pub trait Fetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Extraction seam. An implementation unpacks `archive`, compressed with
/// `kind`, into the existing directory `dest`. An `Err` is fatal for the
/// operation in progress.
pub trait Archiver {
    fn extract(&self, archive: &Path, kind: CompressionKind, dest: &Path) -> Result<()>;
}
