use std::path::PathBuf;

use duopack_core::PackageDescriptor;

/// Outcome of a successful lookup: the descriptor and the downloaded
/// artifact, which the caller owns and must delete when done with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub descriptor: PackageDescriptor,
    pub artifact: PathBuf,
}
