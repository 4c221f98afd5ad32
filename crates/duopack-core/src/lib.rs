mod capability;
mod compression;
mod index;
mod package;
mod repo;
mod settings;
mod sniff;

pub use capability::{Archiver, Fetcher};
pub use compression::{detect_compression, CompressionKind};
pub use index::{find_stanza, parse_index, IndexStanza, INDEX_FILE_NAME, LEGACY_LIST_FILE_NAME};
pub use package::{
    PackageDescriptor, PackageFormat, ARCHITECTURE_TAG, LEGACY_ARCHIVE_EXT, LEGACY_ARCH_LABEL,
    MODERN_ARCHIVE_EXT, SELF_PACKAGE_NAME,
};
pub use repo::{sort_by_tier, RepoTier, Repository, RELEASE_FILE_NAME};
pub use settings::Settings;
pub use sniff::{is_text_file, looks_like_error_page};
