mod archiver;
mod install;
mod layout;
mod patch;
mod plan;
mod remove;
mod store;
mod symlink;

pub use archiver::SystemArchiver;
pub use install::{install_legacy, install_modern, MODERN_FILE_LIST, MODERN_PAYLOAD_DIR};
pub use layout::{default_state_root, BaseLayout, DEFAULT_STATE_ROOT};
pub use patch::{mark_executable, rewrite_legacy_prefix, LEGACY_COMPAT_PREFIX};
pub use plan::{plan, InstallPlan};
pub use remove::{remove_package, RemoveStatus};
pub use store::{InstalledRecord, ManifestStore};
pub use symlink::{refresh_farm_links, remove_farm_links};
