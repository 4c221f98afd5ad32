use serde::Serialize;

use crate::index::IndexStanza;

/// Architecture tag a modern index stanza must carry for this tool.
pub const ARCHITECTURE_TAG: &str = "duopack";

/// Architecture label recorded for convention-addressed packages.
pub const LEGACY_ARCH_LABEL: &str = "legacy";

pub const MODERN_ARCHIVE_EXT: &str = "dpk";
pub const LEGACY_ARCHIVE_EXT: &str = "ppkg";

/// The package manager's own record name; protected from removal.
pub const SELF_PACKAGE_NAME: &str = "duopack";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageFormat {
    Modern,
    Legacy,
}

impl PackageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Modern => "modern",
            Self::Legacy => "legacy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: String,
    pub architecture: String,
    pub filename: String,
    pub description: String,
    pub display_name: String,
    pub size: u64,
    pub format: PackageFormat,
}

impl PackageDescriptor {
    pub fn from_stanza(stanza: &IndexStanza) -> Self {
        Self {
            name: stanza.package.clone(),
            version: stanza.version.clone(),
            architecture: stanza.architecture.clone(),
            filename: stanza.filename.clone(),
            description: stanza.description.clone(),
            display_name: stanza.display_name.clone(),
            size: stanza.size,
            format: PackageFormat::Modern,
        }
    }

    pub fn legacy(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            architecture: LEGACY_ARCH_LABEL.to_string(),
            filename: String::new(),
            description: String::new(),
            display_name: String::new(),
            size: 0,
            format: PackageFormat::Legacy,
        }
    }
}
