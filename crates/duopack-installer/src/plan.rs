use anyhow::Result;

use crate::store::ManifestStore;

/// Reconciliation verdict for a package against a freshly resolved version.
/// Versions are compared by exact string equality; there is no ordering
/// between version strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallPlan {
    NotInstalled,
    UpToDate,
    UpgradeAvailable { installed: String, available: String },
}

pub fn plan(store: &ManifestStore, name: &str, available: &str) -> Result<InstallPlan> {
    let Some(record) = store.load(name)? else {
        return Ok(InstallPlan::NotInstalled);
    };
    if record.version == available {
        Ok(InstallPlan::UpToDate)
    } else {
        Ok(InstallPlan::UpgradeAvailable {
            installed: record.version,
            available: available.to_string(),
        })
    }
}
