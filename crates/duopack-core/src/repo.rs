use serde::Serialize;

/// Index resource probed to classify a repository as modern.
pub const RELEASE_FILE_NAME: &str = "Release";

/// Probe-derived repository classification. Verified repositories are
/// consulted before unverified ones during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoTier {
    Unverified,
    VerifiedModern,
}

impl RepoTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unverified => "legacy",
            Self::VerifiedModern => "duopack",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repository {
    pub url: String,
    pub tier: RepoTier,
}

impl Repository {
    pub fn new(url: impl Into<String>, tier: RepoTier) -> Self {
        Self {
            url: url.into(),
            tier,
        }
    }

    pub fn unverified(url: impl Into<String>) -> Self {
        Self::new(url, RepoTier::Unverified)
    }
}

/// Orders repositories by tier, best first. The sort is stable: repositories
/// of equal tier keep their relative input order, which makes resolution
/// order deterministic.
pub fn sort_by_tier(repos: &mut [Repository]) {
    repos.sort_by(|a, b| b.tier.cmp(&a.tier));
}
