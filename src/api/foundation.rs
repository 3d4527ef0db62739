//! Foundation affiliation heuristic
//!
//! Looks at the owning organization and the README text. Tiers follow the
//! CNCF maturity levels; `member` covers foundations without a tier.

use super::types::Repository;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoundationTier {
    Graduated,
    Incubating,
    Sandbox,
    Member,
    /// Confirmed: no affiliation found in available data
    None,
}

impl FoundationTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            FoundationTier::Graduated => "graduated",
            FoundationTier::Incubating => "incubating",
            FoundationTier::Sandbox => "sandbox",
            FoundationTier::Member => "member",
            FoundationTier::None => "none",
        }
    }
}

impl std::fmt::Display for FoundationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Organizations that are themselves foundation umbrellas
const FOUNDATION_ORGS: &[&str] = &[
    "cncf",
    "kubernetes",
    "kubernetes-sigs",
    "linuxfoundation",
    "lfai",
    "lf-edge",
    "hyperledger",
    "openjs-foundation",
    "nodejs",
    "eclipse",
    "eclipse-ee4j",
    "python",
    "rust-lang",
    "opensearch-project",
    "openssf",
    "ossf",
];

const FOUNDATION_PHRASES: &[&str] = &[
    "linux foundation",
    "openjs foundation",
    "eclipse foundation",
    "apache software foundation",
    "python software foundation",
    "open source security foundation",
];

/// Detect the affiliation tier.
///
/// Returns `None` when there is no README to inspect and the owner is not
/// a known foundation organization: that is missing data, not a
/// confirmed absence.
pub fn detect(repository: &Repository, readme: Option<&str>) -> Option<FoundationTier> {
    let owner = repository.owner.login.to_lowercase();
    let readme = readme.map(str::to_lowercase);
    let topics: Vec<String> = repository.topics.iter().map(|t| t.to_lowercase()).collect();

    let mentions_cncf = readme
        .as_deref()
        .is_some_and(|r| r.contains("cncf") || r.contains("cloud native computing foundation"))
        || topics.iter().any(|t| t == "cncf");

    if mentions_cncf {
        if let Some(text) = readme.as_deref() {
            if text.contains("graduated") {
                return Some(FoundationTier::Graduated);
            }
            if text.contains("incubating") || text.contains("incubation") {
                return Some(FoundationTier::Incubating);
            }
            if text.contains("sandbox") {
                return Some(FoundationTier::Sandbox);
            }
        }
    }

    if owner == "apache" {
        let incubating = readme
            .as_deref()
            .is_some_and(|r| r.contains("apache incubator") || r.contains("incubating"));
        return Some(if incubating {
            FoundationTier::Incubating
        } else {
            FoundationTier::Graduated
        });
    }

    if FOUNDATION_ORGS.contains(&owner.as_str()) || mentions_cncf {
        return Some(FoundationTier::Member);
    }

    match readme.as_deref() {
        Some(text) if FOUNDATION_PHRASES.iter().any(|p| text.contains(p)) => {
            Some(FoundationTier::Member)
        }
        Some(_) => Some(FoundationTier::None),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::Owner;

    fn repo(owner: &str) -> Repository {
        Repository {
            full_name: format!("{owner}/project"),
            owner: Owner {
                login: owner.to_string(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_cncf_tiers_from_readme() {
        let r = repo("someorg");
        assert_eq!(
            detect(&r, Some("We are a Cloud Native Computing Foundation graduated project.")),
            Some(FoundationTier::Graduated)
        );
        assert_eq!(
            detect(&r, Some("CNCF incubating project")),
            Some(FoundationTier::Incubating)
        );
        assert_eq!(
            detect(&r, Some("A CNCF Sandbox project")),
            Some(FoundationTier::Sandbox)
        );
        assert_eq!(
            detect(&r, Some("Listed in the CNCF landscape")),
            Some(FoundationTier::Member)
        );
    }

    #[test]
    fn test_apache_projects() {
        assert_eq!(detect(&repo("apache"), Some("Apache Kafka")), Some(FoundationTier::Graduated));
        assert_eq!(
            detect(&repo("apache"), Some("This is an Apache Incubator project")),
            Some(FoundationTier::Incubating)
        );
        assert_eq!(detect(&repo("Apache"), None), Some(FoundationTier::Graduated));
    }

    #[test]
    fn test_known_orgs_and_phrases() {
        assert_eq!(detect(&repo("kubernetes"), None), Some(FoundationTier::Member));
        assert_eq!(
            detect(&repo("someone"), Some("Hosted by the OpenJS Foundation")),
            Some(FoundationTier::Member)
        );
    }

    #[test]
    fn test_none_versus_unknown() {
        assert_eq!(detect(&repo("someone"), Some("# Widget")), Some(FoundationTier::None));
        assert_eq!(detect(&repo("someone"), None), None);
    }
}
