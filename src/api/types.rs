//! Response shapes for the repository endpoints
//!
//! Only the fields the scoring pipeline reads are declared; everything
//! else in the payload is ignored by serde.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LicenseInfo {
    #[serde(default)]
    pub spdx_id: Option<String>,
}

/// Repository metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub full_name: String,
    pub owner: Owner,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub license: Option<LicenseInfo>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitSignature {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub author: Option<GitSignature>,
}

/// Entry of the commit list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    #[serde(default)]
    pub commit: CommitDetail,
    /// Linked account, absent for unlinked email addresses
    #[serde(default)]
    pub author: Option<Owner>,
}

impl Commit {
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.commit.author.as_ref().and_then(|a| a.date)
    }

    /// Stable identity of the author: account login, else email, else name
    pub fn author_key(&self) -> Option<String> {
        if let Some(owner) = &self.author {
            return Some(owner.login.to_lowercase());
        }
        let sig = self.commit.author.as_ref()?;
        sig.email
            .as_ref()
            .or(sig.name.as_ref())
            .map(|s| s.to_lowercase())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub contributions: u64,
}

/// Issue list entry. The issues endpoint also returns pull requests;
/// those carry a `pull_request` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<serde_json::Value>,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    pub fn is_open(&self) -> bool {
        self.state == "open"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub state: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequest {
    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }

    pub fn is_closed_unmerged(&self) -> bool {
        self.state == "closed" && self.merged_at.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl Release {
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.published_at.or(self.created_at)
    }
}

/// Presence of the community health files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunityFiles {
    #[serde(default)]
    pub code_of_conduct: Option<serde_json::Value>,
    #[serde(default)]
    pub contributing: Option<serde_json::Value>,
    #[serde(default)]
    pub license: Option<serde_json::Value>,
    #[serde(default)]
    pub readme: Option<serde_json::Value>,
    #[serde(default)]
    pub issue_template: Option<serde_json::Value>,
    #[serde(default)]
    pub pull_request_template: Option<serde_json::Value>,
}

fn present(value: &Option<serde_json::Value>) -> bool {
    matches!(value, Some(v) if !v.is_null())
}

impl CommunityFiles {
    pub fn has_code_of_conduct(&self) -> bool {
        present(&self.code_of_conduct)
    }
    pub fn has_contributing(&self) -> bool {
        present(&self.contributing)
    }
    pub fn has_license(&self) -> bool {
        present(&self.license)
    }
    pub fn has_issue_template(&self) -> bool {
        present(&self.issue_template)
    }
    pub fn has_pull_request_template(&self) -> bool {
        present(&self.pull_request_template)
    }
}

/// Community health profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunityProfile {
    #[serde(default)]
    pub health_percentage: u32,
    #[serde(default)]
    pub files: CommunityFiles,
}

/// Governance document probe paths
pub const GOVERNANCE_PATHS: &[&str] = &[
    "GOVERNANCE.md",
    "OWNERS",
    "MAINTAINERS",
    "MAINTAINERS.md",
    "CODEOWNERS",
    ".github/CODEOWNERS",
    "docs/CODEOWNERS",
    "STEERING.md",
    "TSC.md",
];

/// Governance documents found by probing [`GOVERNANCE_PATHS`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GovernanceFiles {
    pub found: Vec<String>,
}

impl GovernanceFiles {
    pub fn has_governance(&self) -> bool {
        !self.found.is_empty()
    }

    pub fn has_codeowners(&self) -> bool {
        self.found.iter().any(|p| p.ends_with("CODEOWNERS"))
    }
}

/// Entry of the best-practices badge project search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BadgeProject {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub badge_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_ignores_unknown_fields() {
        let json = r#"{
            "full_name": "octo/widget",
            "owner": {"login": "octo", "id": 1},
            "stargazers_count": 42,
            "forks_count": 3,
            "pushed_at": "2026-10-01T12:00:00Z",
            "license": {"spdx_id": "MIT", "name": "MIT License"},
            "visibility": "public"
        }"#;
        let repo: Repository = serde_json::from_str(json).expect("parse repository");
        assert_eq!(repo.owner.login, "octo");
        assert_eq!(repo.stargazers_count, 42);
        assert!(repo.pushed_at.is_some());
        assert!(repo.topics.is_empty());
    }

    #[test]
    fn test_commit_author_key_fallbacks() {
        let linked: Commit = serde_json::from_str(
            r#"{"sha":"a","author":{"login":"Alice"},"commit":{"author":{"email":"a@x.io","date":"2026-10-01T00:00:00Z"}}}"#,
        )
        .unwrap();
        assert_eq!(linked.author_key().as_deref(), Some("alice"));

        let unlinked: Commit = serde_json::from_str(
            r#"{"sha":"b","author":null,"commit":{"author":{"name":"Bob","email":"Bob@X.io"}}}"#,
        )
        .unwrap();
        assert_eq!(unlinked.author_key().as_deref(), Some("bob@x.io"));
        assert_eq!(unlinked.date(), None);
    }

    #[test]
    fn test_issue_pull_request_marker() {
        let issue: Issue = serde_json::from_str(
            r#"{"number":1,"state":"open","created_at":"2026-01-01T00:00:00Z","updated_at":"2026-01-02T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(!issue.is_pull_request());
        assert!(issue.is_open());

        let pr: Issue = serde_json::from_str(
            r#"{"number":2,"state":"closed","created_at":"2026-01-01T00:00:00Z","updated_at":"2026-01-02T00:00:00Z","pull_request":{"url":"x"}}"#,
        )
        .unwrap();
        assert!(pr.is_pull_request());
    }

    #[test]
    fn test_community_files_null_means_absent() {
        let profile: CommunityProfile = serde_json::from_str(
            r#"{"health_percentage":71,"files":{"code_of_conduct":null,"contributing":{"url":"x"},"license":{"spdx_id":"MIT"}}}"#,
        )
        .unwrap();
        assert_eq!(profile.health_percentage, 71);
        assert!(!profile.files.has_code_of_conduct());
        assert!(profile.files.has_contributing());
        assert!(profile.files.has_license());
        assert!(!profile.files.has_issue_template());
    }

    #[test]
    fn test_governance_helpers() {
        let files = GovernanceFiles {
            found: vec![".github/CODEOWNERS".into()],
        };
        assert!(files.has_governance());
        assert!(files.has_codeowners());
        assert!(!GovernanceFiles::default().has_governance());
    }
}
