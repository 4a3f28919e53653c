//! Publish settings from the environment.

use std::fmt;

use crate::PublishError;

/// Repository identifier, `owner/name`.
pub const REPO_ENV: &str = "GITHUB_REPO";

/// Access token with contents and pull-request write permission.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Branch that change requests target.
pub const BASE_BRANCH_ENV: &str = "GITHUB_BASE_BRANCH";

/// Optional API root, for GitHub Enterprise or tests.
pub const API_URL_ENV: &str = "GITHUB_API_URL";

/// Optional remote directory the tables are committed under.
pub const PUBLISH_DIR_ENV: &str = "CARE_ACCESS_PUBLISH_DIR";

/// Public GitHub API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Remote directory used when [`PUBLISH_DIR_ENV`] is unset.
pub const DEFAULT_PUBLISH_DIR: &str = "data/final";

/// Where and as whom to publish.
#[derive(Clone, PartialEq, Eq)]
pub struct PublishConfig {
    /// `owner/name`.
    pub repo: String,
    /// API token.
    pub token: String,
    /// Base branch for new branches and change requests.
    pub base_branch: String,
    /// API root without a trailing slash.
    pub api_url: String,
    /// Remote directory for committed files, without surrounding slashes.
    pub publish_dir: String,
}

impl fmt::Debug for PublishConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishConfig")
            .field("repo", &self.repo)
            .field("token", &"<redacted>")
            .field("base_branch", &self.base_branch)
            .field("api_url", &self.api_url)
            .field("publish_dir", &self.publish_dir)
            .finish()
    }
}

impl PublishConfig {
    /// Reads the settings from environment variables.
    ///
    /// # Errors
    ///
    /// See [`Self::from_lookup`].
    pub fn from_env() -> Result<Self, PublishError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the settings through `lookup`. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::MissingConfig`] naming every required
    /// setting that is unset, or [`PublishError::InvalidConfig`] if the
    /// repository is not `owner/name`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PublishError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let repo = get(REPO_ENV);
        let token = get(TOKEN_ENV);
        let base_branch = get(BASE_BRANCH_ENV);

        let (Some(repo), Some(token), Some(base_branch)) = (repo.clone(), token.clone(), base_branch.clone())
        else {
            let names = [(REPO_ENV, repo), (TOKEN_ENV, token), (BASE_BRANCH_ENV, base_branch)]
                .into_iter()
                .filter(|(_, value)| value.is_none())
                .map(|(name, _)| name)
                .collect();
            return Err(PublishError::MissingConfig { names });
        };

        let valid_repo = repo
            .split_once('/')
            .is_some_and(|(owner, name)| !owner.is_empty() && !name.is_empty() && !name.contains('/'));
        if !valid_repo {
            return Err(PublishError::InvalidConfig {
                name: REPO_ENV,
                message: format!("expected owner/name, got {repo:?}"),
            });
        }

        Ok(Self {
            repo,
            token,
            base_branch,
            api_url: get(API_URL_ENV)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            publish_dir: get(PUBLISH_DIR_ENV)
                .unwrap_or_else(|| DEFAULT_PUBLISH_DIR.to_string())
                .trim_matches('/')
                .to_string(),
        })
    }

    /// Remote path a file named `file_name` is committed to.
    #[must_use]
    pub fn remote_path(&self, file_name: &str) -> String {
        if self.publish_dir.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{file_name}", self.publish_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn reads_required_and_default_settings() {
        let config = PublishConfig::from_lookup(lookup(&[
            (REPO_ENV, "care-access/coverage-data"),
            (TOKEN_ENV, "ghp_secret"),
            (BASE_BRANCH_ENV, "main"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.remote_path("centers.csv"), "data/final/centers.csv");
        assert!(!format!("{config:?}").contains("ghp_secret"));
    }

    #[test]
    fn overrides_trim_slashes() {
        let config = PublishConfig::from_lookup(lookup(&[
            (REPO_ENV, "o/r"),
            (TOKEN_ENV, "t"),
            (BASE_BRANCH_ENV, "develop"),
            (API_URL_ENV, "http://127.0.0.1:9000/"),
            (PUBLISH_DIR_ENV, "/published/"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "http://127.0.0.1:9000");
        assert_eq!(config.remote_path("x.csv"), "published/x.csv");
    }

    #[test]
    fn reports_every_missing_secret() {
        let err = PublishConfig::from_lookup(lookup(&[(TOKEN_ENV, "t"), (BASE_BRANCH_ENV, "  ")])).unwrap_err();
        match err {
            PublishError::MissingConfig { names } => assert_eq!(names, [REPO_ENV, BASE_BRANCH_ENV]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_repo() {
        let err = PublishConfig::from_lookup(lookup(&[
            (REPO_ENV, "just-a-name"),
            (TOKEN_ENV, "t"),
            (BASE_BRANCH_ENV, "main"),
        ]))
        .unwrap_err();
        assert!(matches!(err, PublishError::InvalidConfig { name: REPO_ENV, .. }));
    }
}
