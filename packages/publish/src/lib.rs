#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Edit, validate and publish curated dataset tables.
//!
//! An [`session::EditSession`] owns a working copy of one table. Edits move
//! it from `Clean` to `Dirty`; [`validate::validate_edits`] checks the
//! working copy against the original; a valid table can be published to a
//! [`host::ChangeRequestHost`] as a branch, a commit and a change request.
//! [`github::GitHubClient`] is the production host.
//!
//! Nothing here writes the persisted dataset except an explicit local save
//! or the publish sequence.

pub mod config;
pub mod github;
pub mod host;
pub mod session;
pub mod summary;
pub mod validate;

use care_access_dataset::DatasetError;
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

pub use config::PublishConfig;
pub use host::{BranchOutcome, ChangeRequestHost};
pub use session::{EditSession, SessionState};
pub use summary::ChangeSummary;
pub use validate::{DatasetKind, ValidationReport, validate_edits};

/// One remote call of the publish sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum PublishStep {
    /// Creating the branch from the base branch.
    #[strum(serialize = "create branch")]
    CreateBranch,
    /// Committing the table to the branch.
    #[strum(serialize = "commit file")]
    CommitFile,
    /// Opening the change request.
    #[strum(serialize = "open change request")]
    OpenChangeRequest,
}

#[allow(clippy::ref_option)]
fn status_suffix(status: &Option<u16>) -> String {
    status.map_or_else(String::new, |s| format!(" (HTTP {s})"))
}

/// Errors from the publish workflow.
#[derive(Debug, Error)]
pub enum PublishError {
    /// One or more publish secrets are not configured.
    #[error("Cannot publish: missing configuration {}", .names.join(", "))]
    MissingConfig {
        /// Names of the missing settings.
        names: Vec<&'static str>,
    },

    /// A publish setting is present but unusable.
    #[error("Invalid {name}: {message}")]
    InvalidConfig {
        /// Setting name.
        name: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// The session is not in a publishable state.
    #[error("Cannot publish: the table has not been validated since the last edit")]
    NotValidated,

    /// The working table failed validation.
    #[error("Cannot publish: validation found {issues} issue(s)")]
    ValidationFailed {
        /// Total number of issues found.
        issues: usize,
    },

    /// A remote call failed.
    #[error("Failed to {step}{}: {message}", status_suffix(.status))]
    Remote {
        /// Which call failed.
        step: PublishStep,
        /// HTTP status, if the host answered.
        status: Option<u16>,
        /// The host's message or the transport error.
        message: String,
    },

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serializing the table failed.
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Serializing the change summary failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PublishError {
    /// The HTTP status attached to a remote failure.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => *status,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_errors_name_the_step_and_status() {
        let err = PublishError::Remote {
            step: PublishStep::CommitFile,
            status: Some(409),
            message: "sha does not match".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to commit file (HTTP 409): sha does not match");
        assert_eq!(err.status(), Some(409));

        let offline = PublishError::Remote {
            step: PublishStep::CreateBranch,
            status: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(offline.to_string(), "Failed to create branch: connection refused");
    }

    #[test]
    fn missing_config_lists_every_name() {
        let err = PublishError::MissingConfig {
            names: vec!["GITHUB_REPO", "GITHUB_TOKEN"],
        };
        assert_eq!(
            err.to_string(),
            "Cannot publish: missing configuration GITHUB_REPO, GITHUB_TOKEN"
        );
    }
}
