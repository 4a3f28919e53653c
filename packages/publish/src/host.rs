//! The remote operations the publish sequence needs.

use async_trait::async_trait;

use crate::PublishError;

/// Result of a branch creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchOutcome {
    /// The branch was created.
    Created,
    /// A branch of that name was already there; reused as is.
    AlreadyExisted,
}

/// A source-control host that accepts branches, file commits and change
/// requests.
///
/// Implementations apply a request timeout and never retry on their own;
/// retrying is the user's decision.
#[async_trait]
pub trait ChangeRequestHost: Send + Sync {
    /// Creates `branch` from the head of `base`. An existing branch of the
    /// same name is reported as [`BranchOutcome::AlreadyExisted`], not an
    /// error.
    async fn create_branch(&self, branch: &str, base: &str) -> Result<BranchOutcome, PublishError>;

    /// Creates or replaces the file at `path` on `branch`. Updating an
    /// existing file supplies its current content hash.
    async fn commit_file(
        &self,
        branch: &str,
        path: &str,
        content: &[u8],
        message: &str,
    ) -> Result<(), PublishError>;

    /// Opens a change request from `branch` into `base` and returns its URL.
    async fn open_change_request(
        &self,
        branch: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<String, PublishError>;
}
