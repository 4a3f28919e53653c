//! The edit session state machine and the publish sequence.
//!
//! ```text
//! Clean --edit--> Dirty --validate--> Invalid --edit--> Dirty
//!                          \--------> Valid --publish--> Published
//!                                       \-------------> PublishFailed --publish--> ...
//! revert: Dirty | Invalid | Valid | PublishFailed --> Clean
//! ```
//!
//! Validating and publishing are the duration of the corresponding calls;
//! no edit can interleave with them because both borrow the session
//! mutably.

use std::path::Path;

use care_access_dataset::{DatasetError, Table};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::PublishConfig;
use crate::host::{BranchOutcome, ChangeRequestHost};
use crate::summary::ChangeSummary;
use crate::validate::{DatasetKind, ValidationReport, validate_edits};
use crate::PublishError;

/// Where an edit session stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// The working table equals the original.
    Clean,
    /// Edited since the last validation.
    Dirty,
    /// The last validation found issues.
    Invalid {
        /// What was found.
        report: ValidationReport,
    },
    /// The last validation passed and nothing changed since.
    Valid,
    /// The change request is open. Terminal.
    Published {
        /// Change-request URL.
        url: String,
    },
    /// The last publish attempt failed; the table is still valid and may be
    /// published again.
    PublishFailed {
        /// The failure, as shown to the user.
        cause: String,
    },
}

/// Errors from editing a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session has been published and accepts no further edits.
    #[error("Session already published to {url}")]
    AlreadyPublished {
        /// Change-request URL.
        url: String,
    },

    /// An edit or a local save failed.
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// The branch a dataset edit is published on:
/// `data-update/{stem}-{YYYYmmdd-HHMMSS}` with the file stem reduced to
/// ASCII letters, digits, `-` and `_`.
#[must_use]
pub fn branch_name(dataset_name: &str, now: DateTime<Utc>) -> String {
    let stem = Path::new(dataset_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(dataset_name);
    let stem: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    format!("data-update/{stem}-{}", now.format("%Y%m%d-%H%M%S"))
}

/// Commit message for a dataset file.
#[must_use]
pub fn commit_message(file_name: &str) -> String {
    format!("chore(data): update {file_name}")
}

/// Change-request title for a dataset file.
#[must_use]
pub fn change_request_title(file_name: &str) -> String {
    format!("feat(data): update {file_name}")
}

/// Change-request body: a short line plus the summary as a JSON block.
///
/// # Errors
///
/// Returns [`PublishError::Json`] if the summary cannot be serialized.
pub fn change_request_body(summary: &ChangeSummary) -> Result<String, PublishError> {
    Ok(format!(
        "Automated data update for `{}`.\n\n```json\n{}\n```\n",
        summary.file,
        summary.to_json_pretty()?
    ))
}

/// Runs the three publish calls in order and returns the change-request
/// URL.
///
/// The first failing call aborts the rest. Nothing is rolled back: a
/// created branch or commit stays on the host and is reused on retry.
///
/// # Errors
///
/// Returns the failing call's [`PublishError`].
pub async fn publish_table(
    host: &dyn ChangeRequestHost,
    config: &PublishConfig,
    branch: &str,
    content: &[u8],
    summary: &ChangeSummary,
) -> Result<String, PublishError> {
    let body = change_request_body(summary)?;
    let file = summary.file.as_str();

    match host.create_branch(branch, &config.base_branch).await? {
        BranchOutcome::Created => log::debug!("Branch {branch} created"),
        BranchOutcome::AlreadyExisted => log::debug!("Branch {branch} reused"),
    }
    host.commit_file(branch, &config.remote_path(file), content, &commit_message(file))
        .await?;
    host.open_change_request(branch, &config.base_branch, &change_request_title(file), &body)
        .await
}

/// One user's edits to one dataset table.
#[derive(Debug, Clone)]
pub struct EditSession {
    dataset_name: String,
    kind: DatasetKind,
    original: Table,
    working: Table,
    state: SessionState,
    /// Branch of the last publish attempt, kept until the working table
    /// changes so a retry commits to the same branch.
    branch: Option<String>,
}

impl EditSession {
    /// Starts a session on `original`, named by its file name.
    #[must_use]
    pub fn new(dataset_name: impl Into<String>, kind: DatasetKind, original: Table) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            kind,
            working: original.clone(),
            original,
            state: SessionState::Clean,
            branch: None,
        }
    }

    /// Dataset file name.
    #[must_use]
    pub fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    /// Dataset kind used for validation.
    #[must_use]
    pub const fn kind(&self) -> DatasetKind {
        self.kind
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// The table as loaded.
    #[must_use]
    pub const fn original(&self) -> &Table {
        &self.original
    }

    /// Branch the pending or last publish attempt uses, if any.
    #[must_use]
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// The table with edits applied.
    #[must_use]
    pub const fn working(&self) -> &Table {
        &self.working
    }

    fn ensure_editable(&self) -> Result<(), SessionError> {
        match &self.state {
            SessionState::Published { url } => Err(SessionError::AlreadyPublished { url: url.clone() }),
            _ => Ok(()),
        }
    }

    fn after_edit(&mut self) {
        self.branch = None;
        self.state = if self.working == self.original {
            SessionState::Clean
        } else {
            SessionState::Dirty
        };
    }

    /// Applies `change` to the working table. If it fails the working
    /// table is left as it was.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyPublished`] after a successful
    /// publish, or the error `change` returned.
    pub fn edit(&mut self, change: impl FnOnce(&mut Table) -> Result<(), DatasetError>) -> Result<(), SessionError> {
        self.ensure_editable()?;
        let mut next = self.working.clone();
        change(&mut next)?;
        self.working = next;
        self.after_edit();
        Ok(())
    }

    /// Replaces the whole working table, e.g. with an edited copy read
    /// from disk.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyPublished`] after a successful
    /// publish.
    pub fn replace_working(&mut self, table: Table) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.working = table;
        self.after_edit();
        Ok(())
    }

    /// Sets one cell.
    ///
    /// # Errors
    ///
    /// See [`Self::edit`]; also fails if the row or column does not exist.
    pub fn set_cell(&mut self, row: usize, column: &str, value: &str) -> Result<(), SessionError> {
        self.edit(|table| table.set(row, column, value))
    }

    /// Appends a row.
    ///
    /// # Errors
    ///
    /// See [`Self::edit`].
    pub fn push_row(&mut self, row: Vec<String>) -> Result<(), SessionError> {
        self.edit(|table| {
            table.push_row(row);
            Ok(())
        })
    }

    /// Removes a row. Removing a row past the end changes nothing.
    ///
    /// # Errors
    ///
    /// See [`Self::edit`].
    pub fn remove_row(&mut self, index: usize) -> Result<(), SessionError> {
        self.edit(|table| {
            table.remove_row(index);
            Ok(())
        })
    }

    /// Discards every edit.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyPublished`] after a successful
    /// publish.
    pub fn revert(&mut self) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.working = self.original.clone();
        self.state = SessionState::Clean;
        self.branch = None;
        Ok(())
    }

    /// Validates the working table and moves to `Valid` or `Invalid`.
    ///
    /// A clean session stays `Clean`: there is nothing to publish. A
    /// published session is left as it is.
    pub fn validate(&mut self) -> ValidationReport {
        let report = validate_edits(&self.original, &self.working, self.kind);
        match self.state {
            SessionState::Clean | SessionState::Published { .. } => {}
            _ if report.is_valid() => self.state = SessionState::Valid,
            _ => {
                self.state = SessionState::Invalid {
                    report: report.clone(),
                };
            }
        }
        report
    }

    /// What publishing now would report as changed.
    #[must_use]
    pub fn change_summary(&self) -> ChangeSummary {
        ChangeSummary::compute(&self.dataset_name, &self.original, &self.working)
    }

    /// Writes the working table to `path`. Allowed in any state and does
    /// not change it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Dataset`] if writing fails.
    pub fn save_local(&self, path: &Path) -> Result<(), SessionError> {
        self.working.write(path)?;
        log::info!("Saved {} rows to {}", self.working.len(), path.display());
        Ok(())
    }

    /// Publishes the working table as of `now`. Only a `Valid` or
    /// `PublishFailed` session can publish.
    ///
    /// On success the session becomes `Published`; on a remote failure it
    /// becomes `PublishFailed` with the cause. The working table is never
    /// modified.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::ValidationFailed`] from `Invalid`,
    /// [`PublishError::NotValidated`] from any other unpublishable state,
    /// or the failing step's error.
    pub async fn publish(
        &mut self,
        host: &dyn ChangeRequestHost,
        config: &PublishConfig,
        now: DateTime<Utc>,
    ) -> Result<String, PublishError> {
        match &self.state {
            SessionState::Valid | SessionState::PublishFailed { .. } => {}
            SessionState::Invalid { report } => {
                return Err(PublishError::ValidationFailed {
                    issues: report.issue_count(),
                });
            }
            _ => return Err(PublishError::NotValidated),
        }

        let branch = self
            .branch
            .get_or_insert_with(|| branch_name(&self.dataset_name, now))
            .clone();
        let summary = self.change_summary();
        let attempt = match self.working.to_csv_bytes() {
            Ok(content) => publish_table(host, config, &branch, &content, &summary).await,
            Err(e) => Err(e.into()),
        };

        match attempt {
            Ok(url) => {
                log::info!("Published {} as {url}", self.dataset_name);
                self.state = SessionState::Published { url: url.clone() };
                Ok(url)
            }
            Err(e) => {
                log::warn!("Publishing {} failed: {e}", self.dataset_name);
                self.state = SessionState::PublishFailed { cause: e.to_string() };
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;
    use crate::PublishStep;

    /// Records calls and fails at a chosen step.
    #[derive(Default)]
    struct FakeHost {
        fail_at: Option<PublishStep>,
        calls: Mutex<Vec<String>>,
        committed: Mutex<Option<(String, Vec<u8>)>>,
        body: Mutex<Option<String>>,
    }

    impl FakeHost {
        fn failing_at(step: PublishStep) -> Self {
            Self {
                fail_at: Some(step),
                ..Self::default()
            }
        }

        fn check(&self, step: PublishStep, call: String) -> Result<(), PublishError> {
            self.calls.lock().unwrap().push(call);
            if self.fail_at == Some(step) {
                return Err(PublishError::Remote {
                    step,
                    status: Some(500),
                    message: "boom".to_string(),
                });
            }
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChangeRequestHost for FakeHost {
        async fn create_branch(&self, branch: &str, base: &str) -> Result<BranchOutcome, PublishError> {
            self.check(PublishStep::CreateBranch, format!("branch {branch} from {base}"))?;
            Ok(BranchOutcome::Created)
        }

        async fn commit_file(
            &self,
            branch: &str,
            path: &str,
            content: &[u8],
            message: &str,
        ) -> Result<(), PublishError> {
            self.check(PublishStep::CommitFile, format!("commit {path} on {branch}: {message}"))?;
            *self.committed.lock().unwrap() = Some((path.to_string(), content.to_vec()));
            Ok(())
        }

        async fn open_change_request(
            &self,
            branch: &str,
            base: &str,
            title: &str,
            body: &str,
        ) -> Result<String, PublishError> {
            self.check(PublishStep::OpenChangeRequest, format!("pr {branch} -> {base}: {title}"))?;
            *self.body.lock().unwrap() = Some(body.to_string());
            Ok("https://example.test/pull/1".to_string())
        }
    }

    fn config() -> PublishConfig {
        PublishConfig {
            repo: "care-access/coverage-data".to_string(),
            token: "t".to_string(),
            base_branch: "main".to_string(),
            api_url: "http://localhost".to_string(),
            publish_dir: "data/final".to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap()
    }

    fn session() -> EditSession {
        let table = Table::from_reader(
            "state_fips,county_fips,geo_id,distance_band\n01,001,01001,<=150\n01,003,01003,>300\n".as_bytes(),
        )
        .unwrap();
        EditSession::new("county_coverage.csv", DatasetKind::Coverage, table)
    }

    #[test]
    fn branch_names_sort_by_time() {
        assert_eq!(
            branch_name("county_coverage.csv", now()),
            "data-update/county_coverage-20250304-050607"
        );
        assert_eq!(branch_name("gap counties.csv", now()), "data-update/gap-counties-20250304-050607");
    }

    #[test]
    fn edits_move_between_clean_and_dirty() {
        let mut session = session();
        assert_eq!(session.state(), &SessionState::Clean);

        session.set_cell(1, "distance_band", "150_300").unwrap();
        assert_eq!(session.state(), &SessionState::Dirty);

        session.set_cell(1, "distance_band", ">300").unwrap();
        assert_eq!(session.state(), &SessionState::Clean);

        session.push_row(vec!["01".into(), "005".into(), "01005".into(), "<=150".into()]).unwrap();
        assert_eq!(session.state(), &SessionState::Dirty);
        session.revert().unwrap();
        assert_eq!(session.state(), &SessionState::Clean);
        assert_eq!(session.working(), session.original());
    }

    #[test]
    fn failed_edit_leaves_table_untouched() {
        let mut session = session();
        assert!(session.set_cell(0, "no_such_column", "x").is_err());
        assert_eq!(session.state(), &SessionState::Clean);
        assert_eq!(session.working(), session.original());
    }

    #[test]
    fn invalid_then_fixed() {
        let mut session = session();
        session.set_cell(0, "state_fips", "1").unwrap();
        session.set_cell(1, "distance_band", "far away").unwrap();

        let report = session.validate();
        assert!(report.get("invalid_state_fips").is_some());
        assert!(report.get("invalid_distance_band").is_some());
        assert!(matches!(session.state(), SessionState::Invalid { .. }));

        session.set_cell(0, "state_fips", "01").unwrap();
        session.set_cell(1, "distance_band", "150-300").unwrap();
        assert_eq!(session.state(), &SessionState::Dirty);
        assert!(session.validate().is_valid());
        assert_eq!(session.state(), &SessionState::Valid);
    }

    #[test]
    fn local_save_works_in_any_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edited.csv");
        let mut session = session();
        session.set_cell(0, "state_fips", "bad").unwrap();
        session.validate();

        session.save_local(&path).unwrap();

        assert!(matches!(session.state(), SessionState::Invalid { .. }));
        assert_eq!(Table::read(&path).unwrap().get(0, "state_fips"), Some("bad"));
    }

    #[tokio::test]
    async fn publish_requires_validation() {
        let host = FakeHost::default();
        let mut session = session();
        session.set_cell(0, "distance_band", "150_300").unwrap();

        let err = session.publish(&host, &config(), now()).await.unwrap_err();
        assert!(matches!(err, PublishError::NotValidated));

        session.set_cell(0, "geo_id", "1001").unwrap();
        session.validate();
        let err = session.publish(&host, &config(), now()).await.unwrap_err();
        assert!(matches!(err, PublishError::ValidationFailed { issues: 1 }));
        assert!(host.calls().is_empty());
    }

    #[tokio::test]
    async fn publishes_branch_commit_and_change_request() {
        let host = FakeHost::default();
        let mut session = session();
        session.set_cell(0, "distance_band", "150_300").unwrap();
        session.validate();

        let url = session.publish(&host, &config(), now()).await.unwrap();

        assert_eq!(url, "https://example.test/pull/1");
        assert_eq!(
            session.state(),
            &SessionState::Published {
                url: "https://example.test/pull/1".to_string()
            }
        );
        assert_eq!(
            host.calls(),
            [
                "branch data-update/county_coverage-20250304-050607 from main",
                "commit data/final/county_coverage.csv on data-update/county_coverage-20250304-050607: \
                 chore(data): update county_coverage.csv",
                "pr data-update/county_coverage-20250304-050607 -> main: feat(data): update county_coverage.csv",
            ]
        );
        let (path, content) = host.committed.lock().unwrap().clone().unwrap();
        assert_eq!(path, "data/final/county_coverage.csv");
        assert_eq!(Table::from_reader(content.as_slice()).unwrap(), *session.working());
        let body = host.body.lock().unwrap().clone().unwrap();
        assert!(body.contains("```json"));
        assert!(body.contains("\"rows_modified\": 1"));

        assert!(matches!(
            session.set_cell(0, "geo_id", "01001"),
            Err(SessionError::AlreadyPublished { .. })
        ));
    }

    #[tokio::test]
    async fn failed_step_stops_the_sequence_and_allows_retry() {
        let failing = FakeHost::failing_at(PublishStep::CommitFile);
        let mut session = session();
        session.set_cell(1, "distance_band", "150_300").unwrap();
        session.validate();
        let before = session.working().clone();

        let err = session.publish(&failing, &config(), now()).await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert_eq!(failing.calls().len(), 2);
        assert!(matches!(session.state(), SessionState::PublishFailed { cause } if cause.contains("commit file")));
        assert_eq!(session.working(), &before);

        let working = FakeHost::default();
        let later = now() + chrono::Duration::seconds(90);
        let url = session.publish(&working, &config(), later).await.unwrap();
        assert_eq!(url, "https://example.test/pull/1");

        let first = failing.calls()[0].clone();
        let retried = working.calls()[0].clone();
        assert_eq!(first, "branch data-update/county_coverage-20250304-050607 from main");
        assert_eq!(retried, first);
        assert_eq!(session.branch(), Some("data-update/county_coverage-20250304-050607"));
    }

    #[tokio::test]
    async fn edit_after_failed_publish_starts_a_new_branch() {
        let failing = FakeHost::failing_at(PublishStep::OpenChangeRequest);
        let mut session = session();
        session.set_cell(1, "distance_band", "150_300").unwrap();
        session.validate();
        assert!(session.publish(&failing, &config(), now()).await.is_err());
        assert!(session.branch().is_some());

        session.set_cell(1, "distance_band", "<=150").unwrap();
        assert_eq!(session.branch(), None);
        session.validate();

        let host = FakeHost::default();
        let later = now() + chrono::Duration::seconds(90);
        session.publish(&host, &config(), later).await.unwrap();
        assert_eq!(host.calls()[0], "branch data-update/county_coverage-20250304-050737 from main");
    }

    #[tokio::test]
    async fn clean_session_cannot_publish() {
        let host = FakeHost::default();
        let mut session = session();
        assert!(session.validate().is_valid());
        assert_eq!(session.state(), &SessionState::Clean);
        assert!(matches!(
            session.publish(&host, &config(), now()).await,
            Err(PublishError::NotValidated)
        ));
    }
}
