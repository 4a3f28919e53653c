//! The `validate` and `publish` subcommands.

use std::path::Path;

use care_access_dataset::Table;
use care_access_publish::github::GitHubClient;
use care_access_publish::session::branch_name;
use care_access_publish::{DatasetKind, EditSession, PublishConfig, SessionState, validate_edits};
use dialoguer::Confirm;

/// File name of `path`, or the whole path if it has none.
fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.to_string_lossy(), |name| name.to_string_lossy())
        .into_owned()
}

/// `kind` if given, else the kind inferred from `dataset_name`.
fn dataset_kind(kind: Option<&str>, dataset_name: &str) -> Result<DatasetKind, String> {
    kind.map_or_else(
        || Ok(DatasetKind::infer(dataset_name)),
        |kind| {
            kind.parse::<DatasetKind>()
                .map_err(|_| format!("Unknown dataset kind: {kind} (expected coverage, county_model or centers)"))
        },
    )
}

/// Validates `edited` against `original` and prints the report.
///
/// # Errors
///
/// Returns an error if either table cannot be read, the kind is unknown,
/// or validation finds issues.
pub fn validate(original: &Path, edited: &Path, kind: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let kind = dataset_kind(kind, &file_name(original))?;
    let report = validate_edits(&Table::read(original)?, &Table::read(edited)?, kind);

    println!("{kind} table {}: {report}", edited.display());
    if report.is_valid() {
        Ok(())
    } else {
        Err(format!("Validation found {} issue(s)", report.issue_count()).into())
    }
}

/// Runs the whole edit workflow for one table: optional local save,
/// validation, change summary, confirmation, and publish.
///
/// # Errors
///
/// Returns an error if a table cannot be read or saved, validation fails,
/// publish configuration is missing, or a publish step fails.
pub async fn publish(
    original: &Path,
    edited: &Path,
    name: Option<String>,
    yes: bool,
    save: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let dataset_name = name.unwrap_or_else(|| file_name(original));
    let kind = DatasetKind::infer(&dataset_name);

    let mut session = EditSession::new(dataset_name, kind, Table::read(original)?);
    session.replace_working(Table::read(edited)?)?;

    if let Some(path) = save {
        session.save_local(path)?;
    }
    if session.state() == &SessionState::Clean {
        println!("No changes to publish.");
        return Ok(());
    }

    let report = session.validate();
    println!("Validation: {report}");
    if !report.is_valid() {
        return Err(format!("Validation found {} issue(s); nothing was published", report.issue_count()).into());
    }

    let config = PublishConfig::from_env()?;
    let summary = session.change_summary();
    println!("{}", summary.to_json_pretty()?);

    let now = chrono::Utc::now();
    let branch = branch_name(session.dataset_name(), now);
    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Open a change request on {} from {branch} into {}?",
                config.repo, config.base_branch
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Not published.");
            return Ok(());
        }
    }

    let host = GitHubClient::new(&config)?;
    let url = session.publish(&host, &config, now).await?;
    println!("Change request opened: {url}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_inferred_from_the_original_file_name() {
        assert_eq!(
            dataset_kind(None, &file_name(Path::new("data/final/centers.csv"))).unwrap(),
            DatasetKind::Centers
        );
        assert_eq!(dataset_kind(Some("county_model"), "x.csv").unwrap(), DatasetKind::CountyModel);
        assert!(dataset_kind(Some("tracts"), "x.csv").is_err());
    }

    #[test]
    fn validate_fails_on_bad_edits() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("county_coverage.csv");
        let edited = dir.path().join("edited.csv");
        std::fs::write(&original, "geo_id,distance_band\n01001,<=150\n").unwrap();
        std::fs::write(&edited, "geo_id,distance_band\n01001,somewhere\n").unwrap();

        assert!(validate(&original, &original, None).is_ok());
        assert!(validate(&original, &edited, None).is_err());
    }
}
