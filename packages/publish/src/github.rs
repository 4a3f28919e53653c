//! GitHub REST implementation of [`ChangeRequestHost`].

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::config::PublishConfig;
use crate::host::{BranchOutcome, ChangeRequestHost};
use crate::{PublishError, PublishStep};

const USER_AGENT: &str = "care-access-coverage/0.1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const API_VERSION: &str = "2022-11-28";

#[derive(Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Deserialize)]
struct ContentEntry {
    sha: String,
}

#[derive(Deserialize)]
struct PullRequest {
    html_url: String,
}

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

/// Talks to the GitHub REST API for one repository.
pub struct GitHubClient {
    client: Client,
    api_url: String,
    repo: String,
    token: String,
}

impl GitHubClient {
    /// Creates a client for the configured repository.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &PublishConfig) -> Result<Self, PublishError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            repo: config.repo.clone(),
            token: config.token.clone(),
        })
    }

    fn request(&self, method: Method, tail: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/repos/{}/{tail}", self.api_url, self.repo))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn send(step: PublishStep, request: RequestBuilder) -> Result<Response, PublishError> {
        request.send().await.map_err(|e| PublishError::Remote {
            step,
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        })
    }

    async fn parse<T: serde::de::DeserializeOwned>(step: PublishStep, response: Response) -> Result<T, PublishError> {
        let status = response.status().as_u16();
        response.json().await.map_err(|e| PublishError::Remote {
            step,
            status: Some(status),
            message: format!("unexpected response: {e}"),
        })
    }
}

/// Turns an unsuccessful response into [`PublishError::Remote`], preferring
/// GitHub's `message` field over the raw body.
async fn remote_error(step: PublishStep, response: Response) -> PublishError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiMessage>(&body)
        .map(|m| m.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("no message").to_string()
            } else {
                body.trim().to_string()
            }
        });
    log::warn!("GitHub {step} failed with HTTP {}: {message}", status.as_u16());
    PublishError::Remote {
        step,
        status: Some(status.as_u16()),
        message,
    }
}

#[async_trait]
impl ChangeRequestHost for GitHubClient {
    async fn create_branch(&self, branch: &str, base: &str) -> Result<BranchOutcome, PublishError> {
        let step = PublishStep::CreateBranch;

        let response = Self::send(step, self.request(Method::GET, &format!("git/ref/heads/{base}"))).await?;
        if !response.status().is_success() {
            return Err(remote_error(step, response).await);
        }
        let base_ref: GitRef = Self::parse(step, response).await?;

        let response = Self::send(
            step,
            self.request(Method::POST, "git/refs").json(&json!({
                "ref": format!("refs/heads/{branch}"),
                "sha": base_ref.object.sha,
            })),
        )
        .await?;

        match response.status() {
            status if status.is_success() => {
                log::info!("Created branch {branch} from {base}");
                Ok(BranchOutcome::Created)
            }
            status if status == StatusCode::UNPROCESSABLE_ENTITY => match remote_error(step, response).await {
                PublishError::Remote { message, .. } if message.to_lowercase().contains("already exists") => {
                    log::info!("Branch {branch} already exists; reusing it");
                    Ok(BranchOutcome::AlreadyExisted)
                }
                err => Err(err),
            },
            _ => Err(remote_error(step, response).await),
        }
    }

    async fn commit_file(
        &self,
        branch: &str,
        path: &str,
        content: &[u8],
        message: &str,
    ) -> Result<(), PublishError> {
        let step = PublishStep::CommitFile;
        let tail = format!("contents/{path}");

        let response = Self::send(step, self.request(Method::GET, &tail).query(&[("ref", branch)])).await?;
        let current_sha = match response.status() {
            status if status == StatusCode::NOT_FOUND => None,
            status if status.is_success() => Some(Self::parse::<ContentEntry>(step, response).await?.sha),
            _ => return Err(remote_error(step, response).await),
        };

        let mut payload = json!({
            "message": message,
            "content": STANDARD.encode(content),
            "branch": branch,
        });
        if let Some(sha) = &current_sha {
            payload["sha"] = json!(sha);
        }

        let response = Self::send(step, self.request(Method::PUT, &tail).json(&payload)).await?;
        if !response.status().is_success() {
            return Err(remote_error(step, response).await);
        }
        log::info!(
            "{} {path} on {branch}",
            if current_sha.is_some() { "Updated" } else { "Created" }
        );
        Ok(())
    }

    async fn open_change_request(
        &self,
        branch: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<String, PublishError> {
        let step = PublishStep::OpenChangeRequest;
        let response = Self::send(
            step,
            self.request(Method::POST, "pulls").json(&json!({
                "title": title,
                "head": branch,
                "base": base,
                "body": body,
            })),
        )
        .await?;
        if !response.status().is_success() {
            return Err(remote_error(step, response).await);
        }
        let pull: PullRequest = Self::parse(step, response).await?;
        log::info!("Opened pull request {}", pull.html_url);
        Ok(pull.html_url)
    }
}
