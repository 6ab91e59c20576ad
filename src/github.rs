//! GitHub repository fetcher.
//!
//! Lists a repository's file tree and downloads individual file contents
//! through the GitHub REST API. All requests carry the bearer token read
//! from the environment variable named by `[github].token_env`.
//!
//! # Endpoints
//!
//! | Call | Endpoint |
//! |------|----------|
//! | [`RepoSource::fetch_tree`] | `GET /repos/{owner}/{repo}/git/trees/{branch}?recursive=1` |
//! | [`RepoSource::fetch_file_content`] | `GET /repos/{owner}/{repo}/contents/{path}?ref={ref}` |
//! | [`RepoSource::fetch_default_branch`] | `GET /repos/{owner}/{repo}` |
//! | [`RepoSource::fetch_user`] | `GET /user` |
//!
//! # Failure Mapping
//!
//! - 401 → [`SourceError::Unauthorized`]
//! - 429, or 403 with `x-ratelimit-remaining: 0`, a `retry-after` header or a
//!   "rate limit" body (secondary limits) → [`SourceError::RateLimited`]
//! - other 403 → [`SourceError::Unauthorized`]
//! - 404 → [`SourceError::NotFound`]
//! - any other non-2xx → [`SourceError::Fetch`] naming the path
//! - a contents body not returned inline (files over 1 MB) →
//!   [`SourceError::TooLarge`]
//!
//! Nothing here retries: a rate-limited run fails and is retried by the
//! caller later.
//!
//! Callers filter paths before fetching content; fetching every blob of a
//! large tree burns through the API quota.

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::config::GitHubConfig;
use crate::error::SourceError;

/// Kind of a tree entry as reported by the Git trees API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Blob,
    Tree,
    /// Submodule pointer.
    Commit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub kind: EntryKind,
}

impl TreeEntry {
    pub fn blob(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Blob,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::Blob
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Read access to a hosted repository.
#[async_trait]
pub trait RepoSource: Send + Sync {
    /// Recursively list every entry of `branch`.
    async fn fetch_tree(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Vec<TreeEntry>, SourceError>;

    /// Fetch and decode one file at `reference` (branch, tag or SHA).
    async fn fetch_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        reference: &str,
    ) -> Result<String, SourceError>;

    async fn fetch_default_branch(&self, owner: &str, repo: &str) -> Result<String, SourceError>;

    /// Identity behind the token; used to validate it when linking.
    async fn fetch_user(&self) -> Result<GitHubUser, SourceError>;
}

pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
}

impl GitHubClient {
    /// Build a client from config, reading the token from the environment.
    pub fn from_config(config: &GitHubConfig) -> anyhow::Result<Self> {
        let token = std::env::var(&config.token_env)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", config.token_env))?;
        Self::new(&config.api_url, &token, Duration::from_secs(config.timeout_secs))
    }

    pub fn new(api_url: &str, token: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("repo-indexer/", env!("CARGO_PKG_VERSION"))),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        subject: &str,
    ) -> Result<T, SourceError> {
        let response = self.client.get(url).send().await?;
        let response = check_status(response, subject).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| SourceError::InvalidResponse {
                path: subject.to_string(),
                reason: e.to_string(),
            })
    }
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<RawTreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct RawTreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Deserialize)]
struct RepoResponse {
    default_branch: String,
}

#[async_trait]
impl RepoSource for GitHubClient {
    async fn fetch_tree(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Vec<TreeEntry>, SourceError> {
        let url = format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.api_url, owner, repo, branch
        );
        let subject = format!("{}/{}@{}", owner, repo, branch);
        let tree: TreeResponse = self.get_json(&url, &subject).await?;

        if tree.truncated {
            tracing::warn!(
                repo = %subject,
                entries = tree.tree.len(),
                "GitHub truncated the recursive tree listing; indexing the returned entries only"
            );
        }

        Ok(tree
            .tree
            .into_iter()
            .filter_map(|entry| {
                let kind = match entry.kind.as_str() {
                    "blob" => EntryKind::Blob,
                    "tree" => EntryKind::Tree,
                    "commit" => EntryKind::Commit,
                    _ => return None,
                };
                Some(TreeEntry {
                    path: entry.path,
                    kind,
                })
            })
            .collect())
    }

    async fn fetch_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        reference: &str,
    ) -> Result<String, SourceError> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_url,
            owner,
            repo,
            encode_path(path)
        );
        let response = self
            .client
            .get(&url)
            .query(&[("ref", reference)])
            .send()
            .await?;
        let response = check_status(response, path).await?;
        let body: ContentResponse =
            response
                .json()
                .await
                .map_err(|e| SourceError::InvalidResponse {
                    path: path.to_string(),
                    reason: e.to_string(),
                })?;

        decode_content(path, &body.content, &body.encoding, body.size)
    }

    async fn fetch_default_branch(&self, owner: &str, repo: &str) -> Result<String, SourceError> {
        let url = format!("{}/repos/{}/{}", self.api_url, owner, repo);
        let subject = format!("{}/{}", owner, repo);
        let body: RepoResponse = self.get_json(&url, &subject).await?;
        Ok(body.default_branch)
    }

    async fn fetch_user(&self) -> Result<GitHubUser, SourceError> {
        let url = format!("{}/user", self.api_url);
        self.get_json(&url, "user").await
    }
}

/// Map a non-success response onto the [`SourceError`] taxonomy.
async fn check_status(response: Response, subject: &str) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let headers = response.headers().clone();
    // A bare 403 may still be a secondary rate limit; only its body says so.
    let body = if status == StatusCode::FORBIDDEN {
        response.text().await.unwrap_or_default()
    } else {
        String::new()
    };
    Err(status_error(status, &headers, &body, subject))
}

fn status_error(status: StatusCode, headers: &HeaderMap, body: &str, subject: &str) -> SourceError {
    let remaining = header_i64(headers, "x-ratelimit-remaining");
    let retry_after = header_i64(headers, "retry-after");
    let reset_at = header_i64(headers, "x-ratelimit-reset")
        .or_else(|| retry_after.map(|secs| chrono::Utc::now().timestamp() + secs));

    let secondary_limit = retry_after.is_some()
        || body.to_ascii_lowercase().contains("rate limit");

    match status {
        StatusCode::UNAUTHORIZED => SourceError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => SourceError::RateLimited { reset_at },
        StatusCode::FORBIDDEN if remaining == Some(0) || secondary_limit => {
            SourceError::RateLimited { reset_at }
        }
        StatusCode::FORBIDDEN => SourceError::Unauthorized,
        StatusCode::NOT_FOUND => SourceError::NotFound(subject.to_string()),
        other => SourceError::Fetch {
            path: subject.to_string(),
            status: other.as_u16(),
        },
    }
}

fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Percent-encode each path segment, keeping the `/` separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Decode a contents-API body. GitHub wraps base64 at 60 columns.
fn decode_content(
    path: &str,
    content: &str,
    encoding: &str,
    size: Option<u64>,
) -> Result<String, SourceError> {
    match encoding {
        "base64" => {
            let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(compact.as_bytes())
                .map_err(|e| SourceError::InvalidResponse {
                    path: path.to_string(),
                    reason: format!("bad base64 content: {}", e),
                })?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        // Files over 1 MB come back with encoding "none" and no inline body.
        "none" | "" if content.is_empty() => Err(SourceError::TooLarge {
            path: path.to_string(),
            size,
        }),
        _ => Ok(content.to_string()),
    }
}
