//! Minimal GitHub Issues client.
//!
//! Single attempt per call: the bridge is a scheduled batch job, so a failed
//! run is simply retried by its scheduler.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use ideabot_core::{errors::Error, Result};

const USER_AGENT: &str = "ideabot-issues-bridge";
const GITHUB_API_VERSION: &str = "2022-11-28";

#[derive(Clone, Debug, Deserialize)]
pub struct CreatedIssue {
    pub number: u64,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Port for the tracker so the ingest run can be exercised against fakes.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn create_issue(&self, title: &str, body: &str, labels: &[&str])
        -> Result<CreatedIssue>;
}

#[derive(Clone)]
pub struct IssuesClient {
    http: reqwest::Client,
    api_base: String,
    repo: String,
}

impl IssuesClient {
    pub fn new(token: &str, repo: &str, api_base: &str) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(USER_AGENT),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static(GITHUB_API_VERSION),
        );
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|e| Error::Config(format!("invalid github token: {e}")))?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client build");

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo: repo.to_string(),
        })
    }
}

#[async_trait]
impl IssueTracker for IssuesClient {
    async fn create_issue(
        &self,
        title: &str,
        body: &str,
        labels: &[&str],
    ) -> Result<CreatedIssue> {
        let url = format!("{}/repos/{}/issues", self.api_base, self.repo);
        let payload = json!({ "title": title, "body": body, "labels": labels });

        let resp = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::External(format!("github request error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::External(format!(
                "github create issue failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        resp.json::<CreatedIssue>()
            .await
            .map_err(|e| Error::External(format!("github json error: {e}")))
    }
}
