use serde::Deserialize;
use url::Url;

mod pull_request;

pub use pull_request::*;

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub html_url: Url,
    pub avatar_url: Url,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub html_url: Url,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub html_url: Url,
    pub title: String,
    pub user: GitHubUser,
    // GitHub sends `null` for an empty description
    pub body: Option<String>,
}

impl PullRequest {
    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }
}
