use std::fmt::Display;

use serde::Deserialize;

use crate::webhooks::github::events::{PullRequest, Repository};

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: PullRequestAction,
    pub pull_request: PullRequest,
    pub repository: Repository,
    pub changes: Option<PullRequestChanges>,
}

/// The `action` field of a pull request event. Actions the relay doesn't announce are kept
/// verbatim in [`PullRequestAction::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum PullRequestAction {
    Opened,
    Edited,
    Closed,
    Other(String),
}

impl From<String> for PullRequestAction {
    fn from(action: String) -> Self {
        match action.as_str() {
            "opened" => Self::Opened,
            "edited" => Self::Edited,
            "closed" => Self::Closed,
            _ => Self::Other(action),
        }
    }
}

impl Display for PullRequestAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Opened => write!(f, "opened"),
            Self::Edited => write!(f, "edited"),
            Self::Closed => write!(f, "closed"),
            Self::Other(action) => write!(f, "{}", action),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestChanges {
    pub title: Option<PullRequestChangesFrom>,
    pub body: Option<PullRequestChangesFrom>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestChangesFrom {
    pub from: String,
}

impl PullRequestChanges {
    /// Previous title, if it was changed to something else.
    pub fn previous_title(&self) -> Option<&str> {
        non_empty(&self.title)
    }

    /// Previous body, if it was changed to something else.
    pub fn previous_body(&self) -> Option<&str> {
        non_empty(&self.body)
    }
}

fn non_empty(change: &Option<PullRequestChangesFrom>) -> Option<&str> {
    change
        .as_ref()
        .map(|change| change.from.as_str())
        .filter(|from| !from.is_empty())
}
