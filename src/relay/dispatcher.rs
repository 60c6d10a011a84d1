use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, trace};

use crate::{
    relay::message::{format_message, MessageKind, NotificationMessage},
    webhooks::github::{PullRequestAction, PullRequestEvent},
};

/// Delivers a [`NotificationMessage`] to the chat room.
#[rocket::async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, message: &NotificationMessage) -> anyhow::Result<()>;
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A notification was delivered.
    Sent(MessageKind),
    /// The action isn't announced, nothing was sent.
    Ignored(String),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("couldn't decode pull request event: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("couldn't deliver {kind} pull request message: {source:#}")]
    Delivery {
        kind: MessageKind,
        #[source]
        source: anyhow::Error,
    },
}

/// Formats pull request events and hands them to a [`NotificationSender`].
pub struct Dispatcher {
    sender: Arc<dyn NotificationSender>,
}

impl Dispatcher {
    pub fn new(sender: Arc<dyn NotificationSender>) -> Self {
        Self { sender }
    }

    /// Decodes a raw webhook payload and dispatches it.
    pub async fn dispatch(&self, payload: &str) -> Result<Outcome, DispatchError> {
        let event: PullRequestEvent = serde_json::from_str(payload)?;
        self.dispatch_event(event).await
    }

    pub async fn dispatch_event(&self, event: PullRequestEvent) -> Result<Outcome, DispatchError> {
        let kind = match event.action {
            PullRequestAction::Opened => MessageKind::Opened,
            PullRequestAction::Edited => MessageKind::Edited,
            PullRequestAction::Closed => MessageKind::Closed,
            PullRequestAction::Other(action) => {
                debug!("pull request action `{}` isn't announced", action);
                return Ok(Outcome::Ignored(action));
            }
        };

        let message = format_message(&event, kind);
        trace!("sending {} pull request message: {:?}", kind, message);

        self.sender
            .send(&message)
            .await
            .map_err(|source| DispatchError::Delivery { kind, source })?;

        info!(
            "sent {} pull request message for `{}` ({})",
            kind, message.title, message.title_link
        );
        Ok(Outcome::Sent(kind))
    }
}
