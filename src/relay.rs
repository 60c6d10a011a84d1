//! Turns GitHub pull request webhooks into chat notifications.

pub mod dispatcher;
pub mod links;
pub mod message;

pub use dispatcher::{DispatchError, Dispatcher, NotificationSender, Outcome};
pub use message::NotificationMessage;
