use std::fmt::Display;

use url::Url;

use crate::{
    relay::links::rewrite_issue_links,
    webhooks::github::{PullRequestChanges, PullRequestEvent},
};

/// A 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(u32);

impl Color {
    /// Parses a `#RRGGBB` literal. Meant for constants: a malformed literal fails the build.
    pub const fn from_hex(literal: &str) -> Self {
        let bytes = literal.as_bytes();
        assert!(
            bytes.len() == 7 && bytes[0] == b'#',
            "color literal must look like #RRGGBB"
        );

        let mut value = 0;
        let mut i = 1;
        while i < bytes.len() {
            let digit = match bytes[i] {
                b @ b'0'..=b'9' => b - b'0',
                b @ b'a'..=b'f' => b - b'a' + 10,
                b @ b'A'..=b'F' => b - b'A' + 10,
                _ => panic!("color literal must only contain hex digits"),
            };
            value = value * 16 + digit as u32;
            i += 1;
        }

        Self(value)
    }

    pub fn rgb(self) -> u32 {
        self.0
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:06X}", self.rgb())
    }
}

const GREEN: Color = Color::from_hex("#46954A");
const YELLOW: Color = Color::from_hex("#FDE047");
const PURPLE: Color = Color::from_hex("#8B5CF6");

const OPENED_THUMBNAIL: &str =
    "https://raw.githubusercontent.com/primer/octicons/main/icons/git-pull-request-24.svg";
const EDITED_THUMBNAIL: &str =
    "https://raw.githubusercontent.com/primer/octicons/main/icons/pencil-24.svg";
const CLOSED_THUMBNAIL: &str =
    "https://raw.githubusercontent.com/primer/octicons/main/icons/git-pull-request-closed-24.svg";

/// The pull request actions that get announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Opened,
    Edited,
    Closed,
}

impl MessageKind {
    pub fn color(self) -> Color {
        match self {
            Self::Opened => GREEN,
            Self::Edited => YELLOW,
            Self::Closed => PURPLE,
        }
    }

    pub fn thumbnail_url(self) -> &'static str {
        match self {
            Self::Opened => OPENED_THUMBNAIL,
            Self::Edited => EDITED_THUMBNAIL,
            Self::Closed => CLOSED_THUMBNAIL,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Edited => "edited",
            Self::Closed => "closed",
        }
    }
}

impl Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.verb())
    }
}

/// A rich chat message describing a pull request event. `body` is markdown.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationMessage {
    pub kind: MessageKind,
    pub color: Color,
    pub title: String,
    pub title_link: Url,
    pub body: String,
    pub author_name: String,
    pub author_link: Url,
    pub author_icon_url: Url,
    pub thumbnail_url: &'static str,
}

pub fn format_message(event: &PullRequestEvent, kind: MessageKind) -> NotificationMessage {
    let pr = &event.pull_request;
    let title_line = format!("[{}]({})", pr.title, pr.html_url);

    let text = match kind {
        MessageKind::Opened => format!("{}\n\n{}", title_line, pr.body()),
        MessageKind::Edited => edited_text(&title_line, pr.body(), event.changes.as_ref()),
        MessageKind::Closed => title_line,
    };

    // edited messages link to the pull request rather than to its author
    let author_link = match kind {
        MessageKind::Edited => pr.html_url.clone(),
        MessageKind::Opened | MessageKind::Closed => pr.user.html_url.clone(),
    };

    NotificationMessage {
        kind,
        color: kind.color(),
        title: pr.title.clone(),
        title_link: pr.html_url.clone(),
        body: rewrite_issue_links(&text, event.repository.html_url.as_str()),
        author_name: format!("{} has {} a pull request", pr.user.login, kind.verb()),
        author_link,
        author_icon_url: pr.user.avatar_url.clone(),
        thumbnail_url: kind.thumbnail_url(),
    }
}

fn edited_text(title_line: &str, body: &str, changes: Option<&PullRequestChanges>) -> String {
    let mut text = String::new();

    let previous_title = changes.and_then(PullRequestChanges::previous_title);
    if let Some(previous) = previous_title {
        text.push_str(&format!("~~{}~~\n", previous));
    }
    text.push_str(title_line);
    text.push_str("\n\n");

    let previous_body = changes.and_then(PullRequestChanges::previous_body);
    if let Some(previous) = previous_body {
        text.push_str(&format!("~~{}~~\n\n", previous));
    }
    text.push_str(body);

    text
}

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::json;

    use super::*;

    pub(crate) fn event(action: &str, body: Option<&str>) -> serde_json::Value {
        json!({
            "action": action,
            "pull_request": {
                "html_url": "https://github.com/gotify/server/pull/240",
                "title": "Use go:embed",
                "body": body,
                "user": {
                    "login": "jmattheis",
                    "html_url": "https://github.com/jmattheis",
                    "avatar_url": "https://avatars.githubusercontent.com/u/4038357"
                }
            },
            "repository": { "html_url": "https://github.com/gotify/server" }
        })
    }

    fn parse(value: serde_json::Value) -> PullRequestEvent {
        serde_json::from_value(value).expect("fixture should deserialize")
    }

    #[test]
    fn colors_are_parsed_from_hex() {
        assert_eq!(MessageKind::Opened.color().rgb(), 0x46954A);
        assert_eq!(MessageKind::Edited.color().rgb(), 0xFDE047);
        assert_eq!(MessageKind::Closed.color().rgb(), 0x8B5CF6);
        assert_eq!(Color::from_hex("#0a0b0c").rgb(), 0x0A0B0C);
        assert_eq!(Color::from_hex("#0a0b0c").to_string(), "#0A0B0C");
    }

    #[test]
    fn opened_message() {
        let event = parse(event("opened", Some("Fixes #237\r\nworks")));

        let message = format_message(&event, MessageKind::Opened);

        assert_eq!(message.color.rgb(), 0x46954A);
        assert_eq!(message.author_name, "jmattheis has opened a pull request");
        assert_eq!(message.author_link.as_str(), "https://github.com/jmattheis");
        assert_eq!(
            message.author_icon_url.as_str(),
            "https://avatars.githubusercontent.com/u/4038357"
        );
        assert_eq!(message.title, "Use go:embed");
        assert_eq!(
            message.title_link.as_str(),
            "https://github.com/gotify/server/pull/240"
        );
        assert_eq!(
            message.body,
            "[Use go:embed](https://github.com/gotify/server/pull/240)\n\nFixes [#237](https://github.com/gotify/server/issues/237)\r\nworks"
        );
        assert_eq!(message.thumbnail_url, OPENED_THUMBNAIL);
    }

    #[test]
    fn opened_message_without_body() {
        let event = parse(event("opened", None));

        let message = format_message(&event, MessageKind::Opened);

        assert_eq!(
            message.body,
            "[Use go:embed](https://github.com/gotify/server/pull/240)\n\n"
        );
    }

    #[test]
    fn edited_message_strikes_previous_values() {
        let mut value = event("edited", Some("closes #3"));
        value["changes"] = json!({
            "title": { "from": "Use packr" },
            "body": { "from": "fixes #2" }
        });
        let event = parse(value);

        let message = format_message(&event, MessageKind::Edited);

        assert_eq!(message.color.rgb(), 0xFDE047);
        assert_eq!(message.author_name, "jmattheis has edited a pull request");
        assert_eq!(
            message.author_link.as_str(),
            "https://github.com/gotify/server/pull/240"
        );
        assert_eq!(
            message.body,
            "~~Use packr~~\n\
             [Use go:embed](https://github.com/gotify/server/pull/240)\n\n\
             ~~fixes [#2](https://github.com/gotify/server/issues/2)~~\n\n\
             closes [#3](https://github.com/gotify/server/issues/3)"
        );
        assert_eq!(message.thumbnail_url, EDITED_THUMBNAIL);
    }

    #[test]
    fn edited_message_ignores_empty_changes() {
        let mut value = event("edited", Some("new body"));
        value["changes"] = json!({ "title": { "from": "" } });
        let event = parse(value);

        let message = format_message(&event, MessageKind::Edited);

        assert_eq!(
            message.body,
            "[Use go:embed](https://github.com/gotify/server/pull/240)\n\nnew body"
        );
    }

    #[test]
    fn closed_message_omits_body() {
        let event = parse(event("closed", Some("fixes #9")));

        let message = format_message(&event, MessageKind::Closed);

        assert_eq!(message.color.rgb(), 0x8B5CF6);
        assert_eq!(message.author_name, "jmattheis has closed a pull request");
        assert_eq!(message.author_link.as_str(), "https://github.com/jmattheis");
        assert_eq!(
            message.body,
            "[Use go:embed](https://github.com/gotify/server/pull/240)"
        );
        assert_eq!(message.thumbnail_url, CLOSED_THUMBNAIL);
    }
}
