use std::fmt::Write;

use matrix_sdk::ruma::events::room::message::MessageEventContent;
use url::Url;

use crate::relay::NotificationMessage;

const SEPARATOR: &str = "⋅";
const STRIKE: &str = "~~";

/// Schemes a link from a pull request body may point to.
const LINK_SCHEMES: &[&str] = &["http", "https", "mailto"];

enum Style {
    Bold,
    Strike,
    Span,
}

impl Style {
    fn close(&self) -> &'static str {
        match self {
            Self::Bold => "</b>",
            Self::Strike => "</del>",
            Self::Span => "</span>",
        }
    }
}

#[derive(Default)]
pub struct MessageBuilder {
    pub(crate) html: String,
    pub(crate) plain: String,
    style_stack: Vec<Style>,
    pub(crate) url: Option<Url>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Renders a notification: a colored header with the author, followed by the markdown body.
    pub fn notification(message: &NotificationMessage) -> Self {
        let mut builder = Self::new();

        builder.color(&message.color.to_string());
        builder.bold();
        builder.link(&message.author_name, &message.author_link);
        builder.close_styles();
        builder.line_break();

        builder.markdown(&message.body);
        builder.url = Some(message.title_link.clone());

        builder
    }

    pub fn build(mut self) -> MessageEventContent {
        // Append main URL to plain text message, if we have one
        if let Some(url) = self.url {
            write!(self.plain, " {} {}", SEPARATOR, url).unwrap();
        }

        MessageEventContent::text_html(self.plain, self.html)
    }

    pub fn bold(&mut self) {
        self.html.push_str("<b>");
        self.style_stack.push(Style::Bold);
    }

    pub fn strike(&mut self) {
        self.html.push_str("<del>");
        self.plain.push_str("~~");
        self.style_stack.push(Style::Strike);
    }

    pub fn color(&mut self, color: &str) {
        write!(self.html, r#"<span data-mx-color="{0}" style="color: {0}">"#, color).unwrap();
        self.style_stack.push(Style::Span);
    }

    pub fn line_break(&mut self) {
        self.plain.push('\n');
        self.html.push_str("<br>");
    }

    pub fn link(&mut self, text: &str, href: &Url) {
        // NOTE: we consider that the URL is bonus information, not needed in plain text mode to
        // understand the message
        self.plain.push_str(text);

        write!(self.html, r#"<a href="{}">"#, href).unwrap();
        push_escaped(&mut self.html, text);
        self.html.push_str("</a>");
    }

    /// Writes text containing markdown links and strikethroughs, other markup is kept as text.
    pub fn markdown(&mut self, text: &str) {
        let mut pending = 0;
        let mut i = 0;

        while i < text.len() {
            let rest = &text[i..];

            let consumed = if let Some(inner) = strikethrough(rest) {
                self.text(&text[pending..i]);
                self.strike();
                self.markdown(inner);
                self.close_last();
                Some(inner.len() + 2 * STRIKE.len())
            } else if let Some(link) = MarkdownLink::parse(rest) {
                self.text(&text[pending..i]);
                self.markdown_link(&link);
                Some(link.len)
            } else {
                None
            };

            match consumed {
                Some(len) => {
                    i += len;
                    pending = i;
                }
                None => i += rest.chars().next().map_or(1, char::len_utf8),
            }
        }

        self.text(&text[pending..]);
    }

    /// Links to unexpected schemes or unparsable URLs are written back as text.
    fn markdown_link(&mut self, link: &MarkdownLink<'_>) {
        match Url::parse(link.href) {
            Ok(href) if LINK_SCHEMES.contains(&href.scheme()) => {
                self.link(&plain_label(link.label), &href)
            }
            _ => self.text(link.source),
        }
    }

    /// Writes text, turning line endings into line breaks.
    fn text(&mut self, text: &str) {
        let mut lines = text.split('\n');
        if let Some(first) = lines.next() {
            write!(self, "{}", first.trim_end_matches('\r')).unwrap();
        }
        for line in lines {
            self.line_break();
            write!(self, "{}", line.trim_end_matches('\r')).unwrap();
        }
    }

    /// Panics if called with no style in the stack
    pub fn close_last(&mut self) {
        let style = self.style_stack.pop().expect("cannot be empty");
        if let Style::Strike = style {
            self.plain.push_str("~~");
        }
        self.html.push_str(style.close());
    }

    pub fn close_styles(&mut self) {
        while !self.style_stack.is_empty() {
            self.close_last();
        }
    }
}

/// The content of a `~~struck~~` span at the start of `text`.
fn strikethrough(text: &str) -> Option<&str> {
    let rest = text.strip_prefix(STRIKE)?;
    let end = rest.find(STRIKE)?;
    if end == 0 {
        return None;
    }
    Some(&rest[..end])
}

/// A `[label](href)` link at the start of some text. Brackets in the label and parentheses in
/// the URL must be balanced.
struct MarkdownLink<'a> {
    source: &'a str,
    label: &'a str,
    href: &'a str,
    len: usize,
}

impl<'a> MarkdownLink<'a> {
    fn parse(text: &'a str) -> Option<Self> {
        let label_end = closing_delimiter(text, '[', ']')?;
        let rest = &text[label_end + 1..];
        let href_end = closing_delimiter(rest, '(', ')')?;

        let label = &text[1..label_end];
        let href = &rest[1..href_end];
        if label.is_empty() || href.is_empty() || href.contains(char::is_whitespace) {
            return None;
        }

        let len = label_end + 1 + href_end + 1;
        Some(Self {
            source: &text[..len],
            label,
            href,
            len,
        })
    }
}

/// Byte index of the delimiter matching the `open` one `text` starts with, on the same line.
fn closing_delimiter(text: &str, open: char, close: char) -> Option<usize> {
    if !text.starts_with(open) {
        return None;
    }

    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        } else if c == '\n' {
            return None;
        }
    }

    None
}

/// Link labels can't hold links themselves: nested links are reduced to their label.
fn plain_label(label: &str) -> String {
    let mut plain = String::with_capacity(label.len());
    let mut i = 0;

    while i < label.len() {
        let rest = &label[i..];
        match MarkdownLink::parse(rest) {
            Some(link) => {
                plain.push_str(&plain_label(link.label));
                i += link.len;
            }
            None => {
                let c = rest.chars().next().expect("rest isn't empty");
                plain.push(c);
                i += c.len_utf8();
            }
        }
    }

    plain
}

fn push_escaped(html: &mut String, s: &str) {
    let mut last = 0;
    for (i, c) in s.char_indices() {
        // NOTE: escape characters that have a special meaning in HTML. Shamelessly adapted from
        // rustdoc/html/escape.rs
        let escaped = match c {
            '>' => "&gt;",
            '<' => "&lt;",
            '&' => "&amp;",
            '\'' => "&#39;",
            '"' => "&quot;",
            _ => continue,
        };

        html.push_str(&s[last..i]);
        html.push_str(escaped);
        last = i + 1;
    }

    if last < s.len() {
        html.push_str(&s[last..]);
    }
}

impl std::fmt::Write for MessageBuilder {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.plain.push_str(s);
        push_escaped(&mut self.html, s);

        Ok(())
    }
}

impl std::convert::From<MessageBuilder> for MessageEventContent {
    fn from(msg: MessageBuilder) -> Self {
        msg.build()
    }
}
