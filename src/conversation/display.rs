//! Display projection of the conversation log
//!
//! Decides which stored messages are shown and how: instruction messages are
//! hidden, replies go through Markdown, user text is shown verbatim.

use pulldown_cmark::{html, Event, Options, Parser};
use serde::Serialize;

use super::{ConversationHistory, Message, Role};

/// Markdown-to-HTML capability used for assistant replies
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> String;
}

/// CommonMark renderer backed by pulldown-cmark
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonMarkRenderer;

impl MarkdownRenderer for CommonMarkRenderer {
    fn render(&self, markdown: &str) -> String {
        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
        // Raw HTML in a reply is shown as text, never injected.
        let parser = Parser::new_ext(markdown, options).map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            other => other,
        });

        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

/// One entry of the chat view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedMessage {
    pub sender: &'static str,
    pub class: &'static str,
    pub text: String,
    pub html: String,
}

const USER_SENDER: &str = "You";
const BOT_SENDER: &str = "Chatbot";
const USER_CLASS: &str = "user-message";
const BOT_CLASS: &str = "bot-message";

pub struct DisplayProjection<R = CommonMarkRenderer> {
    instruction: String,
    renderer: R,
}

impl DisplayProjection<CommonMarkRenderer> {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self::with_renderer(instruction, CommonMarkRenderer)
    }
}

impl<R: MarkdownRenderer> DisplayProjection<R> {
    pub fn with_renderer(instruction: impl Into<String>, renderer: R) -> Self {
        Self {
            instruction: instruction.into(),
            renderer,
        }
    }

    /// Whether `text` is an instruction message (exact, case-sensitive prefix)
    pub fn is_suppressed(&self, text: &str) -> bool {
        !self.instruction.is_empty() && text.starts_with(&self.instruction)
    }

    pub fn render_message(&self, message: &Message) -> Option<RenderedMessage> {
        if self.is_suppressed(&message.text) {
            return None;
        }

        let rendered = match message.role {
            Role::User => RenderedMessage {
                sender: USER_SENDER,
                class: USER_CLASS,
                text: message.text.clone(),
                html: format!("{}: {}", USER_SENDER, escape_html(&message.text)),
            },
            Role::Assistant => RenderedMessage {
                sender: BOT_SENDER,
                class: BOT_CLASS,
                text: message.text.clone(),
                html: self.renderer.render(&message.text),
            },
        };
        Some(rendered)
    }

    /// Replay the whole history, in stored order
    pub fn render_history(&self, history: &ConversationHistory) -> Vec<RenderedMessage> {
        history.iter().filter_map(|m| self.render_message(m)).collect()
    }

    /// A bot-side notice that never enters history, such as a failed turn
    pub fn render_notice(&self, text: &str) -> RenderedMessage {
        RenderedMessage {
            sender: BOT_SENDER,
            class: BOT_CLASS,
            text: text.to_string(),
            html: format!("{}: {}", BOT_SENDER, escape_html(text)),
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTRUCTION: &str = "You are an AI chatbot assistant. Your job is to be helpful.";

    fn projection() -> DisplayProjection {
        DisplayProjection::new(INSTRUCTION)
    }

    #[test]
    fn test_user_markdown_stays_literal() {
        let rendered = projection().render_message(&Message::user("**bold**")).unwrap();
        assert_eq!(rendered.html, "You: **bold**");
        assert_eq!(rendered.class, "user-message");
        assert!(!rendered.html.contains("<strong>"));
    }

    #[test]
    fn test_assistant_markdown_is_rendered() {
        let rendered = projection().render_message(&Message::assistant("**bold**")).unwrap();
        assert_eq!(rendered.html.trim(), "<p><strong>bold</strong></p>");
        assert_eq!(rendered.sender, "Chatbot");
        assert_eq!(rendered.text, "**bold**");
    }

    #[test]
    fn test_user_html_is_escaped() {
        let rendered = projection()
            .render_message(&Message::user("<script>alert('x')</script>"))
            .unwrap();
        assert_eq!(
            rendered.html,
            "You: &lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_assistant_raw_html_is_escaped() {
        let p = projection();

        let block = p
            .render_message(&Message::assistant("<script>alert('x')</script>"))
            .unwrap();
        assert!(!block.html.contains("<script>"));
        assert!(block.html.contains("&lt;script&gt;"));

        let inline = p
            .render_message(&Message::assistant("see <img src=x onerror=alert(1)> **here**"))
            .unwrap();
        assert!(!inline.html.contains("<img"));
        assert!(inline.html.contains("&lt;img src=x onerror=alert(1)&gt;"));
        assert!(inline.html.contains("<strong>here</strong>"));
    }

    #[test]
    fn test_instruction_prefix_is_suppressed() {
        let p = projection();
        assert!(p.render_message(&Message::user(INSTRUCTION)).is_none());
        assert!(p
            .render_message(&Message::user(format!("{} Extra context.", INSTRUCTION)))
            .is_none());
        assert!(p.render_message(&Message::assistant(INSTRUCTION)).is_none());
    }

    #[test]
    fn test_suppression_is_exact_prefix() {
        let p = projection();
        assert!(p.render_message(&Message::user(INSTRUCTION.to_uppercase())).is_some());
        assert!(p.render_message(&Message::user(format!(" {}", INSTRUCTION))).is_some());
        assert!(p.render_message(&Message::user("You are an AI")).is_some());
    }

    #[test]
    fn test_empty_instruction_hides_nothing() {
        let p = DisplayProjection::new("");
        assert!(p.render_message(&Message::user("anything")).is_some());
    }

    #[test]
    fn test_render_history_replays_in_order() {
        let history: ConversationHistory = vec![
            Message::user(INSTRUCTION),
            Message::user("hello"),
            Message::assistant("*hi*"),
            Message::user(INSTRUCTION),
            Message::user("bye"),
        ]
        .into_iter()
        .collect();

        let rendered = projection().render_history(&history);
        let texts: Vec<_> = rendered.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["hello", "*hi*", "bye"]);
        assert_eq!(rendered[1].html.trim(), "<p><em>hi</em></p>");
    }

    #[test]
    fn test_custom_renderer() {
        struct Shouty;
        impl MarkdownRenderer for Shouty {
            fn render(&self, markdown: &str) -> String {
                markdown.to_uppercase()
            }
        }

        let p = DisplayProjection::with_renderer(INSTRUCTION, Shouty);
        let rendered = p.render_message(&Message::assistant("quiet")).unwrap();
        assert_eq!(rendered.html, "QUIET");
    }

    #[test]
    fn test_notice_is_plain_text() {
        let notice = projection().render_notice("Error: **quota** exceeded");
        assert_eq!(notice.text, "Error: **quota** exceeded");
        assert_eq!(notice.html, "Chatbot: Error: **quota** exceeded");
        assert_eq!(notice.class, "bot-message");
    }
}
