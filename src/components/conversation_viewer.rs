//! Turns the message list into a self-contained HTML document
//!
//! Output depends only on the messages and the theme flag, so rendering the
//! same conversation twice yields identical bytes.

use std::any::Any;
use std::fmt::Write as _;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::config::ConversationPalette;
use crate::llm::{ChatMessage, Role};
use crate::util::{escape_html, strip_ansi};

use super::markdown::{CommonMarkFormatter, MarkdownFormatter};
use super::math::{extract_math, substitute_math, MathRenderer, TexMarkupRenderer};
use super::RenderError;

const KATEX_CDN: &str = "https://cdn.jsdelivr.net/npm/katex@0.16.11/dist";

/// Typesets the math elements only, so TeX-like user text stays literal
const TYPESET_SCRIPT: &str = r#"<script>if(window.renderMathInElement){document.querySelectorAll(".math-inline,.math-display").forEach(function(el){try{renderMathInElement(el,{delimiters:[{left:"\\[",right:"\\]",display:true},{left:"\\(",right:"\\)",display:false}],throwOnError:false});}catch(e){}});}</script>
"#;

/// How a row body was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFormat {
    /// User text, escaped and never interpreted
    Literal,
    Markdown,
    /// Assistant text shown escaped because formatting was unavailable or failed
    PlainFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    pub id: String,
    pub role: Role,
    pub class: &'static str,
    pub body: String,
    pub format: RowFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedConversation {
    pub document: String,
    pub rows: Vec<RenderedRow>,
    /// Element id of the newest row, scrolled into view on load
    pub scroll_anchor: Option<String>,
}

#[derive(Clone)]
pub struct ConversationRenderer {
    markdown: Option<Arc<dyn MarkdownFormatter>>,
    math: Option<Arc<dyn MathRenderer>>,
}

impl Default for ConversationRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConversationRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationRenderer")
            .field("markdown", &self.markdown.is_some())
            .field("math", &self.math.is_some())
            .finish()
    }
}

impl ConversationRenderer {
    /// Renderer with the built-in markdown and math collaborators
    pub fn new() -> Self {
        Self {
            markdown: Some(Arc::new(CommonMarkFormatter::new())),
            math: Some(Arc::new(TexMarkupRenderer)),
        }
    }

    pub fn with_markdown(mut self, markdown: Option<Arc<dyn MarkdownFormatter>>) -> Self {
        self.markdown = markdown;
        self
    }

    pub fn with_math(mut self, math: Option<Arc<dyn MathRenderer>>) -> Self {
        self.math = math;
        self
    }

    pub fn render(&self, messages: &[ChatMessage], is_dark: bool) -> RenderedConversation {
        let rows: Vec<RenderedRow> = messages
            .iter()
            .enumerate()
            .map(|(index, message)| self.render_row(index, message))
            .collect();
        let scroll_anchor = rows.last().map(|row| row.id.clone());
        let document = build_document(&rows, scroll_anchor.as_deref(), is_dark);

        RenderedConversation {
            document,
            rows,
            scroll_anchor,
        }
    }

    fn render_row(&self, index: usize, message: &ChatMessage) -> RenderedRow {
        let (class, body, format) = match message.role() {
            Role::User => ("row user", escape_html(message.content()), RowFormat::Literal),
            Role::Assistant => {
                // Model output occasionally carries terminal escapes
                let text = strip_ansi(message.content());
                match self.format_assistant(&text) {
                    Ok(html) => ("row assistant", html, RowFormat::Markdown),
                    Err(e) => {
                        tracing::warn!("Showing message {} as plain text: {}", index, e);
                        ("row assistant", escape_html(&text), RowFormat::PlainFallback)
                    }
                }
            }
        };

        RenderedRow {
            id: format!("msg-{}", index),
            role: message.role(),
            class,
            body,
            format,
        }
    }

    fn format_assistant(&self, text: &str) -> Result<String, RenderError> {
        let Some(formatter) = &self.markdown else {
            return Err(RenderError::Markdown("no formatter configured".to_string()));
        };

        let extracted = extract_math(text);
        let html = panic::catch_unwind(AssertUnwindSafe(|| formatter.format(&extracted.text)))
            .map_err(|payload| RenderError::Panicked(panic_message(payload.as_ref())))??;

        Ok(substitute_math(&html, &extracted.spans, self.math.as_deref()))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl RowFormat {
    fn as_str(self) -> &'static str {
        match self {
            RowFormat::Literal => "literal",
            RowFormat::Markdown => "markdown",
            RowFormat::PlainFallback => "plain",
        }
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "You",
        Role::Assistant => "Assistant",
    }
}

fn stylesheet(palette: &ConversationPalette) -> String {
    format!(
        "body{{margin:0;padding:12px;background:{bg};color:{fg};\
font-family:system-ui,-apple-system,\"Segoe UI\",sans-serif;font-size:14px;line-height:1.5}}\
.row{{margin:0 0 10px 0;padding:8px 12px;border-radius:8px;overflow-wrap:anywhere}}\
.row.user{{background:{user}}}\
.row.assistant{{background:{assistant}}}\
.body[data-format=literal],.body[data-format=plain]{{white-space:pre-wrap}}\
.role{{font-size:12px;font-weight:600;opacity:0.7;margin-bottom:4px}}\
pre{{background:{code_bg};color:{code_fg};padding:8px;border-radius:6px;overflow-x:auto}}\
code{{font-family:ui-monospace,Menlo,Consolas,monospace}}\
a{{color:{link}}}\
table{{border-collapse:collapse}}th,td{{border:1px solid currentColor;padding:2px 6px}}\
.math-display{{display:block;text-align:center;margin:8px 0}}\
.empty{{opacity:0.6}}",
        bg = palette.background.css(),
        fg = palette.foreground.css(),
        user = palette.user_row.css(),
        assistant = palette.assistant_row.css(),
        code_bg = palette.code_background.css(),
        code_fg = palette.code_foreground.css(),
        link = palette.link.css(),
    )
}

fn build_document(rows: &[RenderedRow], scroll_anchor: Option<&str>, is_dark: bool) -> String {
    let palette = ConversationPalette::for_theme(is_dark);
    let theme = if is_dark { "dark" } else { "light" };

    let mut doc = String::new();
    doc.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    doc.push_str("<title>Conversation</title>\n");
    let _ = writeln!(doc, "<link rel=\"stylesheet\" href=\"{}/katex.min.css\">", KATEX_CDN);
    let _ = writeln!(doc, "<style>{}</style>", stylesheet(&palette));
    doc.push_str("</head>\n");
    let _ = writeln!(doc, "<body class=\"{}\">", theme);
    doc.push_str("<div id=\"conversation\">\n");

    if rows.is_empty() {
        doc.push_str("<p class=\"empty\">Ask a question about this document.</p>\n");
    }
    for row in rows {
        let _ = writeln!(
            doc,
            "<div class=\"{}\" id=\"{}\"><div class=\"role\">{}</div><div class=\"body\" data-format=\"{}\">{}</div></div>",
            row.class,
            row.id,
            role_label(row.role),
            row.format.as_str(),
            row.body
        );
    }
    doc.push_str("</div>\n");

    let _ = writeln!(doc, "<script src=\"{}/katex.min.js\"></script>", KATEX_CDN);
    let _ = writeln!(doc, "<script src=\"{}/contrib/auto-render.min.js\"></script>", KATEX_CDN);
    doc.push_str(TYPESET_SCRIPT);

    if let Some(anchor) = scroll_anchor {
        let _ = writeln!(
            doc,
            "<script>var last=document.getElementById(\"{}\");if(last){{last.scrollIntoView();}}</script>",
            anchor
        );
    }
    doc.push_str("</body>\n</html>\n");
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Failing;

    impl MarkdownFormatter for Failing {
        fn format(&self, _source: &str) -> Result<String, RenderError> {
            Err(RenderError::Markdown("broken".to_string()))
        }
    }

    struct Panicking;

    impl MarkdownFormatter for Panicking {
        fn format(&self, _source: &str) -> Result<String, RenderError> {
            panic!("formatter exploded")
        }
    }

    fn conversation() -> Vec<ChatMessage> {
        vec![
            ChatMessage::user("What is **this** <b>about</b>?"),
            ChatMessage::assistant("It is about **attention**.\n\nEuler: $e^{i\\pi}+1=0$"),
            ChatMessage::user("Thanks"),
        ]
    }

    #[test]
    fn test_render_is_idempotent() {
        let renderer = ConversationRenderer::new();
        let messages = conversation();
        assert_eq!(renderer.render(&messages, false), renderer.render(&messages, false));
        assert_eq!(renderer.render(&messages, true), renderer.render(&messages, true));
    }

    #[test]
    fn test_rows_in_order_with_role_classes() {
        let rendered = ConversationRenderer::new().render(&conversation(), false);
        let classes: Vec<&str> = rendered.rows.iter().map(|r| r.class).collect();
        assert_eq!(classes, vec!["row user", "row assistant", "row user"]);

        let first = rendered.document.find("id=\"msg-0\"").unwrap();
        let second = rendered.document.find("id=\"msg-1\"").unwrap();
        let third = rendered.document.find("id=\"msg-2\"").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn test_scroll_anchor_is_newest_row() {
        let rendered = ConversationRenderer::new().render(&conversation(), false);
        assert_eq!(rendered.scroll_anchor.as_deref(), Some("msg-2"));
        assert!(rendered.document.contains("getElementById(\"msg-2\")"));
    }

    #[test]
    fn test_empty_conversation() {
        let rendered = ConversationRenderer::new().render(&[], false);
        assert!(rendered.rows.is_empty());
        assert!(rendered.scroll_anchor.is_none());
        assert!(!rendered.document.contains("getElementById"));
        assert!(rendered.document.contains("class=\"empty\""));
    }

    #[test]
    fn test_user_text_is_literal() {
        let rendered = ConversationRenderer::new().render(&conversation(), false);
        let user = &rendered.rows[0];
        assert_eq!(user.format, RowFormat::Literal);
        assert_eq!(user.body, "What is **this** &lt;b&gt;about&lt;/b&gt;?");
        assert!(!rendered.document.contains("<b>about"));
    }

    #[test]
    fn test_assistant_markdown_and_math() {
        let rendered = ConversationRenderer::new().render(&conversation(), false);
        let assistant = &rendered.rows[1];
        assert_eq!(assistant.format, RowFormat::Markdown);
        assert!(assistant.body.contains("<strong>attention</strong>"));
        assert!(assistant
            .body
            .contains("<span class=math-inline>\\(e^{i\\pi}+1=0\\)</span>"));
    }

    #[test]
    fn test_math_in_code_is_left_alone() {
        let messages = vec![ChatMessage::assistant("Use `$x$` literally")];
        let rendered = ConversationRenderer::new().render(&messages, false);
        assert!(rendered.rows[0].body.contains("<code>$x$</code>"));
    }

    #[test]
    fn test_indented_code_keeps_dollars() {
        let messages = vec![ChatMessage::assistant("Shell:\n\n    echo $HOME$x$\n")];
        let body = &ConversationRenderer::new().render(&messages, false).rows[0].body;
        assert!(body.contains("<pre><code>echo $HOME$x$\n</code></pre>"));
        assert!(!body.contains("math-inline"));
    }

    #[test]
    fn test_malformed_math_shows_source() {
        let messages = vec![ChatMessage::assistant("Half is $\\frac{1}{2$ here")];
        let rendered = ConversationRenderer::new().render(&messages, false);
        let row = &rendered.rows[0];
        assert_eq!(row.format, RowFormat::Markdown);
        assert!(row.body.contains("$\\frac{1}{2$"));
        assert!(!row.body.contains("math-inline"));
    }

    #[test]
    fn test_formatter_error_falls_back_to_plain_text() {
        let renderer = ConversationRenderer::new().with_markdown(Some(Arc::new(Failing)));
        let messages = vec![ChatMessage::assistant("**bold** <i>x</i>")];
        let row = &renderer.render(&messages, false).rows[0];
        assert_eq!(row.format, RowFormat::PlainFallback);
        assert_eq!(row.class, "row assistant");
        assert_eq!(row.body, "**bold** &lt;i&gt;x&lt;/i&gt;");
    }

    #[test]
    fn test_fallback_marked_on_body_not_row_class() {
        let renderer = ConversationRenderer::new().with_markdown(Some(Arc::new(Failing)));
        let messages = vec![ChatMessage::assistant("plain")];
        let document = renderer.render(&messages, false).document;
        assert!(document.contains(
            "<div class=\"row assistant\" id=\"msg-0\"><div class=\"role\">Assistant</div><div class=\"body\" data-format=\"plain\">plain</div></div>"
        ));
    }

    #[test]
    fn test_document_loads_math_typesetter() {
        let document = ConversationRenderer::new().render(&conversation(), false).document;
        assert!(document.contains("katex@0.16.11/dist/katex.min.css"));
        assert!(document.contains("katex@0.16.11/dist/katex.min.js"));
        assert!(document.contains("katex@0.16.11/dist/contrib/auto-render.min.js"));
        assert!(document.contains("querySelectorAll(\".math-inline,.math-display\")"));

        // Typesetting runs before the scroll to the newest row
        let typeset = document.find("renderMathInElement(el").unwrap();
        let scroll = document.find("scrollIntoView").unwrap();
        let katex = document.find("katex.min.js").unwrap();
        assert!(katex < typeset && typeset < scroll);
    }

    #[test]
    fn test_formatter_panic_falls_back_to_plain_text() {
        let renderer = ConversationRenderer::new().with_markdown(Some(Arc::new(Panicking)));
        let messages = vec![ChatMessage::user("q"), ChatMessage::assistant("**a**")];
        let rendered = renderer.render(&messages, false);
        assert_eq!(rendered.rows.len(), 2);
        assert_eq!(rendered.rows[1].format, RowFormat::PlainFallback);
        assert_eq!(rendered.rows[1].body, "**a**");
    }

    #[test]
    fn test_missing_formatter_falls_back_to_plain_text() {
        let renderer = ConversationRenderer::new().with_markdown(None);
        let messages = vec![ChatMessage::assistant("# Title")];
        let row = &renderer.render(&messages, false).rows[0];
        assert_eq!(row.format, RowFormat::PlainFallback);
        assert_eq!(row.body, "# Title");
    }

    #[test]
    fn test_missing_math_renderer_shows_source() {
        let renderer = ConversationRenderer::new().with_math(None);
        let messages = vec![ChatMessage::assistant("Area $a<b$")];
        let row = &renderer.render(&messages, false).rows[0];
        assert!(row.body.contains("$a&lt;b$"));
    }

    #[test]
    fn test_theme_palette_applied() {
        let messages = conversation();
        let light = ConversationRenderer::new().render(&messages, false).document;
        let dark = ConversationRenderer::new().render(&messages, true).document;
        assert!(light.contains("background:#ffffff"));
        assert!(light.contains("<body class=\"light\">"));
        assert!(dark.contains("background:#121212"));
        assert!(dark.contains("<body class=\"dark\">"));
    }

    #[test]
    fn test_ansi_escapes_stripped_from_assistant_text() {
        let messages = vec![ChatMessage::assistant("\x1b[31mred\x1b[0m")];
        let rendered = ConversationRenderer::new().render(&messages, false);
        assert_eq!(rendered.rows[0].body, "<p>red</p>\n");
    }

    #[test]
    fn test_user_text_keeps_every_character() {
        let messages = vec![ChatMessage::user("tab\there \x07bell")];
        let rendered = ConversationRenderer::new().render(&messages, false);
        assert_eq!(rendered.rows[0].body, "tab\there \x07bell");
    }
}
