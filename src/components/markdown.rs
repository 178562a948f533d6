//! Markdown formatting for assistant messages
//!
//! Raw HTML in the source is never passed through: it is rendered as text.
//! Link and image destinations with a scheme other than http(s)/mailto are
//! replaced by `#`.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};

use super::RenderError;

const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Turns markdown text into an HTML fragment
pub trait MarkdownFormatter: Send + Sync {
    fn format(&self, source: &str) -> Result<String, RenderError>;
}

/// CommonMark formatter backed by `pulldown-cmark`
#[derive(Debug, Clone)]
pub struct CommonMarkFormatter {
    options: Options,
}

impl CommonMarkFormatter {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        Self { options }
    }
}

impl Default for CommonMarkFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownFormatter for CommonMarkFormatter {
    fn format(&self, source: &str) -> Result<String, RenderError> {
        let parser = Parser::new_ext(source, self.options).map(sanitize_event);
        let mut out = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut out, parser);
        Ok(out)
    }
}

fn sanitize_event(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::HtmlBlock) => Event::Start(Tag::Paragraph),
        Event::End(TagEnd::HtmlBlock) => Event::End(TagEnd::Paragraph),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_destination(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_destination(dest_url),
            title,
            id,
        }),
        other => other,
    }
}

fn safe_destination(dest_url: CowStr<'_>) -> CowStr<'_> {
    if is_safe_url(&dest_url) {
        dest_url
    } else {
        tracing::debug!("Neutralized link destination {}", dest_url.as_ref());
        CowStr::Borrowed("#")
    }
}

/// Relative URLs and http(s)/mailto are allowed; any other scheme is not
pub fn is_safe_url(url: &str) -> bool {
    // Browsers ignore embedded whitespace and control characters in schemes
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    match normalized.find(':') {
        None => true,
        Some(colon) => {
            let scheme = &normalized[..colon];
            if scheme.contains(['/', '?', '#']) {
                return true;
            }
            SAFE_SCHEMES.contains(&scheme)
        }
    }
}
