//! Math extraction and rendering for assistant messages
//!
//! Math is pulled out of the source before markdown runs, so markdown never
//! sees (and mangles) TeX. Each expression is replaced by a placeholder made
//! of private-use characters; after formatting, placeholders are swapped for
//! the rendered math. Code spans and fenced code blocks are copied verbatim.

use crate::util::escape_html;

use super::RenderError;

const PLACEHOLDER_OPEN: char = '\u{E000}';
const PLACEHOLDER_CLOSE: char = '\u{E001}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathMode {
    Inline,
    Display,
}

/// Renders a single TeX expression to markup
pub trait MathRenderer: Send + Sync {
    fn render(&self, tex: &str, mode: MathMode) -> Result<String, RenderError>;
}

/// Emits TeX wrapped in `math` elements for client-side typesetting.
///
/// The TeX is escaped and keeps `\(..\)` / `\[..\]` delimiters. Attribute
/// values are unquoted so the markup carries no quote characters.
#[derive(Debug, Clone, Default)]
pub struct TexMarkupRenderer;

impl MathRenderer for TexMarkupRenderer {
    fn render(&self, tex: &str, mode: MathMode) -> Result<String, RenderError> {
        let tex = tex.trim();
        if tex.is_empty() {
            return Err(RenderError::Math("empty expression".to_string()));
        }
        check_braces(tex)?;

        let escaped = escape_html(tex);
        Ok(match mode {
            MathMode::Inline => format!("<span class=math-inline>\\({}\\)</span>", escaped),
            MathMode::Display => format!("<span class=math-display>\\[{}\\]</span>", escaped),
        })
    }
}

fn check_braces(tex: &str) -> Result<(), RenderError> {
    let mut depth: i32 = 0;
    let mut escaped = false;
    for c in tex.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(RenderError::Math(format!("unbalanced '}}' in {}", tex)));
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(RenderError::Math(format!("unclosed '{{' in {}", tex)));
    }
    Ok(())
}

/// One math expression found in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathSpan {
    /// Original text including delimiters
    pub raw: String,
    pub tex: String,
    pub mode: MathMode,
}

/// Source with math replaced by placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMath {
    pub text: String,
    pub spans: Vec<MathSpan>,
}

fn placeholder(index: usize) -> String {
    format!("{}{}{}", PLACEHOLDER_OPEN, index, PLACEHOLDER_CLOSE)
}

/// Replace every math expression with a placeholder.
///
/// Delimiters: `$$..$$` and `\[..\]` for display math, `$..$` and `\(..\)`
/// for inline math. An inline `$` must hug its content (`$x$`, not `$ x $`),
/// stay on one line and not be followed by a digit, so prices like
/// "$5 and $10" are left alone.
pub fn extract_math(source: &str) -> ExtractedMath {
    // Stray marker characters in the source would be read back as placeholders
    let source = source.replace([PLACEHOLDER_OPEN, PLACEHOLDER_CLOSE], "");
    let mut text = String::with_capacity(source.len());
    let mut spans = Vec::new();
    // Display math may cross lines, so scanning runs on whole blocks between fences
    let mut block = String::new();
    let mut in_fence: Option<String> = None;
    // Indented code can only start after a blank line (or at the top), never inside a paragraph
    let mut after_blank = true;
    let mut in_indented_code = false;

    for line in source.split_inclusive('\n') {
        if let Some(fence) = &in_fence {
            if line.trim_start().starts_with(fence.as_str()) {
                in_fence = None;
            }
            text.push_str(line);
            continue;
        }
        if let Some(fence) = fence_marker(line) {
            scan_block(&block, &mut text, &mut spans);
            block.clear();
            in_fence = Some(fence);
            in_indented_code = false;
            after_blank = false;
            text.push_str(line);
            continue;
        }

        let blank = line.trim().is_empty();
        if !blank && is_indented_code(line) && (after_blank || in_indented_code) {
            scan_block(&block, &mut text, &mut spans);
            block.clear();
            in_indented_code = true;
            after_blank = false;
            text.push_str(line);
            continue;
        }
        if !blank {
            in_indented_code = false;
        }
        after_blank = blank;
        block.push_str(line);
    }
    scan_block(&block, &mut text, &mut spans);

    ExtractedMath { text, spans }
}

/// Opening fence of a fenced code block (``` or ~~~, up to three spaces of indent)
fn fence_marker(line: &str) -> Option<String> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    for fence_char in ['`', '~'] {
        let run = rest.chars().take_while(|c| *c == fence_char).count();
        if run >= 3 {
            return Some(fence_char.to_string().repeat(run));
        }
    }
    None
}

/// Four columns of leading whitespace, counting a tab as reaching the next tab stop
fn is_indented_code(line: &str) -> bool {
    let mut column = 0;
    for c in line.chars() {
        match c {
            ' ' => column += 1,
            '\t' => column += 4 - column % 4,
            _ => break,
        }
        if column >= 4 {
            return true;
        }
    }
    false
}

fn scan_block(block: &str, out: &mut String, spans: &mut Vec<MathSpan>) {
    let bytes = block.as_bytes();
    let mut i = 0;

    while i < block.len() {
        let rest = &block[i..];

        // Inline code: copy through the matching backtick run
        if bytes[i] == b'`' {
            let run = rest.bytes().take_while(|b| *b == b'`').count();
            let ticks = &rest[..run];
            if let Some(end) = find_closing_ticks(&rest[run..], run) {
                let total = run + end + run;
                out.push_str(&rest[..total]);
                i += total;
            } else {
                out.push_str(ticks);
                i += run;
            }
            continue;
        }

        if rest.starts_with("\\$") {
            out.push_str("\\$");
            i += 2;
            continue;
        }

        if let Some((consumed, span)) = match_math(rest) {
            out.push_str(&placeholder(spans.len()));
            spans.push(span);
            i += consumed;
            continue;
        }

        if rest.starts_with('\\') && rest.len() > 1 {
            // Keep other escapes intact (e.g. `\\`, `\*`)
            let next_len = rest[1..].chars().next().map_or(0, char::len_utf8);
            out.push_str(&rest[..1 + next_len]);
            i += 1 + next_len;
            continue;
        }

        let c_len = rest.chars().next().map_or(1, char::len_utf8);
        out.push_str(&rest[..c_len]);
        i += c_len;
    }
}

fn find_closing_ticks(text: &str, run: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let len = bytes[i..].iter().take_while(|b| **b == b'`').count();
            if len == run {
                return Some(i);
            }
            i += len;
        } else {
            i += 1;
        }
    }
    None
}

/// Try to match a math expression at the start of `rest`
fn match_math(rest: &str) -> Option<(usize, MathSpan)> {
    let delimited = |open: &str, close: &str, mode: MathMode| -> Option<(usize, MathSpan)> {
        let body = rest.strip_prefix(open)?;
        let end = body.find(close)?;
        let tex = &body[..end];
        if tex.trim().is_empty() {
            return None;
        }
        let consumed = open.len() + end + close.len();
        Some((
            consumed,
            MathSpan {
                raw: rest[..consumed].to_string(),
                tex: tex.trim().to_string(),
                mode,
            },
        ))
    };

    if rest.starts_with("$$") {
        return delimited("$$", "$$", MathMode::Display);
    }
    if rest.starts_with("\\[") {
        return delimited("\\[", "\\]", MathMode::Display);
    }
    if rest.starts_with("\\(") {
        return delimited("\\(", "\\)", MathMode::Inline);
    }
    if rest.starts_with('$') {
        return match_inline_dollar(rest);
    }
    None
}

fn match_inline_dollar(rest: &str) -> Option<(usize, MathSpan)> {
    let body = &rest[1..];
    let first = body.chars().next()?;
    if first.is_whitespace() || first == '$' {
        return None;
    }

    let mut escaped = false;
    for (idx, c) in body.char_indices() {
        if c == '\n' {
            return None;
        }
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '$' => {
                let tex = &body[..idx];
                let before_close = tex.chars().last()?;
                let after_close = body[idx + 1..].chars().next();
                if before_close.is_whitespace() || after_close.is_some_and(|a| a.is_ascii_digit()) {
                    return None;
                }
                let consumed = 1 + idx + 1;
                return Some((
                    consumed,
                    MathSpan {
                        raw: rest[..consumed].to_string(),
                        tex: tex.to_string(),
                        mode: MathMode::Inline,
                    },
                ));
            }
            _ => {}
        }
    }
    None
}

/// Swap placeholders in formatted markup for rendered math.
///
/// A placeholder that landed inside a tag (e.g. a link destination) or whose
/// expression fails to render is replaced by its escaped source instead.
pub fn substitute_math(html: &str, spans: &[MathSpan], renderer: Option<&dyn MathRenderer>) -> String {
    if spans.is_empty() {
        return html.to_string();
    }

    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut chars = html.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match c {
            '<' => {
                in_tag = true;
                out.push(c);
            }
            '>' => {
                in_tag = false;
                out.push(c);
            }
            PLACEHOLDER_OPEN => {
                let digits_start = idx + c.len_utf8();
                let Some(close) = html[digits_start..].find(PLACEHOLDER_CLOSE) else {
                    out.push(c);
                    continue;
                };
                let span = html[digits_start..digits_start + close]
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| spans.get(n));
                let Some(span) = span else {
                    out.push(c);
                    continue;
                };

                out.push_str(&render_span(span, in_tag, renderer));

                // Skip the digits and the closing marker
                let end = digits_start + close + PLACEHOLDER_CLOSE.len_utf8();
                while chars.peek().is_some_and(|(i, _)| *i < end) {
                    chars.next();
                }
            }
            _ => out.push(c),
        }
    }
    out
}

fn render_span(span: &MathSpan, in_tag: bool, renderer: Option<&dyn MathRenderer>) -> String {
    if in_tag {
        return escape_html(&span.raw);
    }
    let Some(renderer) = renderer else {
        return escape_html(&span.raw);
    };
    match renderer.render(&span.tex, span.mode) {
        Ok(markup) => markup,
        Err(e) => {
            tracing::warn!("Math rendering failed, showing source: {}", e);
            escape_html(&span.raw)
        }
    }
}
