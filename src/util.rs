//! Utility functions for text processing

use regex::Regex;
use std::sync::LazyLock;

/// ANSI escape sequence regex pattern
/// Matches CSI sequences (ESC[...m), OSC sequences (ESC]...BEL), and other control codes
static ANSI_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\x1b\[[0-9;?]*[A-Za-z]",     // CSI sequences (colors, cursor movement, etc.)
        r"|\x1b\][^\x07]*\x07",         // OSC sequences (title, etc.)
        r"|\x1b\][^\x1b]*\x1b\\",       // OSC with ST terminator
        r"|\x1b[PX^_][^\x1b]*\x1b\\",   // DCS, SOS, PM, APC sequences
        r"|\x1b.",                       // Other two-byte escape sequences
        r"|[\x00-\x08\x0b\x0c\x0e-\x1f\x7f]" // Other control characters (except \n, \r, \t)
    ))
    .expect("static ANSI pattern compiles")
});

/// Strip ANSI escape sequences and control characters from text.
///
/// Model output occasionally carries raw terminal escapes; they have no
/// meaning in the conversation document.
pub fn strip_ansi(text: &str) -> String {
    ANSI_REGEX.replace_all(text, "").into_owned()
}

/// Escape text for use in HTML element content and quoted attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
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
