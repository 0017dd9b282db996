//! Logging helpers that keep user-controlled strings (usernames, asset
//! descriptors, stored text) on a single line and bounded in length.

use crate::document::ValueTree;

const MAX_PREVIEW: usize = 200;

/// Render `s` for a log line: line breaks, tabs and other control characters
/// are spelled out (`\n`, `\t`, `\x1B`), backslashes are doubled so the
/// result reads back unambiguously, and anything past [`MAX_PREVIEW`]
/// characters is cut to a trailing `…`. Printable Unicode is left alone.
pub fn escape_log(s: &str) -> String {
    let mut chars = s.chars();
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for ch in chars.by_ref().take(MAX_PREVIEW) {
        push_escaped(&mut out, ch);
    }
    if chars.next().is_some() {
        out.push('…');
    }
    out
}

fn push_escaped(out: &mut String, ch: char) {
    match ch {
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        c if c.is_control() => out.push_str(&format!("\\x{:02X}", u32::from(c))),
        c => out.push(c),
    }
}

/// Compact one-line rendering of a stored value for log lines and CLI output.
/// Lists and maps show their size rather than their content.
pub fn preview_value(value: &ValueTree) -> String {
    match value {
        ValueTree::Null => "null".to_string(),
        ValueTree::Boolean(b) => b.to_string(),
        ValueTree::Integer(i) => i.to_string(),
        ValueTree::Float(f) => f.to_string(),
        ValueTree::Text(s) => format!("\"{}\"", escape_log(s)),
        ValueTree::Timestamp(t) => t.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        ValueTree::List(items) => format!("[{} items]", items.len()),
        ValueTree::Map(map) => format!("{{{} keys}}", map.len()),
    }
}
