//! Best-effort parsing of incomplete JSON for live previews.
//!
//! Tool-call arguments arrive as arbitrary text fragments. While a call is
//! still streaming the UI wants something to show, so [`parse_partial_json`]
//! closes whatever is open and returns the value the text describes so far.
//! The result is for display only; execution always uses a strict parse of
//! the complete arguments.

use serde_json::Value;

/// Parse possibly-truncated JSON.
///
/// Returns the strict parse when `text` is complete. Otherwise open strings
/// are closed, dangling escapes, commas, colons and object keys are
/// dropped, and open containers are closed. If that still fails the text
/// is cut back to successively earlier commas and container boundaries.
/// Returns `None` for empty input or when no prefix makes sense.
pub fn parse_partial_json(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }
    if let Some(value) = close(text) {
        return Some(value);
    }
    scan(text)
        .cuts
        .iter()
        .rev()
        .filter(|&&cut| cut < text.len())
        .find_map(|&cut| close(&text[..cut]))
}

#[derive(Debug)]
struct StringSpan {
    /// Offset of the opening quote.
    start: usize,
    /// Last structural byte before the string.
    prev: Option<u8>,
}

#[derive(Debug, Default)]
struct Scan {
    stack: Vec<u8>,
    strings: Vec<StringSpan>,
    cuts: Vec<usize>,
    in_string: bool,
    escape: bool,
    /// Backslash offset and hex digits seen of an unfinished `\u` escape.
    unicode: Option<(usize, u8)>,
}

// Byte-level: every structural character is ASCII, so offsets recorded
// here always fall on char boundaries.
fn scan(text: &str) -> Scan {
    let mut s = Scan::default();
    let mut prev = None;
    for (i, &b) in text.as_bytes().iter().enumerate() {
        if s.in_string {
            if let Some((at, seen)) = s.unicode {
                if b.is_ascii_hexdigit() {
                    s.unicode = (seen + 1 < 4).then_some((at, seen + 1));
                    continue;
                }
                s.unicode = None;
            }
            if s.escape {
                s.escape = false;
                if b == b'u' {
                    s.unicode = Some((i - 1, 0));
                }
                continue;
            }
            match b {
                b'\\' => s.escape = true,
                b'"' => {
                    s.in_string = false;
                    prev = Some(b'"');
                }
                _ => {}
            }
            continue;
        }

        match b {
            b'"' => {
                s.in_string = true;
                s.strings.push(StringSpan { start: i, prev });
            }
            b'{' | b'[' => {
                s.stack.push(b);
                s.cuts.push(i + 1);
                prev = Some(b);
            }
            b'}' | b']' => {
                s.stack.pop();
                s.cuts.push(i + 1);
                prev = Some(b);
            }
            b',' => {
                s.cuts.push(i);
                prev = Some(b);
            }
            b if b.is_ascii_whitespace() => {}
            _ => prev = Some(b),
        }
    }
    s
}

fn close(prefix: &str) -> Option<Value> {
    let mut s = scan(prefix);
    let mut out = prefix.to_string();

    if s.in_string {
        if let Some((at, _)) = s.unicode {
            out.truncate(at);
        } else if s.escape {
            out.pop();
        }
        out.push('"');
    }

    loop {
        trim_end(&mut out);
        if out.ends_with(',') {
            out.pop();
            continue;
        }
        if out.ends_with(':') {
            out.pop();
            trim_end(&mut out);
            drop_trailing_string(&mut out, &mut s.strings);
            continue;
        }
        if s.stack.last() == Some(&b'{')
            && ends_with_key(&out, &s.strings)
            && drop_trailing_string(&mut out, &mut s.strings)
        {
            continue;
        }
        break;
    }

    for &open in s.stack.iter().rev() {
        out.push(if open == b'{' { '}' } else { ']' });
    }
    serde_json::from_str(&out).ok()
}

fn trim_end(out: &mut String) {
    let len = out.trim_end().len();
    out.truncate(len);
}

fn ends_with_key(out: &str, strings: &[StringSpan]) -> bool {
    out.ends_with('"')
        && strings
            .last()
            .is_some_and(|span| matches!(span.prev, Some(b'{') | Some(b',')))
}

fn drop_trailing_string(out: &mut String, strings: &mut Vec<StringSpan>) -> bool {
    if !out.ends_with('"') {
        return false;
    }
    match strings.pop() {
        Some(span) if span.start < out.len() => {
            out.truncate(span.start);
            true
        }
        _ => false,
    }
}
