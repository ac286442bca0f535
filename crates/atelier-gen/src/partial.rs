//! Best-effort completion of truncated JSON
//!
//! Structured generation arrives as a growing prefix of a JSON document.
//! Consumers must only ever see whole objects, so this module closes the
//! prefix into valid JSON when possible: open strings and brackets are
//! closed, dangling separators are repaired. Prefixes that cannot be
//! repaired (e.g. cut mid-keyword) yield `None` and the caller skips
//! that snapshot.

/// Attempt to complete a truncated JSON prefix into a parseable value.
///
/// Returns `None` when the prefix is empty or cannot be repaired by
/// closing open scopes.
#[must_use]
pub fn complete_partial_json(prefix: &str) -> Option<serde_json::Value> {
    let trimmed = prefix.trim_start();
    if trimmed.is_empty() {
        return None;
    }

    // Fast path: already valid JSON.
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for ch in trimmed.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                // Unbalanced close: not repairable.
                if stack.pop() != Some(ch) {
                    return None;
                }
            }
            _ => {}
        }
    }

    let mut repaired = trimmed.to_string();

    if in_string {
        // A trailing lone backslash would escape our closing quote.
        if escaped {
            repaired.pop();
        }
        repaired.push('"');
    }

    // Repair dangling separators left at a truncation point.
    loop {
        let len = repaired.trim_end().len();
        repaired.truncate(len);
        match repaired.chars().last() {
            Some(',') => {
                repaired.pop();
            }
            Some(':') => {
                repaired.push_str("null");
                break;
            }
            _ => break,
        }
    }

    while let Some(close) = stack.pop() {
        repaired.push(close);
    }

    serde_json::from_str(&repaired).ok()
}
