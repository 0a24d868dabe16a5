//! JSON recovery from free-form assistant replies.
//!
//! Four stages, first success wins, every stage rejects non-object results:
//! fenced ```json blocks (last one preferred), the largest balanced `{...}`
//! span, synthesized `"key": value` lines, and per-field regex recovery.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::summary::{OPTIONAL_KEY, REQUIRED_KEYS};

/// Recover a JSON object from reply text, or `None` when nothing
/// object-shaped is present.
pub fn extract_object(text: &str) -> Option<Map<String, Value>> {
    let raw = normalize(text);
    from_fenced_block(&raw)
        .or_else(|| from_balanced_span(&raw))
        .or_else(|| from_key_value_lines(&raw))
        .or_else(|| from_field_recovery(&raw))
}

/// Strip BOMs and fold curly quotes so the parser sees plain JSON.
fn normalize(text: &str) -> String {
    text.replace('\u{feff}', "")
        .replace(['\u{201c}', '\u{201d}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn fenced_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)```json\s*([\s\S]*?)\s*```").expect("static regex"))
}

fn from_fenced_block(raw: &str) -> Option<Map<String, Value>> {
    let blocks: Vec<&str> = fenced_re()
        .captures_iter(raw)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    blocks.into_iter().rev().find_map(parse_object)
}

/// Largest top-level balanced `{...}` span that parses as an object.
fn from_balanced_span(raw: &str) -> Option<Map<String, Value>> {
    let mut spans: Vec<&str> = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    for (i, ch) in raw.char_indices() {
        match ch {
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(s) = start.take() {
                            spans.push(&raw[s..i + ch.len_utf8()]);
                        }
                    }
                }
            }
            _ => {}
        }
    }
    spans.sort_by_key(|s| std::cmp::Reverse(s.len()));
    spans.into_iter().find_map(parse_object)
}

/// Collect lines shaped like `"key": value` and wrap them in braces.
fn from_key_value_lines(raw: &str) -> Option<Map<String, Value>> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r#"(?m)^\s*"[^"]+"\s*:\s*.+$"#).expect("static regex"));

    let lines: Vec<&str> = re.find_iter(raw).map(|m| m.as_str().trim()).collect();
    if lines.is_empty() {
        return None;
    }
    let mut body = lines.join("\n");
    // A trailing comma on the final line would sink the whole synthesis.
    while body.ends_with(',') {
        body.pop();
    }
    parse_object(&format!("{{\n{body}\n}}"))
}

/// Field-by-field regex recovery; yields a partial map even without braces.
fn from_field_recovery(raw: &str) -> Option<Map<String, Value>> {
    let mut map = Map::new();
    for key in REQUIRED_KEYS.iter().chain(std::iter::once(&OPTIONAL_KEY)) {
        if let Some(value) = grab_field(raw, key) {
            map.insert(key.to_string(), Value::String(value));
        }
    }
    if map.is_empty() { None } else { Some(map) }
}

fn grab_field(raw: &str, key: &str) -> Option<String> {
    // Quoted key first, bare key second; value may be a quoted string
    // (possibly spanning lines), a bracketed or braced span, or bare text up
    // to the next comma or line break.
    let value_alt = r#"("[^"]*"|\[[^\]]*\]|\{[^}]*\}|[^,\n]+)"#;
    let patterns = [
        format!(r#""{key}"\s*:\s*{value_alt}"#),
        format!(r#"\b{key}\b\s*:\s*{value_alt}"#),
    ];
    for pattern in &patterns {
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        if let Some(caps) = re.captures(raw) {
            let mut value = caps.get(1)?.as_str().trim().to_string();
            if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
                value = value[1..value.len() - 1].to_string();
            }
            let value = value.trim().trim_end_matches(',').trim().to_string();
            if !value.is_empty() {
                return Some(value);
            }
        }
    }
    None
}
