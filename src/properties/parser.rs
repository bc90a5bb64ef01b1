//! `.properties` file parsing.
//!
//! Supports the common subset of the Java format:
//! - `key=value`, `key: value` and `key value`
//! - `#` and `!` comment lines
//! - backslash line continuation
//! - escapes `\t \n \r \f \\ \uXXXX`, plus `\=`, `\:` and `\ ` inside keys

use std::fs;
use std::path::Path;

use super::Properties;

/// Parse properties text into a map. Later duplicates win.
pub fn parse_properties(content: &str) -> Properties {
    let mut props = Properties::new();

    for line in logical_lines(content) {
        if let Some((key, value)) = parse_line(&line) {
            props.insert(&key, &value);
        }
    }

    props
}

/// Read and parse a properties file.
pub fn parse_properties_file(path: &Path) -> std::io::Result<Properties> {
    let content = fs::read_to_string(path)?;
    Ok(parse_properties(&content))
}

/// Parse a single logical line into a (key, value) pair.
///
/// Returns `None` for blank lines and comments.
pub fn parse_line(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim_start();

    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
        return None;
    }

    // Find the first unescaped separator ('=', ':' or whitespace).
    let mut key_end = trimmed.len();
    let mut escaped = false;
    for (i, c) in trimmed.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                key_end = i;
                break;
            }
            c if c.is_whitespace() => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let key = unescape(&trimmed[..key_end]);
    if key.is_empty() {
        return None;
    }

    // Skip whitespace, at most one '=' or ':', then whitespace again.
    let rest = trimmed[key_end..].trim_start();
    let rest = rest
        .strip_prefix('=')
        .or_else(|| rest.strip_prefix(':'))
        .unwrap_or(rest)
        .trim_start();

    Some((key, unescape(rest)))
}

/// Join physical lines ending in an odd number of backslashes.
fn logical_lines(content: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut continuing = false;

    for raw in content.lines() {
        let piece = if continuing { raw.trim_start() } else { raw };

        // Comments never continue.
        if !continuing {
            let t = piece.trim_start();
            if t.starts_with('#') || t.starts_with('!') {
                lines.push(piece.to_string());
                continue;
            }
        }

        let trailing = piece.chars().rev().take_while(|&c| c == '\\').count();
        if trailing % 2 == 1 {
            current.push_str(&piece[..piece.len() - 1]);
            continuing = true;
        } else {
            current.push_str(piece);
            lines.push(std::mem::take(&mut current));
            continuing = false;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{0C}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    // Malformed escape: keep it literally.
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    out
}
