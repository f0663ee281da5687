//! Token scanning and substitution.
//!
//! Token grammar:
//!
//! - `%name%` and `%name|arg1|arg2%` resolve through the registry
//! - `\%name\%` renders as the literal `%name%`
//! - anything else, including `%unknown%`, passes through untouched
//!
//! Arguments run until the first `%` that is not preceded by a backslash
//! and never span a newline. Names are compared literally, so a name
//! containing `.` or `:` needs no escaping.

use std::panic::{self, AssertUnwindSafe};

use hashbrown::HashSet;

use super::registry::{Placeholder, PlaceholderRegistry};
use crate::error::ResolutionError;

/// Renders templates against a borrowed registry.
#[derive(Debug, Clone, Copy)]
pub struct TemplateEngine<'r> {
    registry: &'r PlaceholderRegistry,
}

impl<'r> TemplateEngine<'r> {
    pub fn new(registry: &'r PlaceholderRegistry) -> Self {
        Self { registry }
    }

    /// Every placeholder with at least one unescaped occurrence in `text`,
    /// in registry order.
    pub fn find_placeholders_in(&self, text: &str) -> Vec<&'r Placeholder> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.registry
            .iter()
            .filter(|placeholder| {
                placeholder.names().any(|name| {
                    scan(text, name)
                        .iter()
                        .any(|token| matches!(token.kind, TokenKind::Found(_)))
                })
            })
            .collect()
    }

    /// Substitute every known token in `text`.
    ///
    /// Placeholders are processed in registry order and each one replaces
    /// all of its occurrences before the next runs. Substituted output is
    /// never scanned again, so a provider returning `%other%` yields that
    /// text verbatim. Provider errors and panics are logged and render as
    /// an empty string.
    pub fn apply(&self, text: &str) -> String {
        if self.registry.is_empty() || !text.contains('%') {
            return text.to_string();
        }

        let mut segments = vec![Segment::Raw(text.to_string())];
        for placeholder in self.registry.iter() {
            for name in placeholder.names() {
                segments = segments
                    .into_iter()
                    .flat_map(|segment| match segment {
                        Segment::Raw(raw) => substitute(placeholder, name, &raw),
                        done => vec![done],
                    })
                    .collect();
            }
        }

        segments
            .into_iter()
            .map(|segment| match segment {
                Segment::Raw(s) | Segment::Done(s) => s,
            })
            .collect()
    }

    /// Names of `%word%` tokens that match no registered name or alias, in
    /// order of first appearance. Escaped tokens are ignored.
    pub fn unknown_tokens(&self, text: &str) -> Vec<String> {
        let known: HashSet<&str> = self.registry.iter().flat_map(Placeholder::names).collect();
        let bytes = text.as_bytes();
        let mut unknown: Vec<String> = Vec::new();
        let mut pos = 0;

        while let Some(offset) = text[pos..].find('%') {
            let start = pos + offset;
            let escaped = start > 0 && bytes[start - 1] == b'\\';
            let name_start = start + 1;
            let name_end = text[name_start..]
                .find(|c: char| matches!(c, '%' | '|' | '\\') || c.is_whitespace())
                .map_or(text.len(), |i| name_start + i);
            let name = &text[name_start..name_end];

            let token_end = match bytes.get(name_end).copied() {
                Some(b'%') if !name.is_empty() => Some(name_end),
                Some(b'|') if !name.is_empty() => closing_percent(text, name_end + 1),
                _ => None,
            };

            match token_end {
                Some(end) => {
                    if !escaped && !known.contains(name) && !unknown.iter().any(|u| u == name) {
                        unknown.push(name.to_string());
                    }
                    pos = end + 1;
                }
                None => pos = name_start,
            }
        }
        unknown
    }
}

// ─── Scanning ───────────────────────────────────────────────────────────────

enum Segment {
    /// Original template text, still eligible for matching
    Raw(String),
    /// Output of a substitution
    Done(String),
}

#[derive(Debug, PartialEq)]
enum TokenKind<'t> {
    Escaped,
    Found(Vec<&'t str>),
}

#[derive(Debug, PartialEq)]
struct Token<'t> {
    start: usize,
    end: usize,
    kind: TokenKind<'t>,
}

/// All non-overlapping tokens for `name`, left to right. The escaped form
/// wins when both could start at the same position.
fn scan<'t>(text: &'t str, name: &str) -> Vec<Token<'t>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        // Both forms start with an ASCII byte, so `pos` is a char boundary
        // whenever `match_at` runs.
        if matches!(bytes[pos], b'%' | b'\\')
            && let Some(token) = match_at(text, pos, name)
        {
            pos = token.end;
            tokens.push(token);
            continue;
        }
        pos += 1;
    }
    tokens
}

fn match_at<'t>(text: &'t str, pos: usize, name: &str) -> Option<Token<'t>> {
    let rest = &text[pos..];

    if let Some(after) = rest.strip_prefix("\\%").and_then(|r| r.strip_prefix(name))
        && after.starts_with("\\%")
    {
        return Some(Token {
            start: pos,
            end: pos + name.len() + 4,
            kind: TokenKind::Escaped,
        });
    }

    let after = rest.strip_prefix('%')?.strip_prefix(name)?;
    let name_end = pos + 1 + name.len();
    match after.as_bytes().first().copied()? {
        b'%' if !text[..name_end].ends_with('\\') => Some(Token {
            start: pos,
            end: name_end + 1,
            kind: TokenKind::Found(Vec::new()),
        }),
        b'|' => {
            let args_start = name_end + 1;
            let close = closing_percent(text, args_start)?;
            Some(Token {
                start: pos,
                end: close + 1,
                kind: TokenKind::Found(text[args_start..close].split('|').collect()),
            })
        }
        _ => None,
    }
}

/// Index of the first `%` at or after `from` not preceded by a backslash,
/// stopping at end of line.
fn closing_percent(text: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    (from..bytes.len())
        .take_while(|&i| bytes[i] != b'\n')
        .find(|&i| bytes[i] == b'%' && bytes[i - 1] != b'\\')
}

fn substitute(placeholder: &Placeholder, name: &str, raw: &str) -> Vec<Segment> {
    let tokens = scan(raw, name);
    if tokens.is_empty() {
        return vec![Segment::Raw(raw.to_string())];
    }

    let mut out = Vec::with_capacity(tokens.len() * 2 + 1);
    let mut cursor = 0;
    for token in tokens {
        if token.start > cursor {
            out.push(Segment::Raw(raw[cursor..token.start].to_string()));
        }
        let value = match token.kind {
            TokenKind::Escaped => format!("%{name}%"),
            TokenKind::Found(args) => resolve_guarded(placeholder, name, &args),
        };
        out.push(Segment::Done(value));
        cursor = token.end;
    }
    if cursor < raw.len() {
        out.push(Segment::Raw(raw[cursor..].to_string()));
    }
    out
}

fn resolve_guarded(placeholder: &Placeholder, name: &str, args: &[&str]) -> String {
    let message = match panic::catch_unwind(AssertUnwindSafe(|| placeholder.resolve(args))) {
        Ok(Ok(value)) => return value,
        Ok(Err(e)) => e.to_string(),
        Err(payload) => {
            if let Some(s) = payload.downcast_ref::<&str>() {
                format!("panicked: {s}")
            } else if let Some(s) = payload.downcast_ref::<String>() {
                format!("panicked: {s}")
            } else {
                "panicked".to_string()
            }
        }
    };
    let err = ResolutionError {
        placeholder: name.to_string(),
        message,
    };
    tracing::error!(placeholder = %name, error = %err, "Placeholder resolution failed");
    String::new()
}
