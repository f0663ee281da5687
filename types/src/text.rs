//! Text helpers applied to rendered presence fields.
//!
//! Everything the transport receives goes through this module so that the
//! same trimming, markup stripping and byte limits apply to details, state
//! and image tooltips alike.

use std::fmt;

/// Byte limit Discord enforces on details, state and image tooltips.
pub const MAX_FIELD_BYTES: usize = 128;

/// Remove rich-text markup (`<b>`, `</color>`, `<size=12>` ...) from a string.
///
/// A tag runs from `<` to the next `>` on the same line. A `<` with no
/// closing `>` before the end of the line is kept as text.
///
/// # Examples
/// ```
/// use labpresence_types::text::strip_rich_text;
/// assert_eq!(strip_rich_text("<b>Void</b> G114"), "Void G114");
/// assert_eq!(strip_rich_text("<color=#ff0000>Red</color>"), "Red");
/// assert_eq!(strip_rich_text("1 < 2"), "1 < 2");
/// ```
pub fn strip_rich_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('<') {
        let after = &rest[open + 1..];
        let line_end = after.find('\n').unwrap_or(after.len());
        match after[..line_end].find('>') {
            Some(close) => {
                result.push_str(&rest[..open]);
                rest = &after[close + 1..];
            }
            None => {
                result.push_str(&rest[..=open]);
                rest = after;
            }
        }
    }

    result.push_str(rest);
    result
}

/// A rendered field that does not fit the transport limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldTooLong {
    /// UTF-8 length after trimming
    pub len: usize,
    pub max: usize,
}

impl fmt::Display for FieldTooLong {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes exceeds the {} byte limit", self.len, self.max)
    }
}

impl std::error::Error for FieldTooLong {}

/// Trim a field and check it against a byte limit.
///
/// Empty (or whitespace only) input means "unset" and yields `Ok(None)`.
///
/// # Examples
/// ```
/// use labpresence_types::text::fit_field;
/// assert_eq!(fit_field(Some("  Void G114 "), 128), Ok(Some("Void G114".to_string())));
/// assert_eq!(fit_field(Some("   "), 128), Ok(None));
/// assert_eq!(fit_field(None, 128), Ok(None));
/// assert!(fit_field(Some("abcdef"), 4).is_err());
/// ```
pub fn fit_field(text: Option<&str>, max_bytes: usize) -> Result<Option<String>, FieldTooLong> {
    let Some(text) = text else {
        return Ok(None);
    };
    let trimmed = text.trim();
    if trimmed.len() > max_bytes {
        return Err(FieldTooLong {
            len: trimmed.len(),
            max: max_bytes,
        });
    }
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}

/// Drop a leading "NN - " level number from a level title.
///
/// Titles without the prefix are returned unchanged.
///
/// # Examples
/// ```
/// use labpresence_types::text::strip_level_number;
/// assert_eq!(strip_level_number("15 - Void G114"), "Void G114");
/// assert_eq!(strip_level_number("01 -Descent"), "Descent");
/// assert_eq!(strip_level_number("Hub"), "Hub");
/// assert_eq!(strip_level_number("2077"), "2077");
/// ```
pub fn strip_level_number(title: &str) -> &str {
    let digits = title.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return title;
    }
    let rest = title[digits..].trim_start();
    match rest.strip_prefix('-') {
        Some(name) if !name.trim().is_empty() => name.trim_start(),
        _ => title,
    }
}
