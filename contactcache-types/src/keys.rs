//! Secondary lookup keys.
//!
//! Incoming calls and messages identify a contact by phone number or email
//! address. The store indexes every record under normalized forms of both.

use serde::{Deserialize, Serialize};

/// Minimum number of trailing digits compared when matching phone numbers.
const PHONE_MATCH_DIGITS: usize = 7;

/// Kind of secondary lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyKind {
    Phone,
    Email,
}

/// A normalized secondary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecondaryKey {
    pub kind: KeyKind,
    pub value: String,
}

impl SecondaryKey {
    /// Normalizes `raw` into the indexed form for `kind`.
    /// Returns `None` when nothing usable remains.
    #[must_use]
    pub fn new(kind: KeyKind, raw: &str) -> Option<Self> {
        let value = match kind {
            KeyKind::Phone => phone_match_key(raw)?,
            KeyKind::Email => normalize_email(raw)?,
        };
        Some(Self { kind, value })
    }
}

/// Strips separators from a phone number, keeping digits and a leading `+`.
#[must_use]
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let mut out = String::with_capacity(trimmed.len());
    if trimmed.starts_with('+') {
        out.push('+');
    }
    out.extend(trimmed.chars().filter(char::is_ascii_digit));
    if out.trim_start_matches('+').is_empty() {
        None
    } else {
        Some(out)
    }
}

/// The key phone numbers are indexed and matched by: the trailing
/// significant digits, so local and international forms of the same
/// number collide.
#[must_use]
pub fn phone_match_key(raw: &str) -> Option<String> {
    let normalized = normalize_phone(raw)?;
    let digits = normalized.trim_start_matches('+');
    let start = digits.len().saturating_sub(PHONE_MATCH_DIGITS);
    Some(digits[start..].to_string())
}

/// Trims and lowercases an email address. Rejects values without `@`.
#[must_use]
pub fn normalize_email(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if !trimmed.contains('@') || trimmed.starts_with('@') || trimmed.ends_with('@') {
        return None;
    }
    Some(trimmed.to_lowercase())
}
