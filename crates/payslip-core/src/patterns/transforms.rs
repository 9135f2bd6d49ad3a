//! Text and value transforms applied around pattern matching.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref LINE_BREAKS: Regex = Regex::new(r"\r\n?|\u{2028}|\u{2029}").unwrap();
    static ref INLINE_WHITESPACE: Regex = Regex::new(r"[ \t\u{00a0}]+").unwrap();
    // Sign or opening bracket, optionally around a currency marker, and nothing else
    static ref NEGATIVE_PREFIX: Regex =
        Regex::new(r"(?i)^\s*(?:(?:rs\.?|inr|₹)\s*)?[-(]\s*(?:(?:rs\.?|inr|₹)\s*)?$").unwrap();
}

/// Transform applied to the source text before matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextTransform {
    /// Convert CR/LF variants to `\n`.
    NormalizeNewlines,
    /// Collapse runs of spaces and tabs into one space.
    CollapseWhitespace,
    Lowercase,
    Uppercase,
}

impl TextTransform {
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match self {
            TextTransform::NormalizeNewlines => LINE_BREAKS.replace_all(text, "\n"),
            TextTransform::CollapseWhitespace => INLINE_WHITESPACE.replace_all(text, " "),
            TextTransform::Lowercase => Cow::Owned(text.to_lowercase()),
            TextTransform::Uppercase => Cow::Owned(text.to_uppercase()),
        }
    }
}

/// Transform applied to a captured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueTransform {
    Trim,
    Uppercase,
    /// Keep ASCII digits only.
    RemoveNonNumeric,
    /// Strip currency glyphs and thousands separators, keep the decimal point.
    NormalizeCurrency,
}

impl ValueTransform {
    pub fn apply(&self, value: &str) -> String {
        match self {
            ValueTransform::Trim => value
                .trim_matches(|c: char| c.is_whitespace() || c == ':' || c == '|')
                .to_string(),
            ValueTransform::Uppercase => value.to_uppercase(),
            ValueTransform::RemoveNonNumeric => {
                value.chars().filter(|c| c.is_ascii_digit()).collect()
            }
            ValueTransform::NormalizeCurrency => normalize_currency(value),
        }
    }
}

/// Apply transforms in order.
pub fn apply_text_transforms<'a>(text: &'a str, transforms: &[TextTransform]) -> Cow<'a, str> {
    let mut current = Cow::Borrowed(text);
    for transform in transforms {
        current = match current {
            Cow::Borrowed(s) => transform.apply(s),
            Cow::Owned(s) => Cow::Owned(transform.apply(&s).into_owned()),
        };
    }
    current
}

/// Apply value transforms in order.
pub fn apply_value_transforms(value: &str, transforms: &[ValueTransform]) -> String {
    transforms
        .iter()
        .fold(value.to_string(), |acc, t| t.apply(&acc))
}

/// Normalize a printed amount to a canonical decimal string.
///
/// Currency glyphs and words (`₹`, `Rs.`, `INR`) and grouping separators are
/// dropped, Indian lakh grouping included. The last `.` is the decimal point.
/// A `-` or `(` directly before the digits (currency marker aside) makes the
/// amount negative. Returns an empty string when no digits are present.
pub fn normalize_currency(value: &str) -> String {
    let Some(first) = value.find(|c: char| c.is_ascii_digit()) else {
        return String::new();
    };
    // The amount ends at the first letter after its digits ("12.5 Cr", "400 DSOPF")
    let tail = &value[first..];
    let body = &tail[..tail.find(char::is_alphabetic).unwrap_or(tail.len())];
    let last = body.rfind(|c: char| c.is_ascii_digit()).unwrap_or(0);

    let negative = NEGATIVE_PREFIX.is_match(&value[..first]);
    let span = &body[..=last];

    let last_dot = span.rfind('.');
    let mut out = String::with_capacity(span.len() + 1);
    if negative {
        out.push('-');
    }
    for (i, c) in span.char_indices() {
        if c.is_ascii_digit() || (c == '.' && Some(i) == last_dot) {
            out.push(c);
        }
    }
    out
}
