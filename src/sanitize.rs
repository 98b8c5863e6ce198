//! Text normalization helpers shared by the format readers.
//!
//! - [`sanitize_line`] replaces every non-ASCII character with a `<U{codepoint}>` token
//! - [`parse_value`] turns a raw token into a [`FeatureValue`], numeric when possible
//! - [`decode_line`] decodes raw bytes as UTF-8, falling back to windows-1252

use crate::models::FeatureValue;
use encoding_rs::{UTF_8, WINDOWS_1252};
use std::borrow::Cow;
use std::fmt::Write;

/// Returns a copy of `line` where every character above code point 127 is
/// replaced by `<U{codepoint}>` (decimal). ASCII passes through unchanged.
pub fn sanitize_line(line: &str) -> Cow<'_, str> {
    if line.is_ascii() {
        return Cow::Borrowed(line);
    }

    let mut out = String::with_capacity(line.len() + 16);
    for c in line.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            write!(out, "<U{}>", c as u32).ok();
        }
    }
    Cow::Owned(out)
}

/// Parses `token` as a float, returning the original text when it is not numeric.
pub fn parse_value(token: &str) -> FeatureValue {
    match token.trim().parse::<f64>() {
        Ok(n) => FeatureValue::Number(n),
        Err(_) => FeatureValue::Text(token.to_string()),
    }
}

/// Decodes one raw line, trying UTF-8 first and windows-1252 second.
///
/// windows-1252 maps every byte, so this never fails.
pub fn decode_line(bytes: &[u8]) -> Cow<'_, str> {
    if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        return text;
    }
    let (text, _had_errors) = WINDOWS_1252.decode_without_bom_handling(bytes);
    text
}
