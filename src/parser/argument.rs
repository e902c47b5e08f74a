//! Argument decoding
//!
//! Turns a raw [`IrArgument`] into the logical string value of a statement
//! argument, honoring the quoting rules of the module's `yang-version`:
//!
//! - unquoted: YANG 1.1 rejects embedded quote characters
//! - single-quoted: verbatim
//! - double-quoted: whitespace trimming of continuation lines, then escape
//!   processing; YANG 1.1 only accepts `\n`, `\t`, `\"` and `\\`
//! - concatenation: each fragment decoded independently, then joined

use super::ir::IrArgument;
use crate::error::{Result, YangError};
use crate::source::SourceRef;
use crate::version::YangVersion;

/// Decode an argument into its string value
pub fn decode_argument(arg: &IrArgument, version: YangVersion, at: &SourceRef) -> Result<String> {
    match arg {
        IrArgument::Unquoted(text) => {
            if version == YangVersion::V1_1 && text.contains(['"', '\'']) {
                return Err(YangError::source(
                    format!("YANG 1.1: unquoted string ({}) contains illegal characters", text),
                    at.clone(),
                ));
            }
            Ok(text.clone())
        }
        IrArgument::SingleQuoted(text) => Ok(text.clone()),
        IrArgument::DoubleQuoted { text, quote_column } => {
            let trimmed = trim_whitespace(text, *quote_column);
            unescape(&trimmed, version, at)
        }
        IrArgument::Concatenation(parts) => {
            let mut out = String::new();
            for part in parts {
                out.push_str(&decode_argument(part, version, at)?);
            }
            Ok(out)
        }
    }
}

/// Normalize whitespace in a multi-line double-quoted string.
///
/// Trailing whitespace is removed from every line but the last. Leading
/// whitespace of continuation lines is removed up to and including the
/// column of the opening quote, counting a tab as eight columns; a tab that
/// straddles that column is replaced by the spaces it overshoots.
pub fn trim_whitespace(text: &str, quote_column: usize) -> String {
    let mut lines = text.split('\n');
    let Some(first) = lines.next() else {
        return String::new();
    };
    let rest: Vec<&str> = lines.collect();
    if rest.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    out.push_str(first.trim_end_matches(is_yang_whitespace));
    let last = rest.len() - 1;
    for (i, line) in rest.into_iter().enumerate() {
        out.push('\n');
        let line = if i == last { line } else { line.trim_end_matches(is_yang_whitespace) };
        trim_leading(&mut out, line, quote_column);
    }
    out
}

fn trim_leading(out: &mut String, line: &str, quote_column: usize) {
    let mut pos = 0usize;
    let mut offset = 0usize;
    let bytes = line.as_bytes();

    while pos <= quote_column {
        let Some(&b) = bytes.get(offset) else {
            return;
        };
        match b {
            b'\t' => pos += 8,
            b' ' | b'\r' | 0x0b | 0x0c => pos += 1,
            _ => break,
        }
        offset += 1;
    }

    while pos > quote_column + 1 {
        out.push(' ');
        pos -= 1;
    }
    out.push_str(&line[offset..]);
}

fn is_yang_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\u{0b}' | '\u{0c}')
}

fn unescape(text: &str, version: YangVersion, at: &SourceRef) -> Result<String> {
    if !text.contains('\\') {
        return Ok(text.to_string());
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) if version == YangVersion::V1_1 => {
                return Err(YangError::source(
                    format!(
                        "YANG 1.1: illegal double quoted string ({}). In double quoted string the backslash \
                         must be followed by one of the following character [n,t,\",\\], but was '{}'.",
                        text, other
                    ),
                    at.clone(),
                ));
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    Ok(out)
}
