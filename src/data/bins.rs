//! Range labels for histogram bins.
//!
//! Accepted shapes: `N`, `N-M`, `N+`, `>N`, `<N`, where any bound may be a
//! power-of-two token (`2^k`, `2^{k}` or `2` followed by unicode superscript
//! digits such as `2¹⁰`).

use crate::error::DatasetError;
use serde::{Deserialize, Serialize};

/// Inclusive degree range. `hi == None` means open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinRange {
    pub lo: u64,
    pub hi: Option<u64>,
}

impl BinRange {
    pub fn contains(&self, value: u64) -> bool {
        value >= self.lo && self.hi.map(|hi| value <= hi).unwrap_or(true)
    }
}

/// How the exponent of a power-of-two token was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExponentStyle {
    Caret,
    Braced,
    Superscript,
}

/// A trailing `2^k` token and the text in front of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerToken<'a> {
    pub prefix: &'a str,
    pub exponent: u32,
    pub style: ExponentStyle,
}

impl PowerToken<'_> {
    pub fn value(&self) -> u64 {
        1u64 << self.exponent
    }
}

fn superscript_digit(c: char) -> Option<u32> {
    match c {
        '\u{2070}' => Some(0),
        '\u{00B9}' => Some(1),
        '\u{00B2}' => Some(2),
        '\u{00B3}' => Some(3),
        '\u{2074}'..='\u{2079}' => Some(c as u32 - 0x2070),
        _ => None,
    }
}

pub fn superscript(exponent: u32) -> String {
    const DIGITS: [char; 10] = [
        '\u{2070}', '\u{00B9}', '\u{00B2}', '\u{00B3}', '\u{2074}', '\u{2075}', '\u{2076}',
        '\u{2077}', '\u{2078}', '\u{2079}',
    ];
    exponent
        .to_string()
        .chars()
        .filter_map(|d| d.to_digit(10).map(|i| DIGITS[i as usize]))
        .collect()
}

/// Base `2` must start the label or follow a non-digit, otherwise `12^3`
/// would read as `1` + `2^3`.
fn base_is_standalone(label: &str, base_idx: usize) -> bool {
    label[..base_idx]
        .chars()
        .next_back()
        .map(|c| !c.is_ascii_digit())
        .unwrap_or(true)
}

fn parse_exponent(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok().filter(|k| *k < 64)
}

/// Split a label ending in a power-of-two token. Returns `None` when the
/// label does not end in a well-formed token.
pub fn split_power_suffix(label: &str) -> Option<PowerToken<'_>> {
    if let Some(caret) = label.rfind("2^") {
        if !base_is_standalone(label, caret) {
            return None;
        }
        let rest = &label[caret + 2..];
        let (digits, style) = match rest.strip_prefix('{') {
            Some(inner) => (inner.strip_suffix('}')?, ExponentStyle::Braced),
            None => (rest, ExponentStyle::Caret),
        };
        let exponent = parse_exponent(digits)?;
        return Some(PowerToken {
            prefix: &label[..caret],
            exponent,
            style,
        });
    }

    let sup_start = label
        .char_indices()
        .rev()
        .take_while(|(_, c)| superscript_digit(*c).is_some())
        .last()
        .map(|(i, _)| i)?;
    let base_idx = sup_start.checked_sub(1)?;
    if !label.is_char_boundary(base_idx) || &label[base_idx..sup_start] != "2" {
        return None;
    }
    if !base_is_standalone(label, base_idx) {
        return None;
    }
    let digits: String = label[sup_start..]
        .chars()
        .filter_map(superscript_digit)
        .filter_map(|d| char::from_digit(d, 10))
        .collect();
    let exponent = parse_exponent(&digits)?;
    Some(PowerToken {
        prefix: &label[..base_idx],
        exponent,
        style: ExponentStyle::Superscript,
    })
}

fn parse_bound(text: &str) -> Option<u64> {
    let text = text.trim();
    if let Ok(v) = text.parse::<u64>() {
        return Some(v);
    }
    match split_power_suffix(text) {
        Some(token) if token.prefix.is_empty() => Some(token.value()),
        _ => None,
    }
}

/// Parse a bin label into its inclusive range.
pub fn parse_range(label: &str) -> Option<BinRange> {
    let t = label.trim();
    if let Some(rest) = t.strip_prefix('>') {
        let v = parse_bound(rest)?;
        return Some(BinRange {
            lo: v.checked_add(1)?,
            hi: None,
        });
    }
    if let Some(rest) = t.strip_prefix('<') {
        let v = parse_bound(rest)?;
        return Some(BinRange {
            lo: 0,
            hi: Some(v.checked_sub(1)?),
        });
    }
    if let Some(rest) = t.strip_suffix('+') {
        return Some(BinRange {
            lo: parse_bound(rest)?,
            hi: None,
        });
    }
    if let Some((a, b)) = t.split_once('-') {
        let lo = parse_bound(a)?;
        let hi = parse_bound(b)?;
        return (lo <= hi).then_some(BinRange { lo, hi: Some(hi) });
    }
    let v = parse_bound(t)?;
    Some(BinRange { lo: v, hi: Some(v) })
}

/// Check that `labels` form an ascending partition with no gaps, no
/// overlaps and at most one open-ended bin in last position.
pub fn validate_partition<'a>(
    table: &'static str,
    labels: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<BinRange>, DatasetError> {
    let mut ranges: Vec<BinRange> = Vec::new();
    for label in labels {
        let range = parse_range(label).ok_or_else(|| DatasetError::BadBinLabel {
            table,
            label: label.to_string(),
        })?;
        if let Some(prev) = ranges.last() {
            let prev_hi = prev.hi.ok_or_else(|| DatasetError::BinAfterOpenEnd {
                table,
                label: label.to_string(),
            })?;
            let expected = prev_hi + 1;
            if range.lo != expected {
                return Err(DatasetError::BinGap {
                    table,
                    label: label.to_string(),
                    expected,
                    found: range.lo,
                });
            }
        }
        ranges.push(range);
    }
    Ok(ranges)
}
