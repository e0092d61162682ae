//! Derivation layer: pure, total functions from registry data to display
//! values. Nothing here returns an error; degenerate inputs map to `0.0`,
//! an empty string or the input passed through.

use crate::data::bins::{split_power_suffix, superscript};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Chart colors, cycled by index.
pub const PALETTE: [&str; 8] = [
    "#0088FE", "#00C49F", "#FFBB28", "#FF8042", "#8884d8", "#82ca9d", "#ffc658", "#8dd1e1",
];

pub fn palette_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// `count / total * 100`, or `0.0` when `total == 0`.
pub fn percent_of_total(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64 * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyUnit {
    Euro,
    KiloEuro,
    MegaEuro,
    GigaEuro,
}

impl CurrencyUnit {
    pub fn divisor(&self) -> u64 {
        match self {
            CurrencyUnit::Euro => 1,
            CurrencyUnit::KiloEuro => 1_000,
            CurrencyUnit::MegaEuro => 1_000_000,
            CurrencyUnit::GigaEuro => 1_000_000_000,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            CurrencyUnit::Euro => "",
            CurrencyUnit::KiloEuro => "K",
            CurrencyUnit::MegaEuro => "M",
            CurrencyUnit::GigaEuro => "B",
        }
    }

    pub fn long_name(&self) -> &'static str {
        match self {
            CurrencyUnit::Euro => "",
            CurrencyUnit::KiloEuro => " thousand",
            CurrencyUnit::MegaEuro => " million",
            CurrencyUnit::GigaEuro => " billion",
        }
    }

    pub fn decimals(&self) -> u32 {
        match self {
            CurrencyUnit::Euro => 0,
            _ => 2,
        }
    }
}

/// `amount / divisor` with `decimals` fraction digits, rounded half to even.
/// Integer arithmetic throughout, so the scaling is exact.
pub fn scale_fixed(amount: u64, divisor: u64, decimals: u32) -> String {
    let divisor = divisor.max(1) as u128;
    let pow = 10u128.pow(decimals.min(18));
    let scaled = amount as u128 * pow;
    let mut q = scaled / divisor;
    let r = scaled % divisor;
    if 2 * r > divisor || (2 * r == divisor && q % 2 == 1) {
        q += 1;
    }
    if decimals == 0 {
        return q.to_string();
    }
    format!(
        "{}.{:0width$}",
        q / pow,
        q % pow,
        width = decimals as usize
    )
}

/// `formatCurrency(7143895811, GigaEuro) == "€7.14B"`.
pub fn format_currency(amount: u64, unit: CurrencyUnit) -> String {
    format!(
        "\u{20AC}{}{}",
        scale_fixed(amount, unit.divisor(), unit.decimals()),
        unit.suffix()
    )
}

/// Axis ticks: whole units, e.g. `€7B`.
pub fn format_currency_tick(amount: u64, unit: CurrencyUnit) -> String {
    format!("\u{20AC}{}{}", scale_fixed(amount, unit.divisor(), 0), unit.suffix())
}

/// Tooltips: e.g. `€7.14 billion`.
pub fn format_currency_long(amount: u64, unit: CurrencyUnit) -> String {
    format!(
        "\u{20AC}{}{}",
        scale_fixed(amount, unit.divisor(), unit.decimals()),
        unit.long_name()
    )
}

pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Grouped integer part, at most three fraction digits, trailing zeros
/// dropped: `27224.0 -> "27,224"`, `56.48 -> "56.48"`.
pub fn format_grouped(value: f64) -> String {
    if !value.is_finite() {
        return String::new();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let millis = (value.abs() * 1000.0).round() as u64;
    let int = group_thousands(millis / 1000);
    let frac = format!("{:03}", millis % 1000);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        format!("{}{}", sign, int)
    } else {
        format!("{}{}.{}", sign, int, frac)
    }
}

/// Headline metric values: below 1 with six decimals, grouped otherwise.
pub fn format_metric_value(value: f64) -> String {
    if !value.is_finite() {
        return String::new();
    }
    if value < 1.0 {
        format!("{:.6}", value)
    } else {
        format_grouped(value)
    }
}

pub fn format_percent(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return format!("{:.*}%", decimals, 0.0);
    }
    format!("{:.*}%", decimals, value)
}

/// First word of a category label, `"Higher Education (HES)" -> "Higher"`.
pub fn short_label(label: &str) -> &str {
    label.split(' ').next().unwrap_or("")
}

/// One point of a chart series. `extra` carries per-point fields the
/// renderer shows in tooltips (country, share, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SeriesPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
            extra: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

/// Sort descending by `key_of`, ties in input order, keep `limit` points.
pub fn build_ranking_series<T>(
    records: &[T],
    label_of: impl Fn(&T) -> String,
    key_of: impl Fn(&T) -> f64,
    limit: Option<usize>,
) -> Vec<SeriesPoint> {
    let mut keyed: Vec<(f64, &T)> = records.iter().map(|r| (key_of(r), r)).collect();
    keyed.sort_by(|a, b| b.0.total_cmp(&a.0));
    keyed
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|(value, r)| SeriesPoint::new(label_of(r), value))
        .collect()
}

/// Axis label ready for display. Power-of-two bounds keep their exponent
/// apart so the renderer can typeset it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayLabel {
    Text { text: String },
    PowerOfTwo { prefix: String, exponent: u32 },
}

impl DisplayLabel {
    pub fn has_exponent(&self) -> bool {
        matches!(self, DisplayLabel::PowerOfTwo { .. })
    }

    /// `513-2^10`
    pub fn plain(&self) -> String {
        match self {
            DisplayLabel::Text { text } => text.clone(),
            DisplayLabel::PowerOfTwo { prefix, exponent } => format!("{}2^{}", prefix, exponent),
        }
    }

    /// `513-2^{10}`
    pub fn latex(&self) -> String {
        match self {
            DisplayLabel::Text { text } => text.clone(),
            DisplayLabel::PowerOfTwo { prefix, exponent } => format!("{}2^{{{}}}", prefix, exponent),
        }
    }

    /// `513-2¹⁰`
    pub fn unicode(&self) -> String {
        match self {
            DisplayLabel::Text { text } => text.clone(),
            DisplayLabel::PowerOfTwo { prefix, exponent } => {
                format!("{}2{}", prefix, superscript(*exponent))
            }
        }
    }
}

impl fmt::Display for DisplayLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.unicode())
    }
}

/// `"513-2^{10}"` and `"> 2^{10}"` become [`DisplayLabel::PowerOfTwo`];
/// anything else (`"2-3"`, `"51+"`, `"<1"`, garbage) passes through.
pub fn build_tick_label(range_label: &str) -> DisplayLabel {
    match split_power_suffix(range_label) {
        Some(token) => DisplayLabel::PowerOfTwo {
            prefix: token.prefix.to_string(),
            exponent: token.exponent,
        },
        None => DisplayLabel::Text {
            text: range_label.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_of_zero_total_is_zero() {
        assert_eq!(percent_of_total(5, 0), 0.0);
        assert_eq!(percent_of_total(0, 0), 0.0);
        assert!((percent_of_total(1, 4) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn currency_giga() {
        assert_eq!(format_currency(7_143_895_811, CurrencyUnit::GigaEuro), "\u{20AC}7.14B");
        assert_eq!(format_currency(417_174_489, CurrencyUnit::MegaEuro), "\u{20AC}417.17M");
        assert_eq!(format_currency(1_234, CurrencyUnit::Euro), "\u{20AC}1234");
        assert_eq!(format_currency(0, CurrencyUnit::KiloEuro), "\u{20AC}0.00K");
    }

    #[test]
    fn currency_rounds_half_to_even() {
        // 1.125 -> 1.12, 1.135 -> 1.14
        assert_eq!(scale_fixed(1_125, 1_000, 2), "1.12");
        assert_eq!(scale_fixed(1_135, 1_000, 2), "1.14");
        assert_eq!(scale_fixed(1_126, 1_000, 2), "1.13");
        assert_eq!(scale_fixed(2_500, 1_000, 0), "2");
        assert_eq!(scale_fixed(3_500, 1_000, 0), "4");
    }

    #[test]
    fn currency_tick_and_long() {
        assert_eq!(format_currency_tick(7_143_895_811, CurrencyUnit::GigaEuro), "\u{20AC}7B");
        assert_eq!(
            format_currency_long(5_005_580_743, CurrencyUnit::GigaEuro),
            "\u{20AC}5.01 billion"
        );
    }

    #[test]
    fn grouped_numbers() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(751_350), "751,350");
        assert_eq!(group_thousands(1_000_000), "1,000,000");
        assert_eq!(format_metric_value(27224.0), "27,224");
        assert_eq!(format_metric_value(56.48), "56.48");
        assert_eq!(format_metric_value(0.00152), "0.001520");
        assert_eq!(format_metric_value(f64::NAN), "");
    }

    #[test]
    fn ranking_is_stable_and_idempotent() {
        let rows = vec![("a", 3.0), ("b", 5.0), ("c", 3.0), ("d", 1.0)];
        let once = build_ranking_series(&rows, |r| r.0.to_string(), |r| r.1, Some(3));
        let labels: Vec<_> = once.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["b", "a", "c"]);
        let twice = build_ranking_series(&once, |p| p.label.clone(), |p| p.value, Some(3));
        assert_eq!(once, twice);
    }

    #[test]
    fn tick_labels() {
        let label = build_tick_label("513-2^{10}");
        assert_eq!(
            label,
            DisplayLabel::PowerOfTwo { prefix: "513-".into(), exponent: 10 }
        );
        assert_eq!(label.latex(), "513-2^{10}");
        assert_eq!(label.unicode(), "513-2\u{00B9}\u{2070}");
        assert_eq!(build_tick_label("> 2^7").plain(), "> 2^7");
        assert!(build_tick_label("65-2\u{2077}").has_exponent());
        assert_eq!(build_tick_label("2-3"), DisplayLabel::Text { text: "2-3".into() });
        assert_eq!(build_tick_label(""), DisplayLabel::Text { text: String::new() });
        assert!(!build_tick_label("2^x").has_exponent());
    }

    #[test]
    fn short_labels() {
        assert_eq!(short_label("Higher Education (HES)"), "Higher");
        assert_eq!(short_label(""), "");
    }
}
