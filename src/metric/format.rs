//! Display formatting for metric values.

use serde::{Deserialize, Serialize};

/// Placeholder shown when there is nothing to display
pub const PLACEHOLDER: &str = "-";

/// How a metric value is turned into label text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricDisplay {
    /// The value followed by its reported units
    #[default]
    Raw,
    /// A ratio rendered as a percentage (0.7 -> 70%)
    Percent,
}

const SUFFIXES: [(f64, &str); 4] = [(1.0, ""), (1e3, "K"), (1e6, "M"), (1e9, "B")];

/// Compact number formatting with K/M/B suffixes
#[derive(Debug, Clone, Copy)]
pub struct NumericFormatter {
    max_fraction_digits: usize,
}

impl Default for NumericFormatter {
    fn default() -> Self {
        Self {
            max_fraction_digits: 2,
        }
    }
}

impl NumericFormatter {
    /// Formatter keeping at most `max_fraction_digits` decimals
    pub fn new(max_fraction_digits: usize) -> Self {
        Self {
            max_fraction_digits,
        }
    }

    /// Format a number, trimming trailing zeros
    pub fn format(&self, value: f64) -> String {
        if !value.is_finite() {
            return PLACEHOLDER.to_string();
        }

        let mut tier = SUFFIXES
            .iter()
            .rposition(|(scale, _)| value.abs() >= *scale)
            .unwrap_or(0);
        loop {
            let (scale, suffix) = SUFFIXES[tier];
            let mut text = self.fixed(value / scale);
            // Rounding can carry into the next suffix: 999.999 is "1K", not "1000"
            let carried = text.parse::<f64>().is_ok_and(|rounded| rounded.abs() >= 1000.0);
            if carried && tier + 1 < SUFFIXES.len() {
                tier += 1;
                continue;
            }
            text.push_str(suffix);
            return text;
        }
    }

    fn fixed(&self, value: f64) -> String {
        let mut text = format!("{:.*}", self.max_fraction_digits, value);
        if text.contains('.') {
            let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
            text.truncate(trimmed);
        }
        if text == "-0" {
            text = "0".to_string();
        }
        text
    }

    /// Format a metric value according to its display mode. Values that are
    /// not finite render as the bare placeholder, without units.
    pub fn format_metric(&self, value: f64, units: Option<&str>, display: MetricDisplay) -> String {
        if !value.is_finite() {
            return PLACEHOLDER.to_string();
        }
        match display {
            MetricDisplay::Raw => format!("{}{}", self.format(value), units.unwrap_or("")),
            MetricDisplay::Percent => format!("{}%", self.format(value * 100.0)),
        }
    }
}

/// Text for an optional value; absent or literal `null` values render as the
/// placeholder.
pub fn display_string(provided: Option<&str>) -> String {
    match provided {
        None | Some("null") => PLACEHOLDER.to_string(),
        Some(text) => text.to_string(),
    }
}
