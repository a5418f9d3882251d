use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn from_variation(variation: f64) -> Self {
        if variation > 0.0 {
            Trend::Up
        } else if variation < 0.0 {
            Trend::Down
        } else {
            Trend::Flat
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            Trend::Up => "↑",
            Trend::Down => "↓",
            Trend::Flat => "→",
        }
    }

    pub fn style_class(&self) -> StyleClass {
        match self {
            Trend::Up => StyleClass::Positive,
            Trend::Down => StyleClass::Negative,
            Trend::Flat => StyleClass::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleClass {
    Positive,
    Negative,
    Neutral,
}

impl StyleClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleClass::Positive => "positive",
            StyleClass::Negative => "negative",
            StyleClass::Neutral => "neutral",
        }
    }
}

/// Display-ready content of one KPI card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiCard {
    pub title: String,
    /// Raw value, kept for hosts that do their own formatting
    pub value: f64,
    pub formatted_value: String,
    pub variation: f64,
    pub trend: Trend,
    pub style: StyleClass,
    /// e.g. "↑ 12.5% this month"
    pub change_text: String,
}

impl KpiCard {
    pub fn new(title: impl Into<String>, value: f64, variation: f64, change_label: &str) -> Self {
        let trend = Trend::from_variation(variation);
        let mut change_text = format!("{} {:.1}%", trend.arrow(), variation.abs());
        if !change_label.is_empty() {
            change_text.push(' ');
            change_text.push_str(change_label);
        }

        Self {
            title: title.into(),
            value,
            formatted_value: format_thousands(value),
            variation,
            trend,
            style: trend.style_class(),
            change_text,
        }
    }
}

/// Rounds to a whole number (ties to even) and groups thousands with commas
/// (`1234567.8` → `"1,234,568"`).
pub fn format_thousands(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let digits = format!("{:.0}", value.abs());
    if digits.bytes().all(|b| b == b'0') {
        return "0".to_string();
    }

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0.0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
