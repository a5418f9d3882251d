use crate::error::{QrAnalyticsError, Result};
use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A (year, month) bucket derived from a validation date.
///
/// Field order makes the derived `Ord` chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeriodKey {
    pub year: i32,
    pub month: u32,
}

impl PeriodKey {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(QrAnalyticsError::InvalidPeriod(format!(
                "{:04}-{:02}",
                year, month
            )));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for PeriodKey {
    type Err = QrAnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let (year, month) = trimmed
            .split_once('-')
            .ok_or_else(|| QrAnalyticsError::InvalidPeriod(trimmed.to_string()))?;

        let year: i32 = year
            .parse()
            .map_err(|_| QrAnalyticsError::InvalidPeriod(trimmed.to_string()))?;
        let month: u32 = month
            .parse()
            .map_err(|_| QrAnalyticsError::InvalidPeriod(trimmed.to_string()))?;

        Self::new(year, month).map_err(|_| QrAnalyticsError::InvalidPeriod(trimmed.to_string()))
    }
}

impl TryFrom<String> for PeriodKey {
    type Error = QrAnalyticsError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PeriodKey> for String {
    fn from(period: PeriodKey) -> Self {
        period.to_string()
    }
}

/// One validated row of the QR order table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Date the order was validated; drives every time-based filter and grouping
    pub validation_date: NaiveDate,
    /// Date the order was placed, when the source provided a readable one
    pub order_date: Option<NaiveDate>,
    pub company: String,
    pub qr_count: u64,
    pub amount: f64,
    pub period: PeriodKey,
}

impl OrderRecord {
    pub fn new(
        validation_date: NaiveDate,
        order_date: Option<NaiveDate>,
        company: impl Into<String>,
        qr_count: u64,
        amount: f64,
    ) -> Self {
        Self {
            validation_date,
            order_date,
            company: company.into(),
            qr_count,
            amount,
            period: PeriodKey::from_date(validation_date),
        }
    }

    pub fn month(&self) -> u32 {
        self.period.month
    }

    pub fn year(&self) -> i32 {
        self.period.year
    }
}

/// User-selected constraints. A `None` field leaves that dimension unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FilterCriteria {
    #[serde(default)]
    #[schemars(description = "Inclusive lower bound on the validation date (YYYY-MM-DD). Omit for no lower bound.")]
    pub date_start: Option<NaiveDate>,

    #[serde(default)]
    #[schemars(description = "Inclusive upper bound on the validation date (YYYY-MM-DD). Omit for no upper bound.")]
    pub date_end: Option<NaiveDate>,

    #[serde(default)]
    #[schemars(description = "Exact company name to keep. Omit to include every company.")]
    pub company: Option<String>,

    #[serde(default)]
    #[schemars(description = "Calendar month of the validation date (1 = January, 12 = December). Omit to include every month.")]
    pub month: Option<u32>,

    #[serde(default)]
    #[schemars(description = "Calendar year of the validation date. Omit to include every year.")]
    pub year: Option<i32>,
}

impl FilterCriteria {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(FilterCriteria)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

/// The value a group of records was collected under.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupKey {
    Company { company: String },
    Period { period: PeriodKey },
    PeriodCompany { period: PeriodKey, company: String },
}

impl GroupKey {
    pub fn company(&self) -> Option<&str> {
        match self {
            GroupKey::Company { company } | GroupKey::PeriodCompany { company, .. } => {
                Some(company)
            }
            GroupKey::Period { .. } => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            GroupKey::Company { company } => company.clone(),
            GroupKey::Period { period } => period.to_string(),
            GroupKey::PeriodCompany { period, company } => format!("{} {}", period, company),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub key: GroupKey,
    pub qr_count: u64,
    pub amount: f64,
    /// Percentage of the result set's total amount, rounded to two decimals
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LoaderConfig {
    #[schemars(description = "Single-byte field delimiter of the source table. Defaults to ';'.")]
    pub delimiter: char,

    #[schemars(description = "chrono format string for both date columns. Defaults to '%d/%m/%Y'.")]
    pub date_format: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            delimiter: ';',
            date_format: "%d/%m/%Y".to_string(),
        }
    }
}

impl LoaderConfig {
    pub fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(QrAnalyticsError::ConfigError(format!(
                "delimiter '{}' is not a single ASCII character",
                self.delimiter
            )))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DashboardConfig {
    #[schemars(description = "How the source table is parsed")]
    pub loader: LoaderConfig,

    #[schemars(description = "Number of companies in the amount-by-company bar chart")]
    pub top_companies_bar: usize,

    #[schemars(description = "Number of companies in the QR distribution pie chart")]
    pub top_companies_pie: usize,

    #[schemars(description = "Number of companies in the market share bar chart")]
    pub top_companies_share: usize,

    #[schemars(description = "Number of companies drawn in the per-company trend chart")]
    pub top_companies_trend: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            loader: LoaderConfig::default(),
            top_companies_bar: 10,
            top_companies_pie: 8,
            top_companies_share: 10,
            top_companies_trend: 5,
        }
    }
}

impl DashboardConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        self.loader.delimiter_byte()?;

        if self.loader.date_format.trim().is_empty() {
            return Err(QrAnalyticsError::ConfigError(
                "date_format must not be empty".to_string(),
            ));
        }

        let limits = [
            ("top_companies_bar", self.top_companies_bar),
            ("top_companies_pie", self.top_companies_pie),
            ("top_companies_share", self.top_companies_share),
            ("top_companies_trend", self.top_companies_trend),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(QrAnalyticsError::ConfigError(format!(
                    "{} must be at least 1",
                    name
                )));
            }
        }

        Ok(())
    }
}
