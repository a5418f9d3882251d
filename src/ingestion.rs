use crate::error::{QrAnalyticsError, Result};
use crate::schema::{LoaderConfig, OrderRecord};
use crate::utils::{parse_count, parse_date, parse_number};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

pub const COL_VALIDATION_DATE: &str = "DateValidation";
pub const COL_ORDER_DATE: &str = "DateCmde";
pub const COL_QR_COUNT: &str = "NbQR";
pub const COL_AMOUNT: &str = "cmd_montant";
pub const COL_COMPANY: &str = "Compagnie";

pub const REQUIRED_COLUMNS: [&str; 5] = [
    COL_VALIDATION_DATE,
    COL_ORDER_DATE,
    COL_QR_COUNT,
    COL_AMOUNT,
    COL_COMPANY,
];

/// A row exactly as it appears in the source table, before any parsing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOrderRow {
    #[serde(rename = "DateValidation", default)]
    pub validation_date: Option<String>,
    #[serde(rename = "DateCmde", default)]
    pub order_date: Option<String>,
    #[serde(rename = "NbQR", default)]
    pub qr_count: Option<String>,
    #[serde(rename = "cmd_montant", default)]
    pub amount: Option<String>,
    #[serde(rename = "Compagnie", default)]
    pub company: Option<String>,
}

impl RawOrderRow {
    /// Converts the raw cells into a record. Returns `None` when a critical
    /// field (validation date, QR count, amount) is missing or unreadable.
    pub fn into_record(self, date_format: &str) -> Option<OrderRecord> {
        let validation_date = parse_date(self.validation_date.as_deref()?, date_format)?;
        let qr_count = parse_count(self.qr_count.as_deref()?)?;
        let amount = parse_number(self.amount.as_deref()?)?;
        let order_date = self
            .order_date
            .as_deref()
            .and_then(|raw| parse_date(raw, date_format));
        let company = self.company.as_deref().unwrap_or_default().trim().to_string();

        Some(OrderRecord::new(
            validation_date,
            order_date,
            company,
            qr_count,
            amount,
        ))
    }
}

/// Validated order records together with what the loader saw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub source: Option<PathBuf>,
    pub records: Vec<OrderRecord>,
    pub rows_read: usize,
    pub dropped_rows: usize,
}

impl Dataset {
    pub fn from_records(records: Vec<OrderRecord>) -> Self {
        let rows_read = records.len();
        Self {
            source: None,
            records,
            rows_read,
            dropped_rows: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_amount(&self) -> f64 {
        self.records.iter().map(|r| r.amount).sum()
    }
}

pub fn load_orders(path: impl AsRef<Path>) -> Result<Dataset> {
    load_orders_with_config(path, &LoaderConfig::default())
}

pub fn load_orders_with_config(path: impl AsRef<Path>, config: &LoaderConfig) -> Result<Dataset> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| QrAnalyticsError::LoadError {
        path: path.display().to_string(),
        details: e.to_string(),
    })?;

    let mut dataset = load_orders_from_reader(file, config).map_err(|e| match e {
        QrAnalyticsError::Csv(inner) => QrAnalyticsError::LoadError {
            path: path.display().to_string(),
            details: inner.to_string(),
        },
        other => other,
    })?;
    dataset.source = Some(path.to_path_buf());

    info!(
        "Loaded {} order records from {} ({} rows dropped)",
        dataset.len(),
        path.display(),
        dataset.dropped_rows
    );

    Ok(dataset)
}

pub fn load_orders_from_reader<R: Read>(reader: R, config: &LoaderConfig) -> Result<Dataset> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(config.delimiter_byte()?)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(QrAnalyticsError::MissingColumn(column.to_string()));
        }
    }

    let mut records = Vec::new();
    let mut rows_read = 0;
    let mut dropped_rows = 0;

    for (line_idx, row) in csv_reader.deserialize::<RawOrderRow>().enumerate() {
        let row = row?;
        rows_read += 1;

        match row.into_record(&config.date_format) {
            Some(record) => records.push(record),
            None => {
                dropped_rows += 1;
                debug!(
                    "Dropping row at line {}: missing validation date, QR count or amount",
                    line_idx + 2
                );
            }
        }
    }

    Ok(Dataset {
        source: None,
        records,
        rows_read,
        dropped_rows,
    })
}
