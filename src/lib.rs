//! # QR Order Analytics
//!
//! A library for turning a table of QR order records into the figures of a
//! reporting dashboard: KPI cards, a per-company summary and chart series.
//!
//! ## Core Concepts
//!
//! - **Order Record**: one validated row (validation date, order date, company, QR count, amount)
//! - **Period**: a (year, month) bucket derived from the validation date
//! - **Filter Criteria**: optional constraints on date range, company, month and year
//! - **Aggregate Row**: summed QR count and amount for a company, a period, or both
//! - **Variation**: percentage change between the two most recent months or years
//!
//! Rendering is left to the host. Everything this crate returns is plain,
//! serializable data.
//!
//! ## Example
//!
//! ```rust,ignore
//! use qr_order_analytics::*;
//! use chrono::NaiveDate;
//!
//! let mut cache = DatasetCache::default();
//! let dataset = cache.load("Assurance_Commandes_QR.csv")?;
//!
//! let options = FilterOptions::from_records(&dataset.records);
//! let criteria = FilterCriteria::full_range(&options).with_company("ACME");
//!
//! let report = build_dashboard(&dataset, &criteria)?;
//! for card in &report.kpis {
//!     println!("{}: {} ({})", card.title, card.formatted_value, card.change_text);
//! }
//! ```

pub mod aggregation;
pub mod cache;
pub mod error;
pub mod filter;
pub mod ingestion;
pub mod kpi;
pub mod report;
pub mod schema;
pub mod utils;

pub use aggregation::{
    aggregate_by, calculate_variation, company_trend, global_share, period_variation,
    share_of_total, top_n, totals, year_variation, GroupBy, Totals, Variation,
};
pub use cache::{DatasetCache, SourceFingerprint};
pub use error::{QrAnalyticsError, Result};
pub use filter::{filter_records, FilterOptions, MonthOption};
pub use ingestion::*;
pub use kpi::{format_thousands, KpiCard, StyleClass, Trend};
pub use report::*;
pub use schema::*;
pub use utils::*;

use log::info;
use std::path::Path;

/// Builds the dashboard for an already loaded dataset with the default configuration.
pub fn build_dashboard(dataset: &Dataset, criteria: &FilterCriteria) -> Result<DashboardReport> {
    DashboardProcessor::default().build(dataset, criteria)
}

/// Loads `path` and builds the dashboard over its full date range.
pub fn build_dashboard_from_file(
    path: impl AsRef<Path>,
    config: &DashboardConfig,
) -> Result<DashboardReport> {
    let processor = DashboardProcessor::new(config.clone())?;
    let dataset = load_orders_with_config(path.as_ref(), &config.loader)?;

    info!(
        "Building default dashboard for {}",
        path.as_ref().display()
    );

    let options = FilterOptions::from_records(&dataset.records);
    processor.build(&dataset, &FilterCriteria::full_range(&options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_end_to_end_from_reader() {
        let csv = "\
DateValidation;DateCmde;NbQR;cmd_montant;Compagnie
10/01/2024;05/01/2024;10;100.00;Alpha
20/01/2024;18/01/2024;4;40.00;Beta
03/02/2024;01/02/2024;15;150.00;Alpha
bad;01/02/2024;1;1.00;Beta
";
        let dataset = load_orders_from_reader(csv.as_bytes(), &LoaderConfig::default()).unwrap();
        assert_eq!(dataset.dropped_rows, 1);

        let options = FilterOptions::from_records(&dataset.records);
        let criteria = FilterCriteria::full_range(&options);
        assert_eq!(criteria.date_start, Some(date(2024, 1, 10)));
        assert_eq!(criteria.date_end, Some(date(2024, 2, 3)));

        let report = build_dashboard(&dataset, &criteria).unwrap();
        assert_eq!(report.record_count, 3);
        assert_eq!(report.total_qr, 29);
        assert!((report.total_amount - 290.0).abs() < 1e-9);

        // February 150 vs January 140.
        let expected = (150.0 - 140.0) / 140.0 * 100.0;
        assert!((report.monthly_variation.amount - expected).abs() < 1e-9);

        assert_eq!(report.company_summary.rows[0].company, "Alpha");
        assert_eq!(report.company_summary.rows[0].amount, 250.0);
    }

    #[test]
    fn test_monthly_variation_example() {
        let dataset = Dataset::from_records(vec![
            OrderRecord::new(date(2024, 1, 15), None, "A", 1, 100.0),
            OrderRecord::new(date(2024, 2, 15), None, "A", 1, 150.0),
        ]);
        let report = build_dashboard(&dataset, &FilterCriteria::default()).unwrap();
        assert!((report.monthly_variation.amount - 50.0).abs() < 1e-9);
        assert_eq!(report.kpis[2].formatted_value, "50");
        assert_eq!(report.kpis[2].trend, Trend::Up);
    }
}
