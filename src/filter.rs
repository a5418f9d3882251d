use crate::error::{QrAnalyticsError, Result};
use crate::schema::{FilterCriteria, OrderRecord};
use crate::utils::month_name;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Criteria spanning the whole dataset date range with no other constraint.
    pub fn full_range(options: &FilterOptions) -> Self {
        Self {
            date_start: options.date_min,
            date_end: options.date_max,
            ..Self::default()
        }
    }

    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_start = Some(start);
        self.date_end = Some(end);
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    pub fn with_month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(month) = self.month {
            if !(1..=12).contains(&month) {
                return Err(QrAnalyticsError::InvalidFilter(format!(
                    "month {} must be between 1 and 12",
                    month
                )));
            }
        }
        Ok(())
    }

    pub fn matches(&self, record: &OrderRecord) -> bool {
        if let Some(start) = self.date_start {
            if record.validation_date < start {
                return false;
            }
        }
        if let Some(end) = self.date_end {
            if record.validation_date > end {
                return false;
            }
        }
        if let Some(company) = &self.company {
            if &record.company != company {
                return false;
            }
        }
        if let Some(month) = self.month {
            if record.month() != month {
                return false;
            }
        }
        if let Some(year) = self.year {
            if record.year() != year {
                return false;
            }
        }
        true
    }
}

/// Keeps the records matching every constraint, in their original order.
pub fn filter_records(records: &[OrderRecord], criteria: &FilterCriteria) -> Vec<OrderRecord> {
    records
        .iter()
        .filter(|r| criteria.matches(r))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthOption {
    pub month: u32,
    pub name: String,
}

/// The choices a host UI can offer for each filter dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub date_min: Option<NaiveDate>,
    pub date_max: Option<NaiveDate>,
    pub companies: Vec<String>,
    pub months: Vec<MonthOption>,
    pub years: Vec<i32>,
}

impl FilterOptions {
    pub fn from_records(records: &[OrderRecord]) -> Self {
        let date_min = records.iter().map(|r| r.validation_date).min();
        let date_max = records.iter().map(|r| r.validation_date).max();

        let companies: BTreeSet<&str> = records.iter().map(|r| r.company.as_str()).collect();
        let years: BTreeSet<i32> = records.iter().map(|r| r.year()).collect();

        let months = (1..=12)
            .filter_map(|m| {
                month_name(m).map(|name| MonthOption {
                    month: m,
                    name: name.to_string(),
                })
            })
            .collect();

        Self {
            date_min,
            date_max,
            companies: companies.into_iter().map(str::to_string).collect(),
            months,
            years: years.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_records() -> Vec<OrderRecord> {
        vec![
            OrderRecord::new(date(2024, 1, 10), None, "A", 5, 100.0),
            OrderRecord::new(date(2024, 2, 5), None, "B", 15, 300.0),
            OrderRecord::new(date(2023, 2, 20), None, "A", 2, 50.0),
            OrderRecord::new(date(2024, 1, 31), None, "C", 1, 10.0),
        ]
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let records = sample_records();
        let criteria = FilterCriteria::new().with_date_range(date(2024, 1, 10), date(2024, 1, 31));
        let filtered = filter_records(&records, &criteria);

        let companies: Vec<&str> = filtered.iter().map(|r| r.company.as_str()).collect();
        assert_eq!(companies, vec!["A", "C"]);
    }

    #[test]
    fn test_no_constraints_keeps_everything_in_order() {
        let records = sample_records();
        let filtered = filter_records(&records, &FilterCriteria::default());
        assert_eq!(filtered, records);
    }

    #[test]
    fn test_company_month_year_conjunction() {
        let records = sample_records();

        let by_company = filter_records(&records, &FilterCriteria::new().with_company("A"));
        assert_eq!(by_company.len(), 2);

        let by_month = filter_records(&records, &FilterCriteria::new().with_month(2));
        assert_eq!(by_month.len(), 2);

        let combined = filter_records(
            &records,
            &FilterCriteria::new().with_company("A").with_month(2).with_year(2023),
        );
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].amount, 50.0);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let records = sample_records();
        let criteria = FilterCriteria::new()
            .with_date_range(date(2023, 1, 1), date(2024, 1, 31))
            .with_company("A");

        let once = filter_records(&records, &criteria);
        let twice = filter_records(&once, &criteria);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let records = sample_records();
        let filtered = filter_records(&records, &FilterCriteria::new().with_company("Z"));
        assert!(filtered.is_empty());

        let reversed = FilterCriteria::new().with_date_range(date(2024, 2, 1), date(2024, 1, 1));
        assert!(reversed.validate().is_ok());
        assert!(filter_records(&records, &reversed).is_empty());

        assert!(filter_records(&[], &FilterCriteria::default()).is_empty());
    }

    #[test]
    fn test_invalid_month_rejected() {
        assert!(FilterCriteria::new().with_month(13).validate().is_err());
        assert!(FilterCriteria::new().with_month(0).validate().is_err());
        assert!(FilterCriteria::new().with_month(12).validate().is_ok());
    }

    #[test]
    fn test_filter_options_from_records() {
        let options = FilterOptions::from_records(&sample_records());
        assert_eq!(options.date_min, Some(date(2023, 2, 20)));
        assert_eq!(options.date_max, Some(date(2024, 2, 5)));
        assert_eq!(options.companies, vec!["A", "B", "C"]);
        assert_eq!(options.years, vec![2023, 2024]);
        assert_eq!(options.months.len(), 12);
        assert_eq!(options.months[0].name, "January");

        let criteria = FilterCriteria::full_range(&options);
        assert_eq!(criteria.date_start, Some(date(2023, 2, 20)));
        assert!(criteria.company.is_none());
    }
}
