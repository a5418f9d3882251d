use crate::aggregation::{
    aggregate_by, company_trend, global_share, period_variation, top_n, totals, year_variation,
    GroupBy, Variation,
};
use crate::cache::DatasetCache;
use crate::error::{QrAnalyticsError, Result};
use crate::filter::{filter_records, FilterOptions};
use crate::ingestion::Dataset;
use crate::kpi::KpiCard;
use crate::schema::{AggregateRow, DashboardConfig, FilterCriteria, GroupKey, OrderRecord};
use crate::utils::round_to;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySummaryRow {
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Total QR")]
    pub total_qr: u64,
    #[serde(rename = "Total amount")]
    pub amount: f64,
    #[serde(rename = "Market share (%)")]
    pub share: f64,
}

/// Per-company totals, highest amount first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanySummary {
    pub rows: Vec<CompanySummaryRow>,
}

impl CompanySummary {
    pub fn from_aggregates(rows: &[AggregateRow]) -> Self {
        let rows = rows
            .iter()
            .filter_map(|row| match &row.key {
                GroupKey::Company { company } => Some(CompanySummaryRow {
                    company: company.clone(),
                    total_qr: row.qr_count,
                    amount: round_to(row.amount, 2),
                    share: row.share,
                }),
                _ => None,
            })
            .collect();
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.rows)?)
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        if self.rows.is_empty() {
            writer.write_record(["Company", "Total QR", "Total amount", "Market share (%)"])?;
        }
        for row in &self.rows {
            writer.serialize(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| {
                QrAnalyticsError::IoError(std::io::Error::new(
                    e.error().kind(),
                    e.error().to_string(),
                ))
            })?;
        String::from_utf8(bytes).map_err(|e| {
            QrAnalyticsError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();
        output.push_str("| Company | Total QR | Total amount | Market share (%) |\n");
        output.push_str("|---|---:|---:|---:|\n");
        for row in &self.rows {
            output.push_str(&format!(
                "| {} | {} | {:.2} | {:.2} |\n",
                row.company, row.total_qr, row.amount, row.share
            ));
        }
        output
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub title: String,
    pub kind: ChartKind,
    pub series: Vec<Series>,
}

impl Chart {
    fn single(title: impl Into<String>, kind: ChartKind, name: &str, points: Vec<SeriesPoint>) -> Self {
        let series = if points.is_empty() {
            Vec::new()
        } else {
            vec![Series {
                name: name.to_string(),
                points,
            }]
        };
        Self {
            title: title.into(),
            kind,
            series,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardCharts {
    pub amount_by_company: Chart,
    pub monthly_evolution: Chart,
    pub qr_distribution: Chart,
    pub market_share: Chart,
    pub company_trend: Chart,
}

/// Everything the host needs to render one state of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    pub criteria: FilterCriteria,
    pub options: FilterOptions,
    pub record_count: usize,
    pub total_qr: u64,
    pub total_amount: f64,
    pub monthly_variation: Variation,
    pub yearly_variation: Variation,
    pub global_share: f64,
    pub kpis: Vec<KpiCard>,
    pub company_summary: CompanySummary,
    pub charts: DashboardCharts,
}

impl DashboardReport {
    /// True when the filters matched nothing; hosts show a "no data" state.
    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();
        output.push_str("# QR Order Dashboard\n\n");

        match (self.criteria.date_start, self.criteria.date_end) {
            (Some(start), Some(end)) => {
                output.push_str(&format!("**Period:** {} to {}\n\n", start, end));
            }
            (Some(start), None) => output.push_str(&format!("**Period:** from {}\n\n", start)),
            (None, Some(end)) => output.push_str(&format!("**Period:** until {}\n\n", end)),
            (None, None) => {}
        }

        output.push_str("## Key Performance Indicators\n\n");
        for card in &self.kpis {
            output.push_str(&format!(
                "- **{}:** {} ({})\n",
                card.title, card.formatted_value, card.change_text
            ));
        }
        output.push('\n');

        output.push_str("## Summary by Company\n\n");
        if self.is_empty() {
            output.push_str("_No data available for the selected filters._\n");
        } else {
            output.push_str(&self.company_summary.to_markdown());
        }

        output
    }
}

pub struct DashboardProcessor {
    config: DashboardConfig,
}

impl DashboardProcessor {
    pub fn new(config: DashboardConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Runs one full recomputation pass: filter, aggregate, format.
    pub fn build(&self, dataset: &Dataset, criteria: &FilterCriteria) -> Result<DashboardReport> {
        criteria.validate()?;

        let filtered = filter_records(&dataset.records, criteria);
        info!(
            "Building dashboard for {} of {} order records",
            filtered.len(),
            dataset.len()
        );
        if filtered.is_empty() {
            debug!("No order records match {:?}", criteria);
        }

        let sums = totals(&filtered);
        let monthly = period_variation(&filtered);
        let yearly = year_variation(&filtered);
        let share_of_global = global_share(sums.amount, dataset.total_amount());

        let kpis = vec![
            KpiCard::new(
                "Total QR orders",
                sums.qr_count as f64,
                monthly.qr_count,
                "this month",
            ),
            KpiCard::new("Total amount", sums.amount, monthly.amount, "this month"),
            KpiCard::new("Monthly variation (%)", monthly.amount, monthly.amount, ""),
            KpiCard::new("Annual variation (%)", yearly.amount, yearly.amount, ""),
            KpiCard::new(
                "Share of global total (%)",
                share_of_global,
                share_of_global,
                "",
            ),
        ];

        let by_company = aggregate_by(&filtered, GroupBy::Company);
        let company_summary = CompanySummary::from_aggregates(&by_company);
        let charts = self.build_charts(&filtered, &by_company);

        Ok(DashboardReport {
            criteria: criteria.clone(),
            options: FilterOptions::from_records(&dataset.records),
            record_count: filtered.len(),
            total_qr: sums.qr_count,
            total_amount: sums.amount,
            monthly_variation: monthly,
            yearly_variation: yearly,
            global_share: share_of_global,
            kpis,
            company_summary,
            charts,
        })
    }

    /// Loads `path` through `cache` and builds the report for it.
    pub fn build_from_source(
        &self,
        cache: &mut DatasetCache,
        path: impl AsRef<Path>,
        criteria: &FilterCriteria,
    ) -> Result<DashboardReport> {
        let dataset = cache.load(path)?;
        self.build(&dataset, criteria)
    }

    fn build_charts(
        &self,
        filtered: &[OrderRecord],
        by_company: &[AggregateRow],
    ) -> DashboardCharts {
        let company_points = |n: usize, value: fn(&AggregateRow) -> f64| -> Vec<SeriesPoint> {
            top_n(by_company, n)
                .iter()
                .map(|row| SeriesPoint {
                    label: row.key.label(),
                    value: value(row),
                })
                .collect()
        };

        let amount_points = company_points(self.config.top_companies_bar, |row| {
            round_to(row.amount, 2)
        });
        let pie_points = company_points(self.config.top_companies_pie, |row| row.qr_count as f64);
        let share_points = company_points(self.config.top_companies_share, |row| row.share);

        let monthly_points = aggregate_by(filtered, GroupBy::Period)
            .into_iter()
            .map(|row| SeriesPoint {
                label: row.key.label(),
                value: row.amount,
            })
            .collect();

        let top_companies: Vec<String> = top_n(by_company, self.config.top_companies_trend)
            .iter()
            .filter_map(|row| row.key.company().map(str::to_string))
            .collect();
        let trend = company_trend(filtered, &top_companies);
        let trend_series = top_companies
            .iter()
            .map(|company| Series {
                name: company.clone(),
                points: trend
                    .iter()
                    .filter(|(_, c, _)| c == company)
                    .map(|(period, _, amount)| SeriesPoint {
                        label: period.to_string(),
                        value: *amount,
                    })
                    .collect(),
            })
            .collect();

        DashboardCharts {
            amount_by_company: Chart::single(
                format!("Top {} companies by amount", self.config.top_companies_bar),
                ChartKind::Bar,
                "Total amount",
                amount_points,
            ),
            monthly_evolution: Chart::single(
                "Monthly amount evolution",
                ChartKind::Line,
                "Total amount",
                monthly_points,
            ),
            qr_distribution: Chart::single(
                "QR order distribution",
                ChartKind::Pie,
                "Total QR",
                pie_points,
            ),
            market_share: Chart::single(
                "Market share by company",
                ChartKind::Bar,
                "Market share (%)",
                share_points,
            ),
            company_trend: Chart {
                title: format!(
                    "Amount trend by company (Top {})",
                    self.config.top_companies_trend
                ),
                kind: ChartKind::Line,
                series: trend_series,
            },
        }
    }
}

impl Default for DashboardProcessor {
    fn default() -> Self {
        Self {
            config: DashboardConfig::default(),
        }
    }
}
