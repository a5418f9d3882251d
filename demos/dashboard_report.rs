use qr_order_analytics::{
    DashboardConfig, DashboardProcessor, DatasetCache, FilterCriteria, FilterOptions,
};
use std::env;
use std::process;

fn main() {
    let mut args = env::args().skip(1);
    let path = args
        .next()
        .unwrap_or_else(|| "Assurance_Commandes_QR.csv".to_string());
    let company = args.next();

    let config = DashboardConfig::default();
    let mut cache = DatasetCache::new(config.loader.clone());

    let dataset = match cache.load(&path) {
        Ok(dataset) => dataset,
        Err(e) => {
            eprintln!("Unable to load order data: {}", e);
            process::exit(1);
        }
    };

    let options = FilterOptions::from_records(&dataset.records);
    let mut criteria = FilterCriteria::full_range(&options);
    if let Some(company) = company {
        criteria = criteria.with_company(company);
    }

    let processor = DashboardProcessor::new(config).expect("default configuration is valid");
    let report = processor
        .build(&dataset, &criteria)
        .expect("criteria built from dataset options are valid");

    println!("{}", report.to_markdown());

    println!("Monthly evolution:");
    for series in &report.charts.monthly_evolution.series {
        for point in &series.points {
            println!(" - {}: {:.2}", point.label, point.value);
        }
    }

    println!(
        "\n{} rows read, {} dropped for missing critical fields",
        dataset.rows_read, dataset.dropped_rows
    );
}
