use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::info;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{ExportError, GlobalKpis, SaleRecord};
use crate::program::ReportBundle;

/// Number of most recent sales written to the detail file.
pub const DETAIL_ROWS: usize = 100;

pub const SUMMARY_FILE: &str = "summary.json";
pub const OUTLETS_FILE: &str = "outlets.csv";
pub const PERIODS_FILE: &str = "periods.csv";
pub const PRODUCTS_FILE: &str = "products.csv";
pub const CITIES_FILE: &str = "cities.csv";
pub const DETAIL_FILE: &str = "sales_detail.csv";

/// Writes a report bundle as one JSON summary and five CSV tables.
#[derive(Debug, Clone)]
pub struct CsvReportWriter {
    out_dir: PathBuf,
}

#[derive(Serialize)]
struct Summary<'a> {
    source: &'a str,
    skipped_records: usize,
    #[serde(flatten)]
    kpis: &'a GlobalKpis,
}

#[derive(Serialize)]
struct SaleDetailRow<'a> {
    sale_id: i64,
    sold_at: NaiveDateTime,
    year: i32,
    month: u32,
    period: &'a str,
    customer_name: &'a str,
    customer_email: Option<&'a str>,
    customer_city: &'a str,
    customer_age: Option<u32>,
    outlet_name: &'a str,
    outlet_city: &'a str,
    outlet_region: &'a str,
    product: &'a str,
    quantity: Option<i32>,
    unit_price: Option<Decimal>,
    total_amount: Decimal,
}

impl<'a> From<&'a SaleRecord> for SaleDetailRow<'a> {
    fn from(record: &'a SaleRecord) -> Self {
        SaleDetailRow {
            sale_id: record.sale_id(),
            sold_at: record.sold_at(),
            year: record.period().year(),
            month: record.period().month(),
            period: record.period().label(),
            customer_name: record.customer_name(),
            customer_email: record.customer_email(),
            customer_city: record.customer_city(),
            customer_age: record.customer_age(),
            outlet_name: record.outlet_name(),
            outlet_city: record.outlet_city(),
            outlet_region: record.outlet_region(),
            product: record.product(),
            quantity: record.quantity(),
            unit_price: record.unit_price(),
            total_amount: record.total_amount(),
        }
    }
}

fn write_table<T, I>(path: &Path, rows: I) -> Result<(), ExportError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

impl CsvReportWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        CsvReportWriter {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn write_report(&self, bundle: &ReportBundle) -> Result<(), ExportError> {
        fs::create_dir_all(&self.out_dir)?;

        let summary = Summary {
            source: bundle.source_name(),
            skipped_records: bundle.skipped(),
            kpis: bundle.global(),
        };
        let mut file = BufWriter::new(File::create(self.out_dir.join(SUMMARY_FILE))?);
        serde_json::to_writer_pretty(&mut file, &summary)?;
        file.flush()?;

        write_table(&self.out_dir.join(OUTLETS_FILE), bundle.outlets())?;
        write_table(&self.out_dir.join(PERIODS_FILE), bundle.periods())?;
        write_table(&self.out_dir.join(PRODUCTS_FILE), bundle.products())?;
        write_table(&self.out_dir.join(CITIES_FILE), bundle.cities())?;
        write_table(
            &self.out_dir.join(DETAIL_FILE),
            bundle
                .latest_sales(DETAIL_ROWS)
                .iter()
                .map(SaleDetailRow::from),
        )?;

        info!("Report written to {}", self.out_dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::{RawSale, SourceBatch};

    fn bundle(sales: usize) -> ReportBundle {
        let records = (0..sales)
            .map(|i| {
                let raw = RawSale::builder()
                    .sale_id(i as i64)
                    .sold_at(
                        NaiveDate::from_ymd_opt(2024, 1 + (i % 12) as u32, 1)
                            .unwrap()
                            .and_hms_opt(8, 0, 0)
                            .unwrap(),
                    )
                    .customer_name(format!("Client {}", i % 7))
                    .customer_city(format!("City {}", i % 4))
                    .product(format!("Product {}", i % 13))
                    .outlet_name(format!("Outlet {}", i % 3))
                    .total_amount(dec!(9.99))
                    .build();
                SaleRecord::try_from(raw).unwrap()
            })
            .collect();
        ReportBundle::assemble("CSV", SourceBatch::new(records, 2))
    }

    fn count_rows(path: &Path) -> usize {
        csv::Reader::from_path(path).unwrap().records().count()
    }

    #[test]
    fn test_write_report_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CsvReportWriter::new(dir.path().join("out"));
        crate::io::ReportSink::write(&mut writer, &bundle(150)).unwrap();

        let out = writer.out_dir();
        assert_eq!(count_rows(&out.join(OUTLETS_FILE)), 3);
        assert_eq!(count_rows(&out.join(PERIODS_FILE)), 12);
        assert_eq!(count_rows(&out.join(PRODUCTS_FILE)), crate::engine::TOP_PRODUCTS);
        assert_eq!(count_rows(&out.join(CITIES_FILE)), 4);
        assert_eq!(count_rows(&out.join(DETAIL_FILE)), DETAIL_ROWS);

        let summary: serde_json::Value =
            serde_json::from_reader(File::open(out.join(SUMMARY_FILE)).unwrap()).unwrap();
        assert_eq!(summary["source"], "CSV");
        assert_eq!(summary["skipped_records"], 2);
        assert_eq!(summary["transactions"], 150);
        assert_eq!(summary["outlets"], 3);
    }

    #[test]
    fn test_write_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CsvReportWriter::new(dir.path());
        writer.write_report(&bundle(0)).unwrap();

        let summary: serde_json::Value =
            serde_json::from_reader(File::open(dir.path().join(SUMMARY_FILE)).unwrap()).unwrap();
        assert_eq!(summary["top_outlet"], crate::domain::NOT_AVAILABLE);
        assert!(summary["first_sale"].is_null());
        assert_eq!(count_rows(&dir.path().join(DETAIL_FILE)), 0);
        assert_eq!(count_rows(&dir.path().join(PRODUCTS_FILE)), 0);
    }
}
