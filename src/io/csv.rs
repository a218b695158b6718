use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use log::{info, warn};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::SalesSource;
use crate::domain::{MalformedRecord, RawSale, SaleRecord, SourceBatch, SourceError};

pub const CSV_SOURCE: &str = "CSV";

pub const REQUIRED_COLUMNS: [&str; 13] = [
    "id_vente",
    "date_vente",
    "nom_client",
    "ville_client",
    "email",
    "age",
    "nom_enseigne",
    "ville_enseigne",
    "region",
    "produit",
    "quantite",
    "prix_unitaire",
    "montant_total",
];

const DATE_TIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

/// Reads sales from a flat CSV export.
#[derive(Debug, Clone)]
pub struct CsvSalesSource {
    path: PathBuf,
}

impl CsvSalesSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvSalesSource { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SalesSource for CsvSalesSource {
    fn name(&self) -> &'static str {
        CSV_SOURCE
    }

    fn fetch(&mut self) -> Result<SourceBatch, SourceError> {
        let file = File::open(&self.path).map_err(|e| {
            SourceError::Unavailable(format!("cannot open {} - {}", self.path.display(), e))
        })?;
        let batch = read_sales(BufReader::new(file))?;
        info!(
            "Loaded {} sales from {} ({} skipped)",
            batch.records().len(),
            self.path.display(),
            batch.skipped()
        );
        Ok(batch)
    }
}

#[derive(Debug, Deserialize)]
struct CsvSaleRow {
    id_vente: Option<String>,
    date_vente: Option<String>,
    nom_client: Option<String>,
    ville_client: Option<String>,
    email: Option<String>,
    age: Option<String>,
    nom_enseigne: Option<String>,
    ville_enseigne: Option<String>,
    region: Option<String>,
    produit: Option<String>,
    quantite: Option<String>,
    prix_unitaire: Option<String>,
    montant_total: Option<String>,
}

impl CsvSaleRow {
    fn into_raw(
        self,
        sold_at: Option<NaiveDateTime>,
        line: usize,
    ) -> Result<RawSale, MalformedRecord> {
        Ok(RawSale {
            sale_id: parse_field("id_vente", self.id_vente)?,
            sold_at,
            customer_id: None,
            customer_name: self.nom_client,
            customer_city: self.ville_client,
            customer_email: self.email,
            customer_age: parse_lenient("age", self.age, line, |d| {
                whole(d).and_then(|d| d.to_u32())
            }),
            outlet_name: self.nom_enseigne,
            outlet_city: self.ville_enseigne,
            outlet_region: self.region,
            product: self.produit,
            quantity: parse_lenient("quantite", self.quantite, line, |d| {
                whole(d).and_then(|d| d.to_i32())
            }),
            unit_price: parse_lenient("prix_unitaire", self.prix_unitaire, line, Some),
            total_amount: parse_field("montant_total", self.montant_total)?,
        })
    }
}

fn parse_field<T: FromStr>(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<T>, MalformedRecord> {
    match value {
        None => Ok(None),
        Some(value) => match value.parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(MalformedRecord::InvalidValue { field, value }),
        },
    }
}

/// Spreadsheet tools often write whole numbers as `34.0`.
fn whole(value: Decimal) -> Option<Decimal> {
    value.fract().is_zero().then_some(value)
}

/// Parses a column the KPIs never read. A bad value is dropped, not the row.
fn parse_lenient<T>(
    field: &'static str,
    value: Option<String>,
    line: usize,
    convert: impl FnOnce(Decimal) -> Option<T>,
) -> Option<T> {
    let value = value?;
    let parsed = Decimal::from_str(&value).ok().and_then(convert);
    if parsed.is_none() {
        warn!("Ignoring {} {:?} on line {}", field, value, line);
    }
    parsed
}

/// Parses a sale date, accepting a calendar date with or without a time of day.
pub(crate) fn parse_sale_date(value: &str) -> Option<NaiveDateTime> {
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Reads and normalizes every sale of a CSV document.
///
/// Fails as a whole when a required column is missing from the header or when
/// a sale date is present but cannot be parsed. Rows with an empty date, or
/// with other invalid or missing required fields, are skipped and counted in
/// the returned batch. Age, quantity and unit price are read leniently: a value
/// that does not parse is logged and left empty.
pub fn read_sales<R: Read>(reader: R) -> Result<SourceBatch, SourceError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| SourceError::Query(format!("cannot read header - {}", e)))?
        .clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        return Err(SourceError::Query(format!(
            "missing required columns: {}",
            missing.join(", ")
        )));
    }

    let mut records = Vec::new();
    let mut skipped = 0;
    for (index, row) in rdr.deserialize::<CsvSaleRow>().enumerate() {
        // header is line 1
        let line = index + 2;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!("Skipping line {} - {}", line, e);
                skipped += 1;
                continue;
            }
        };
        let sold_at = match row.date_vente.as_deref().filter(|d| !d.is_empty()) {
            None => None,
            Some(date) => Some(parse_sale_date(date).ok_or_else(|| {
                SourceError::Query(format!("unparseable sale date {:?} on line {}", date, line))
            })?),
        };
        match row.into_raw(sold_at, line).and_then(SaleRecord::try_from) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!("Skipping line {} - {}", line, e);
                skipped += 1;
            }
        }
    }

    Ok(SourceBatch::new(records, skipped))
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    const HEADER: &str = "id_vente,date_vente,nom_client,ville_client,email,age,nom_enseigne,ville_enseigne,region,produit,quantite,prix_unitaire,montant_total\n";

    fn read(body: &str) -> Result<SourceBatch, SourceError> {
        read_sales(format!("{}{}", HEADER, body).as_bytes())
    }

    #[test]
    fn test_read_valid_rows() {
        let batch = read(
            "1,2024-01-05,Dupont Jean,Paris,jean@mail.fr,34,Carrefour,Paris,Ile-de-France,Cafe,2,3.50,7.00\n\
             2,2024-02-10 14:30:00,Durand Marie,Lyon,,,Auchan,Lyon,,The,1,4.20,4.20\n",
        )
        .unwrap();

        assert_eq!(batch.skipped(), 0);
        assert_eq!(batch.records().len(), 2);
        let latest = &batch.records()[0];
        assert_eq!(latest.sale_id(), 2);
        assert_eq!(latest.period().label(), "2024-02");
        assert_eq!(latest.outlet_region(), crate::domain::UNKNOWN);
        assert_eq!(latest.customer_email(), None);
        assert_eq!(latest.total_amount(), dec!(4.20));
        assert_eq!(batch.records()[1].customer_age(), Some(34));
    }

    #[test]
    fn test_missing_column_fails() {
        let result = read_sales("id_vente,date_vente,nom_client\n1,2024-01-01,Jean\n".as_bytes());
        match result {
            Err(SourceError::Query(message)) => {
                assert!(message.contains("montant_total"));
                assert!(message.contains("nom_enseigne"));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_date_fails() {
        let result = read("1,yesterday,Jean,Paris,,,A,Paris,Nord,X,1,1,1\n");
        assert!(matches!(result, Err(SourceError::Query(_))));
    }

    #[test]
    fn test_malformed_rows_are_counted() {
        let batch = read(
            "1,2024-01-05,Jean,Paris,,,A,Paris,Nord,X,1,1.00,1.00\n\
             2,2024-01-05,,Paris,,,A,Paris,Nord,X,1,1.00,1.00\n\
             3,2024-01-05,Marie,Paris,,,A,Paris,Nord,X,1,1.00,a lot\n\
             4,2024-01-05,Paul,Paris,,,A,Paris,Nord,X,1,1.00,\n\
             five,2024-01-05,Luc,Paris,,,A,Paris,Nord,X,1,1.00,1.00\n",
        )
        .unwrap();
        assert_eq!(batch.records().len(), 1);
        assert_eq!(batch.skipped(), 4);
    }

    #[test]
    fn test_empty_date_skips_the_row() {
        let batch = read(
            "1,2024-01-05,Jean,Paris,,,A,Paris,Nord,X,1,1.00,1.00\n\
             2,,Marie,Paris,,,A,Paris,Nord,X,1,2.00,2.00\n",
        )
        .unwrap();
        assert_eq!(batch.records().len(), 1);
        assert_eq!(batch.records()[0].sale_id(), 1);
        assert_eq!(batch.skipped(), 1);
    }

    #[test]
    fn test_optional_columns_are_read_leniently() {
        let batch = read(
            "1,2024-01-05,Jean,Paris,,34.0,A,Paris,Nord,X,1,5.00,5.00\n\
             2,2024-01-06,Marie,Paris,,-3,A,Paris,Nord,X,2.0,5.00,10.00\n\
             3,2024-01-07,Paul,Paris,,41.5,A,Paris,Nord,X,one,cheap,0.00\n",
        )
        .unwrap();
        assert_eq!(batch.skipped(), 0);
        assert_eq!(batch.records().len(), 3);

        let tables = crate::engine::KpiTables::compute(batch.records());
        assert_eq!(tables.global.total_revenue, dec!(15.00));

        let by_id = |id| batch.records().iter().find(|r| r.sale_id() == id).unwrap();
        assert_eq!(by_id(1).customer_age(), Some(34));
        assert_eq!(by_id(2).customer_age(), None);
        assert_eq!(by_id(2).quantity(), Some(2));
        assert_eq!(by_id(3).customer_age(), None);
        assert_eq!(by_id(3).quantity(), None);
        assert_eq!(by_id(3).unit_price(), None);
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let mut source = CsvSalesSource::new("does/not/exist.csv");
        assert!(matches!(source.fetch(), Err(SourceError::Unavailable(_))));
    }

    #[test]
    fn test_parse_sale_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_sale_date("2024-03-01"), Some(expected));
        assert_eq!(parse_sale_date("01/03/2024"), Some(expected));
        assert_eq!(parse_sale_date("2024-03-01T00:00:00"), Some(expected));
        assert_eq!(parse_sale_date(""), None);
        assert_eq!(parse_sale_date("2024-13-01"), None);
    }
}
