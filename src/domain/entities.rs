use std::fmt;

use chrono::{Datelike, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use typed_builder::TypedBuilder;

use super::errors::MalformedRecord;

/// Bucket used for descriptive fields a source left empty.
pub const UNKNOWN: &str = "unknown";

/// Top outlet name reported when there are no sales at all.
pub const NOT_AVAILABLE: &str = "N/A";

/// Largest magnitude accepted for a sale's total amount.
///
/// A `Decimal` holds about 7.9e28, so summing amounts under this bound cannot
/// overflow before the record count reaches 7.9e13.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

pub type SaleId = i64;
pub type CustomerId = i64;

/// Calendar year-month bucket used for temporal aggregation.
///
/// Ordering is chronological: year first, then month.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    year: i32,
    month: u32,
    label: String,
}

impl Period {
    pub fn of(timestamp: &NaiveDateTime) -> Self {
        let year = timestamp.year();
        let month = timestamp.month();
        Period {
            year,
            month,
            label: format!("{:04}-{:02}", year, month),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// `YYYY-MM`
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// A sale row as read from a source, before normalization.
///
/// Both adapters fill this struct and hand it to [`SaleRecord::try_from`], so
/// defaults, unknown buckets and derived fields are computed in one place.
#[derive(Debug, Clone, Default, PartialEq, TypedBuilder)]
pub struct RawSale {
    #[builder(default, setter(strip_option))]
    pub sale_id: Option<SaleId>,
    #[builder(default, setter(strip_option))]
    pub sold_at: Option<NaiveDateTime>,
    #[builder(default, setter(strip_option))]
    pub customer_id: Option<CustomerId>,
    #[builder(default, setter(into, strip_option))]
    pub customer_name: Option<String>,
    #[builder(default, setter(into, strip_option))]
    pub customer_city: Option<String>,
    #[builder(default, setter(into, strip_option))]
    pub customer_email: Option<String>,
    #[builder(default, setter(strip_option))]
    pub customer_age: Option<u32>,
    #[builder(default, setter(into, strip_option))]
    pub outlet_name: Option<String>,
    #[builder(default, setter(into, strip_option))]
    pub outlet_city: Option<String>,
    #[builder(default, setter(into, strip_option))]
    pub outlet_region: Option<String>,
    #[builder(default, setter(into, strip_option))]
    pub product: Option<String>,
    #[builder(default, setter(strip_option))]
    pub quantity: Option<i32>,
    #[builder(default, setter(strip_option))]
    pub unit_price: Option<Decimal>,
    #[builder(default, setter(strip_option))]
    pub total_amount: Option<Decimal>,
}

/// One normalized sales transaction.
#[derive(Clone, PartialEq)]
pub struct SaleRecord {
    sale_id: SaleId,
    sold_at: NaiveDateTime,
    period: Period,
    customer_id: Option<CustomerId>,
    customer_name: String,
    customer_city: String,
    customer_email: Option<String>,
    customer_age: Option<u32>,
    outlet_name: String,
    outlet_city: String,
    outlet_region: String,
    product: String,
    quantity: Option<i32>,
    unit_price: Option<Decimal>,
    total_amount: Decimal,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn or_unknown(value: Option<String>) -> String {
    non_blank(value).unwrap_or_else(|| UNKNOWN.to_string())
}

impl TryFrom<RawSale> for SaleRecord {
    type Error = MalformedRecord;

    fn try_from(raw: RawSale) -> Result<Self, Self::Error> {
        let sale_id = raw.sale_id.ok_or(MalformedRecord::MissingField("sale id"))?;
        let sold_at = raw
            .sold_at
            .ok_or(MalformedRecord::MissingField("sale date"))?;
        let customer_name = non_blank(raw.customer_name)
            .ok_or(MalformedRecord::MissingField("customer name"))?;
        let total_amount = raw
            .total_amount
            .ok_or(MalformedRecord::MissingField("total amount"))?;
        if total_amount.abs() > MAX_AMOUNT {
            return Err(MalformedRecord::InvalidValue {
                field: "total amount",
                value: total_amount.to_string(),
            });
        }

        Ok(SaleRecord {
            sale_id,
            period: Period::of(&sold_at),
            sold_at,
            customer_id: raw.customer_id,
            customer_name,
            customer_city: or_unknown(raw.customer_city),
            customer_email: non_blank(raw.customer_email),
            customer_age: raw.customer_age,
            outlet_name: or_unknown(raw.outlet_name),
            outlet_city: or_unknown(raw.outlet_city),
            outlet_region: or_unknown(raw.outlet_region),
            product: or_unknown(raw.product),
            quantity: raw.quantity,
            unit_price: raw.unit_price,
            total_amount,
        })
    }
}

impl SaleRecord {
    pub fn sale_id(&self) -> SaleId {
        self.sale_id
    }

    pub fn sold_at(&self) -> NaiveDateTime {
        self.sold_at
    }

    pub fn period(&self) -> &Period {
        &self.period
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    /// Identity used when counting distinct customers.
    ///
    /// The file source carries no customer identifier, so the name is used for
    /// every source to keep both paths counting the same way.
    pub fn customer_key(&self) -> &str {
        &self.customer_name
    }

    pub fn customer_city(&self) -> &str {
        &self.customer_city
    }

    pub fn customer_email(&self) -> Option<&str> {
        self.customer_email.as_deref()
    }

    pub fn customer_age(&self) -> Option<u32> {
        self.customer_age
    }

    pub fn outlet_name(&self) -> &str {
        &self.outlet_name
    }

    pub fn outlet_city(&self) -> &str {
        &self.outlet_city
    }

    pub fn outlet_region(&self) -> &str {
        &self.outlet_region
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn quantity(&self) -> Option<i32> {
        self.quantity
    }

    pub fn unit_price(&self) -> Option<Decimal> {
        self.unit_price
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }
}

impl fmt::Debug for SaleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sale [id {} - date {} - customer {} - outlet {} - amount {}]",
            self.sale_id, self.sold_at, self.customer_name, self.outlet_name, self.total_amount
        )
    }
}

/// Records produced by one source fetch, plus the rows that had to be skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceBatch {
    records: Vec<SaleRecord>,
    skipped: usize,
}

impl SourceBatch {
    /// Builds a batch in canonical order: most recent sale first, then by sale id.
    ///
    /// Every adapter goes through here so that the same transactions always reach
    /// the aggregation in the same sequence, whatever their origin.
    pub fn new(mut records: Vec<SaleRecord>, skipped: usize) -> Self {
        records.sort_by(|a, b| {
            b.sold_at
                .cmp(&a.sold_at)
                .then_with(|| a.sale_id.cmp(&b.sale_id))
        });
        SourceBatch { records, skipped }
    }

    pub fn records(&self) -> &[SaleRecord] {
        &self.records
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn into_parts(self) -> (Vec<SaleRecord>, usize) {
        (self.records, self.skipped)
    }
}

/// KPIs of a single outlet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutletKpi {
    pub outlet_name: String,
    pub outlet_city: String,
    pub outlet_region: String,
    pub distinct_customers: usize,
    pub transactions: usize,
    pub revenue: Decimal,
    pub average_amount: Decimal,
}

/// KPIs of a single calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodKpi {
    pub year: i32,
    pub month: u32,
    pub period: String,
    pub transactions: usize,
    pub revenue: Decimal,
    pub average_amount: Decimal,
    pub distinct_customers: usize,
}

/// Revenue of a single product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductKpi {
    pub product: String,
    pub transactions: usize,
    pub quantity: i64,
    pub revenue: Decimal,
}

/// Revenue of the customers living in a single city.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityKpi {
    pub customer_city: String,
    pub distinct_customers: usize,
    pub transactions: usize,
    pub revenue: Decimal,
}

/// Scalar KPIs over the whole record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalKpis {
    pub total_revenue: Decimal,
    pub transactions: usize,
    pub distinct_customers: usize,
    pub outlets: usize,
    pub average_amount: Decimal,
    pub first_sale: Option<NaiveDateTime>,
    pub last_sale: Option<NaiveDateTime>,
    pub top_outlet: String,
    pub top_outlet_revenue: Decimal,
}

/// Revenue divided by transaction count, zero when there are no transactions.
pub fn average(revenue: Decimal, transactions: usize) -> Decimal {
    if transactions == 0 {
        Decimal::ZERO
    } else {
        revenue / Decimal::from(transactions)
    }
}
