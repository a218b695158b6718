//! Pure aggregation of sale records into KPI tables.
//!
//! Nothing in here touches a source: every function takes the already
//! materialized records, so the tables are identical whichever adapter
//! supplied them.
mod breakdown;
mod global;
mod outlet;
mod period;

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use rust_decimal::Decimal;

use crate::domain::{CityKpi, GlobalKpis, OutletKpi, PeriodKpi, ProductKpi, SaleRecord};

pub use breakdown::city_kpis;
pub use breakdown::product_kpis;
pub use breakdown::TOP_PRODUCTS;
pub use global::global_kpis;
pub use outlet::outlet_kpis;
pub use period::period_kpis;

/// Running totals of one group of records.
///
/// Amounts are bounded at normalization (see `MAX_AMOUNT`), so the revenue sum
/// cannot overflow for any record count that fits in memory.
#[derive(Debug, Default)]
struct Accumulator<'a> {
    customers: HashSet<&'a str>,
    transactions: usize,
    quantity: i64,
    revenue: Decimal,
}

impl<'a> Accumulator<'a> {
    fn add(&mut self, record: &'a SaleRecord) {
        self.customers.insert(record.customer_key());
        self.transactions += 1;
        self.quantity += i64::from(record.quantity().unwrap_or(0));
        self.revenue += record.total_amount();
    }
}

/// Groups records by `key`, in the order each key first appears.
fn group_by_first_seen<'a, K, F>(records: &'a [SaleRecord], key: F) -> Vec<(K, Accumulator<'a>)>
where
    K: Hash + Eq + Copy,
    F: Fn(&'a SaleRecord) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Accumulator<'a>)> = Vec::new();
    for record in records {
        let key = key(record);
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push((key, Accumulator::default()));
            groups.len() - 1
        });
        groups[slot].1.add(record);
    }
    groups
}

/// The KPI tables computed from one record sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiTables {
    pub global: GlobalKpis,
    pub outlets: Vec<OutletKpi>,
    pub periods: Vec<PeriodKpi>,
    pub products: Vec<ProductKpi>,
    pub cities: Vec<CityKpi>,
}

impl KpiTables {
    pub fn compute(records: &[SaleRecord]) -> Self {
        let outlets = outlet_kpis(records);
        let periods = period_kpis(records);
        let global = global_kpis(records, &outlets);
        KpiTables {
            global,
            outlets,
            periods,
            products: product_kpis(records),
            cities: city_kpis(records),
        }
    }
}
