use std::collections::BTreeMap;

use super::Accumulator;
use crate::domain::{average, Period, PeriodKpi, SaleRecord};

/// Computes one row per calendar month, oldest first.
pub fn period_kpis(records: &[SaleRecord]) -> Vec<PeriodKpi> {
    let mut groups: BTreeMap<&Period, Accumulator<'_>> = BTreeMap::new();
    for record in records {
        groups.entry(record.period()).or_default().add(record);
    }

    groups
        .into_iter()
        .map(|(period, acc)| PeriodKpi {
            year: period.year(),
            month: period.month(),
            period: period.label().to_string(),
            transactions: acc.transactions,
            revenue: acc.revenue,
            average_amount: average(acc.revenue, acc.transactions),
            distinct_customers: acc.customers.len(),
        })
        .collect()
}
