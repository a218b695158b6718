use super::group_by_first_seen;
use crate::domain::{average, OutletKpi, SaleRecord};

/// Computes one row per outlet, ordered by revenue descending.
///
/// Outlets are identified by (name, city, region). Groups are created in the
/// order they first appear and the final sort is stable, so outlets with the
/// same revenue keep their input order.
pub fn outlet_kpis(records: &[SaleRecord]) -> Vec<OutletKpi> {
    let groups = group_by_first_seen(records, |record| {
        (
            record.outlet_name(),
            record.outlet_city(),
            record.outlet_region(),
        )
    });

    let mut rows: Vec<OutletKpi> = groups
        .into_iter()
        .map(|((name, city, region), acc)| OutletKpi {
            outlet_name: name.to_string(),
            outlet_city: city.to_string(),
            outlet_region: region.to_string(),
            distinct_customers: acc.customers.len(),
            transactions: acc.transactions,
            revenue: acc.revenue,
            average_amount: average(acc.revenue, acc.transactions),
        })
        .collect();
    rows.sort_by(|a, b| b.revenue.cmp(&a.revenue));
    rows
}
