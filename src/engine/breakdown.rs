use super::group_by_first_seen;
use crate::domain::{CityKpi, ProductKpi, SaleRecord};

/// Number of products kept in the product ranking.
pub const TOP_PRODUCTS: usize = 10;

/// Ranks products by revenue and keeps the best [`TOP_PRODUCTS`].
///
/// Ties keep the order in which products first appear.
pub fn product_kpis(records: &[SaleRecord]) -> Vec<ProductKpi> {
    let mut rows: Vec<ProductKpi> = group_by_first_seen(records, SaleRecord::product)
        .into_iter()
        .map(|(product, acc)| ProductKpi {
            product: product.to_string(),
            transactions: acc.transactions,
            quantity: acc.quantity,
            revenue: acc.revenue,
        })
        .collect();
    rows.sort_by(|a, b| b.revenue.cmp(&a.revenue));
    rows.truncate(TOP_PRODUCTS);
    rows
}

/// Revenue per customer city, ordered by revenue descending.
pub fn city_kpis(records: &[SaleRecord]) -> Vec<CityKpi> {
    let mut rows: Vec<CityKpi> = group_by_first_seen(records, SaleRecord::customer_city)
        .into_iter()
        .map(|(city, acc)| CityKpi {
            customer_city: city.to_string(),
            distinct_customers: acc.customers.len(),
            transactions: acc.transactions,
            revenue: acc.revenue,
        })
        .collect();
    rows.sort_by(|a, b| b.revenue.cmp(&a.revenue));
    rows
}
