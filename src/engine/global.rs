use rust_decimal::Decimal;

use super::Accumulator;
use crate::domain::{average, GlobalKpis, OutletKpi, SaleRecord, NOT_AVAILABLE};

/// Computes the scalar KPIs of the whole record set.
///
/// `outlets` must be the output of [`super::outlet_kpis`] over the same
/// records: the top outlet is read from its head rather than recomputed.
/// Customers are counted across all outlets, so a customer buying in two
/// outlets counts once here and once in each outlet row.
pub fn global_kpis(records: &[SaleRecord], outlets: &[OutletKpi]) -> GlobalKpis {
    let mut totals = Accumulator::default();
    for record in records {
        totals.add(record);
    }

    let (top_outlet, top_outlet_revenue) = match outlets.first() {
        Some(top) => (top.outlet_name.clone(), top.revenue),
        None => (NOT_AVAILABLE.to_string(), Decimal::ZERO),
    };

    GlobalKpis {
        total_revenue: totals.revenue,
        transactions: totals.transactions,
        distinct_customers: totals.customers.len(),
        outlets: outlets.len(),
        average_amount: average(totals.revenue, totals.transactions),
        first_sale: records.iter().map(SaleRecord::sold_at).min(),
        last_sale: records.iter().map(SaleRecord::sold_at).max(),
        top_outlet,
        top_outlet_revenue,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::RawSale;
    use crate::engine::{outlet_kpis, KpiTables};

    fn sale(id: i64, customer: &str, outlet: &str, day: u32, amount: Decimal) -> SaleRecord {
        let raw = RawSale::builder()
            .sale_id(id)
            .sold_at(
                NaiveDate::from_ymd_opt(2024, 1, day)
                    .unwrap()
                    .and_hms_opt(9, 0, 0)
                    .unwrap(),
            )
            .customer_name(customer)
            .outlet_name(outlet)
            .total_amount(amount)
            .build();
        SaleRecord::try_from(raw).unwrap()
    }

    #[test]
    fn test_three_sales_two_outlets() {
        let records = vec![
            sale(1, "Alice", "A", 1, dec!(100)),
            sale(2, "Bob", "A", 2, dec!(50)),
            sale(3, "Alice", "B", 3, dec!(200)),
        ];
        let tables = KpiTables::compute(&records);
        let global = &tables.global;

        assert_eq!(global.total_revenue, dec!(350));
        assert_eq!(global.transactions, 3);
        assert_eq!(global.distinct_customers, 2);
        assert_eq!(global.outlets, 2);
        assert_eq!(global.top_outlet, "B");
        assert_eq!(global.top_outlet_revenue, dec!(200));
        assert_eq!(global.first_sale, Some(records[0].sold_at()));
        assert_eq!(global.last_sale, Some(records[2].sold_at()));
        assert_eq!(tables.periods.len(), 1);
        assert_eq!(tables.periods[0].period, "2024-01");
    }

    #[test]
    fn test_customers_counted_globally() {
        let records = vec![
            sale(1, "Alice", "A", 1, dec!(10)),
            sale(2, "Alice", "B", 1, dec!(10)),
        ];
        let outlets = outlet_kpis(&records);
        let global = global_kpis(&records, &outlets);
        let per_outlet: usize = outlets.iter().map(|o| o.distinct_customers).sum();
        assert_eq!(per_outlet, 2);
        assert_eq!(global.distinct_customers, 1);
    }

    #[test]
    fn test_empty_records_yield_sentinel() {
        let tables = KpiTables::compute(&[]);
        let global = tables.global;
        assert_eq!(global.total_revenue, Decimal::ZERO);
        assert_eq!(global.transactions, 0);
        assert_eq!(global.distinct_customers, 0);
        assert_eq!(global.outlets, 0);
        assert_eq!(global.average_amount, Decimal::ZERO);
        assert_eq!(global.first_sale, None);
        assert_eq!(global.last_sale, None);
        assert_eq!(global.top_outlet, NOT_AVAILABLE);
        assert_eq!(global.top_outlet_revenue, Decimal::ZERO);
        assert!(tables.outlets.is_empty());
        assert!(tables.periods.is_empty());
    }
}
