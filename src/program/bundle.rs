use crate::domain::{CityKpi, GlobalKpis, OutletKpi, PeriodKpi, ProductKpi, SaleRecord, SourceBatch};
use crate::engine::KpiTables;

/// Immutable outcome of one pipeline run, handed to renderers.
///
/// The KPI tables are computed together from the same records, so the top
/// outlet of [`ReportBundle::global`] is always the first row of
/// [`ReportBundle::outlets`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReportBundle {
    source_name: &'static str,
    records: Vec<SaleRecord>,
    skipped: usize,
    tables: KpiTables,
}

impl ReportBundle {
    pub fn assemble(source_name: &'static str, batch: SourceBatch) -> Self {
        let (records, skipped) = batch.into_parts();
        let tables = KpiTables::compute(&records);
        ReportBundle {
            source_name,
            records,
            skipped,
            tables,
        }
    }

    /// Name of the source that actually supplied the records.
    pub fn source_name(&self) -> &'static str {
        self.source_name
    }

    /// Most recent first.
    pub fn records(&self) -> &[SaleRecord] {
        &self.records
    }

    /// Rows the source had to skip because required fields were missing or invalid.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn global(&self) -> &GlobalKpis {
        &self.tables.global
    }

    pub fn outlets(&self) -> &[OutletKpi] {
        &self.tables.outlets
    }

    pub fn periods(&self) -> &[PeriodKpi] {
        &self.tables.periods
    }

    /// Best-selling products by revenue, at most [`crate::TOP_PRODUCTS`] rows.
    pub fn products(&self) -> &[ProductKpi] {
        &self.tables.products
    }

    /// Revenue per customer city.
    pub fn cities(&self) -> &[CityKpi] {
        &self.tables.cities
    }

    /// The `count` most recent sales.
    pub fn latest_sales(&self, count: usize) -> &[SaleRecord] {
        &self.records[..count.min(self.records.len())]
    }
}
