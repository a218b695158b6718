//! Sources that supply sale records and sinks that consume the finished report.
mod csv;
mod export;
mod postgres;

pub use self::csv::read_sales;
pub use self::csv::CsvSalesSource;
pub use self::csv::CSV_SOURCE;
pub use self::csv::REQUIRED_COLUMNS;
pub use self::export::CsvReportWriter;
pub use self::export::DETAIL_ROWS;
pub use self::postgres::PostgresSalesSource;
pub use self::postgres::POSTGRES_SOURCE;

use crate::domain::{ExportError, SourceBatch, SourceError};
use crate::program::ReportBundle;

/// A backing store able to produce normalized sale records.
///
/// Implementations must be all-or-nothing: either the whole batch is returned
/// or an error, never a partial set of rows.
#[cfg_attr(test, mockall::automock)]
pub trait SalesSource {
    /// Identifier reported in the result bundle.
    fn name(&self) -> &'static str;

    /// Fetches every sale record.
    ///
    /// # Errors
    ///
    /// [`SourceError::Unavailable`] when the store cannot be reached and
    /// [`SourceError::Query`] when it was reached but reading failed.
    fn fetch(&mut self) -> Result<SourceBatch, SourceError>;
}

/// Downstream consumer of a finished report.
pub trait ReportSink {
    fn write(&mut self, bundle: &ReportBundle) -> Result<(), ExportError>;
}

impl ReportSink for CsvReportWriter {
    fn write(&mut self, bundle: &ReportBundle) -> Result<(), ExportError> {
        self.write_report(bundle)
    }
}
