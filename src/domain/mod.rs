//! Module that describe domain entities and errors.
mod entities;
mod errors;

pub use entities::average;
pub use entities::CityKpi;
pub use entities::CustomerId;
pub use entities::GlobalKpis;
pub use entities::OutletKpi;
pub use entities::Period;
pub use entities::PeriodKpi;
pub use entities::ProductKpi;
pub use entities::RawSale;
pub use entities::SaleId;
pub use entities::SaleRecord;
pub use entities::SourceBatch;
pub use entities::NOT_AVAILABLE;
pub use entities::MAX_AMOUNT;
pub use entities::UNKNOWN;
pub use errors::*;
