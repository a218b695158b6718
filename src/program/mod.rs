//! This module contains the definition of the pipeline trait and its implementation for running a
//! report: fetch sales from a primary `SalesSource`, fall back to a secondary one when the primary
//! cannot be reached, and aggregate the records into a `ReportBundle`.
//!
//! # Example
//!
//! ```no_run
//! use retail_kpi_report::{ReportConfig, ReportPipelineBuilder};
//!
//! let config = ReportConfig::builder().csv_file("data/retail_demo.csv").build();
//! let mut pipeline = ReportPipelineBuilder::postgres_with_csv_fallback(&config);
//! let bundle = pipeline.run()?;
//! println!("{} sales from {}", bundle.records().len(), bundle.source_name());
//! ```
mod bundle;

use log::{debug, info, warn};

pub use bundle::ReportBundle;

use crate::{
    CsvSalesSource, PipelineError, PostgresSalesSource, ReportConfig, SalesSource, SourceBatch,
    SourceError, SourceFailure,
};

/// A report pipeline: a primary source, and the fallback used when the primary is unavailable.
#[derive(Debug)]
pub struct ReportPipeline<P, F> {
    primary: P,
    fallback: F,
}

/// Builder for constructing a report pipeline.
#[derive(Debug)]
pub struct ReportPipelineBuilder {}

impl ReportPipelineBuilder {
    /// Constructs the production pipeline: PostgreSQL first, the CSV file when the
    /// database cannot be reached.
    pub fn postgres_with_csv_fallback(config: &ReportConfig) -> Box<dyn Pipeline> {
        Box::new(ReportPipeline::new(
            PostgresSalesSource::new(config.database.clone()),
            CsvSalesSource::new(config.csv_file.clone()),
        ))
    }
}

/// Trait for defining a pipeline.
pub trait Pipeline {
    /// Runs the pipeline.
    ///
    /// # Returns
    ///
    /// The report of the source that supplied data, or the failure of every
    /// source that was attempted.
    fn run(&mut self) -> Result<ReportBundle, PipelineError>;
}

/// States of a single run.
#[derive(Debug)]
enum Stage {
    SelectingSource,
    Aggregating {
        source_name: &'static str,
        batch: SourceBatch,
    },
    Done(ReportBundle),
    Failed(PipelineError),
}

impl<P, F> ReportPipeline<P, F>
where
    P: SalesSource,
    F: SalesSource,
{
    pub fn new(primary: P, fallback: F) -> Self {
        ReportPipeline { primary, fallback }
    }

    /// Tries the primary, then the fallback. Only connectivity failures move on
    /// to the next source; a query failure ends the selection.
    fn select_source(&mut self) -> Stage {
        let mut attempts = Vec::new();
        let sources: [&mut dyn SalesSource; 2] = [&mut self.primary, &mut self.fallback];
        for source in sources {
            match source.fetch() {
                Ok(batch) => {
                    info!("Using {} as sales source", source.name());
                    return Stage::Aggregating {
                        source_name: source.name(),
                        batch,
                    };
                }
                Err(error @ SourceError::Unavailable(_)) => {
                    warn!("{} unavailable, trying next source - {}", source.name(), error);
                    attempts.push(SourceFailure {
                        adapter: source.name(),
                        error,
                    });
                }
                Err(error) => {
                    attempts.push(SourceFailure {
                        adapter: source.name(),
                        error,
                    });
                    return Stage::Failed(PipelineError::SourceQuery { attempts });
                }
            }
        }
        Stage::Failed(PipelineError::SourcesUnavailable { attempts })
    }
}

impl<P, F> Pipeline for ReportPipeline<P, F>
where
    P: SalesSource,
    F: SalesSource,
{
    fn run(&mut self) -> Result<ReportBundle, PipelineError> {
        let mut stage = Stage::SelectingSource;
        loop {
            stage = match stage {
                Stage::SelectingSource => self.select_source(),
                Stage::Aggregating { source_name, batch } => {
                    debug!("Aggregating {} records", batch.records().len());
                    Stage::Done(ReportBundle::assemble(source_name, batch))
                }
                Stage::Done(bundle) => return Ok(bundle),
                Stage::Failed(error) => return Err(error),
            };
        }
    }
}
