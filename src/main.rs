use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::info;
use retail_kpi_report::{
    CsvReportWriter, DatabaseConfig, ReportConfig, ReportPipelineBuilder, ReportSink,
    DEFAULT_CSV_FILE, DEFAULT_OUTPUT_DIR,
};

#[derive(Parser, Debug)]
#[command(name = "retail-kpi-report")]
#[command(about = "Extracts retail sales and exports KPIs per outlet and per month", long_about = None)]
#[command(version)]
struct Args {
    /// PostgreSQL host. Without it the CSV file is used directly.
    #[arg(long, env = "DB_HOST")]
    db_host: Option<String>,

    #[arg(long, env = "DB_PORT", default_value_t = 5432)]
    db_port: u16,

    #[arg(long, env = "DB_DATABASE", default_value = "retail_demo")]
    db_database: String,

    #[arg(long, env = "DB_USER", default_value = "postgres")]
    db_user: String,

    #[arg(long, env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    db_password: String,

    /// Schema holding the sales tables, when not on the default search path
    #[arg(long, env = "DB_SCHEMA")]
    db_schema: Option<String>,

    /// Seconds to wait for the database before falling back
    #[arg(long, env = "DB_CONNECT_TIMEOUT", default_value_t = 5)]
    db_connect_timeout: u64,

    /// Fallback CSV export of the sales
    #[arg(long, env = "CSV_FILE", default_value = DEFAULT_CSV_FILE)]
    csv_file: PathBuf,

    /// Directory receiving the report files
    #[arg(long, env = "OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,
}

impl Args {
    fn into_config(self) -> ReportConfig {
        let schema = self.db_schema;
        let database = self.db_host.map(|host| {
            let mut database = DatabaseConfig::builder()
                .host(host)
                .port(self.db_port)
                .database(self.db_database)
                .user(self.db_user)
                .password(self.db_password)
                .connect_timeout(Duration::from_secs(self.db_connect_timeout))
                .build();
            database.schema = schema;
            database
        });
        ReportConfig {
            database,
            csv_file: self.csv_file,
            output_dir: self.output_dir,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config();
    let mut pipeline = ReportPipelineBuilder::postgres_with_csv_fallback(&config);
    let bundle = pipeline.run()?;

    let global = bundle.global();
    info!("Summary ({})", bundle.source_name());
    info!("  revenue: {:.2}", global.total_revenue);
    info!("  sales: {}", global.transactions);
    info!("  customers: {}", global.distinct_customers);
    info!("  outlets: {}", global.outlets);
    info!("  average basket: {:.2}", global.average_amount);
    info!(
        "  top outlet: {} ({:.2})",
        global.top_outlet, global.top_outlet_revenue
    );
    if let Some(product) = bundle.products().first() {
        info!("  best product: {} ({:.2})", product.product, product.revenue);
    }
    if bundle.skipped() > 0 {
        info!("  skipped rows: {}", bundle.skipped());
    }

    let mut writer = CsvReportWriter::new(&config.output_dir);
    writer
        .write(&bundle)
        .with_context(|| format!("writing report to {}", config.output_dir.display()))?;
    Ok(())
}
