//! Explicit configuration values, resolved once at start-up and handed to the
//! source constructors.
use std::path::PathBuf;
use std::time::Duration;

use typed_builder::TypedBuilder;

pub const DEFAULT_CSV_FILE: &str = "data/retail_demo.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "outputs";

/// Connection parameters of the PostgreSQL source.
#[derive(Clone, PartialEq, Eq, TypedBuilder)]
pub struct DatabaseConfig {
    #[builder(default = "localhost".to_string(), setter(into))]
    pub host: String,
    #[builder(default = 5432)]
    pub port: u16,
    #[builder(default = "retail_demo".to_string(), setter(into))]
    pub database: String,
    #[builder(default = "postgres".to_string(), setter(into))]
    pub user: String,
    #[builder(default, setter(into))]
    pub password: String,
    #[builder(default = Duration::from_secs(5))]
    pub connect_timeout: Duration,
    /// Schema searched for the `vente`, `client` and `enseigne` tables instead
    /// of the server's default `search_path`.
    #[builder(default, setter(into, strip_option))]
    pub schema: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig::builder().build()
    }
}

// Keeps the password out of logs.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("connect_timeout", &self.connect_timeout)
            .field("schema", &self.schema)
            .finish()
    }
}

/// Everything a report run needs.
///
/// `database` is `None` when no database was configured; the PostgreSQL source
/// then reports itself unavailable without trying to connect.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct ReportConfig {
    #[builder(default, setter(strip_option))]
    pub database: Option<DatabaseConfig>,
    #[builder(default = PathBuf::from(DEFAULT_CSV_FILE), setter(into))]
    pub csv_file: PathBuf,
    #[builder(default = PathBuf::from(DEFAULT_OUTPUT_DIR), setter(into))]
    pub output_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5432);
        assert_eq!(config.database, "retail_demo");
        assert_eq!(config.user, "postgres");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.schema, None);
    }

    #[test]
    fn test_schema_is_optional() {
        let config = DatabaseConfig::builder().schema("retail_staging").build();
        assert_eq!(config.schema.as_deref(), Some("retail_staging"));
        assert!(format!("{:?}", config).contains("retail_staging"));
    }

    #[test]
    fn test_debug_hides_password() {
        let config = DatabaseConfig::builder().password("s3cret").build();
        assert!(!format!("{:?}", config).contains("s3cret"));
    }

    #[test]
    fn test_report_defaults_have_no_database() {
        let config = ReportConfig::default();
        assert!(config.database.is_none());
        assert_eq!(config.csv_file, PathBuf::from(DEFAULT_CSV_FILE));
    }
}
