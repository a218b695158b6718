use log::{debug, info, warn};
use postgres::{Client, NoTls, Row};

use super::SalesSource;
use crate::config::DatabaseConfig;
use crate::domain::{RawSale, SaleRecord, SourceBatch, SourceError};

pub const POSTGRES_SOURCE: &str = "PostgreSQL";

const PING_QUERY: &str = "SELECT 1";

// Year, month and period are derived on our side, not by the database, so both
// sources share the same derivation.
const SALES_QUERY: &str = "
    SELECT
        v.id_vente::bigint AS id_vente,
        v.date_vente::timestamp AS date_vente,
        v.id_client::bigint AS id_client,
        c.nom || ' ' || c.prenom AS nom_client,
        c.ville AS ville_client,
        c.email,
        c.age::integer AS age,
        e.nom_enseigne,
        e.ville AS ville_enseigne,
        e.region,
        v.produit,
        v.quantite::integer AS quantite,
        v.prix_unitaire::numeric AS prix_unitaire,
        v.montant_total::numeric AS montant_total
    FROM vente v
    JOIN client c ON v.id_client = c.id_client
    JOIN enseigne e ON v.id_enseigne = e.id_enseigne
    ORDER BY v.date_vente DESC";

/// Reads sales from the PostgreSQL retail schema (`vente`, `client`, `enseigne`).
#[derive(Debug, Clone)]
pub struct PostgresSalesSource {
    config: Option<DatabaseConfig>,
}

impl PostgresSalesSource {
    /// Creates the source. Without a configuration every fetch reports the
    /// database as unavailable.
    pub fn new(config: Option<DatabaseConfig>) -> Self {
        PostgresSalesSource { config }
    }

    /// Opens a connection and runs the connectivity check.
    ///
    /// Any failure here, timeouts included, is a connectivity problem.
    fn connect(config: &DatabaseConfig) -> Result<Client, SourceError> {
        let unavailable = |e: postgres::Error| {
            SourceError::Unavailable(format!(
                "{}:{}/{} - {}",
                config.host, config.port, config.database, e
            ))
        };
        let mut pg = postgres::Config::new();
        pg.host(&config.host)
            .port(config.port)
            .dbname(&config.database)
            .user(&config.user)
            .password(&config.password)
            .connect_timeout(config.connect_timeout);
        if let Some(schema) = &config.schema {
            pg.options(&format!("-c search_path={}", schema));
        }
        let mut client = pg.connect(NoTls).map_err(unavailable)?;
        client.simple_query(PING_QUERY).map_err(unavailable)?;
        debug!("Connectivity check succeeded");
        Ok(client)
    }
}

fn raw_sale(row: &Row) -> Result<RawSale, postgres::Error> {
    let age: Option<i32> = row.try_get("age")?;
    Ok(RawSale {
        sale_id: row.try_get("id_vente")?,
        sold_at: row.try_get("date_vente")?,
        customer_id: row.try_get("id_client")?,
        customer_name: row.try_get("nom_client")?,
        customer_city: row.try_get("ville_client")?,
        customer_email: row.try_get("email")?,
        customer_age: age.and_then(|age| u32::try_from(age).ok()),
        outlet_name: row.try_get("nom_enseigne")?,
        outlet_city: row.try_get("ville_enseigne")?,
        outlet_region: row.try_get("region")?,
        product: row.try_get("produit")?,
        quantity: row.try_get("quantite")?,
        unit_price: row.try_get("prix_unitaire")?,
        total_amount: row.try_get("montant_total")?,
    })
}

impl SalesSource for PostgresSalesSource {
    fn name(&self) -> &'static str {
        POSTGRES_SOURCE
    }

    fn fetch(&mut self) -> Result<SourceBatch, SourceError> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| SourceError::Unavailable("database is not configured".to_string()))?;
        let mut client = Self::connect(config)?;
        info!(
            "Connected to PostgreSQL {}:{}/{}",
            config.host, config.port, config.database
        );

        let rows = client
            .query(SALES_QUERY, &[])
            .map_err(|e| SourceError::Query(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        let mut skipped = 0;
        for row in &rows {
            let raw = raw_sale(row).map_err(|e| SourceError::Query(e.to_string()))?;
            let sale_id = raw.sale_id;
            match SaleRecord::try_from(raw) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Skipping sale {:?} - {}", sale_id, e);
                    skipped += 1;
                }
            }
        }
        info!(
            "Loaded {} sales from PostgreSQL ({} skipped)",
            records.len(),
            skipped
        );
        Ok(SourceBatch::new(records, skipped))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_unconfigured_database_is_unavailable() {
        let mut source = PostgresSalesSource::new(None);
        assert_eq!(source.name(), POSTGRES_SOURCE);
        assert!(matches!(source.fetch(), Err(SourceError::Unavailable(_))));
    }

    #[test]
    fn test_unreachable_database_is_unavailable() {
        let config = DatabaseConfig::builder()
            .host("127.0.0.1")
            .port(1)
            .connect_timeout(Duration::from_secs(1))
            .build();
        let mut source = PostgresSalesSource::new(Some(config));
        match source.fetch() {
            Err(SourceError::Unavailable(message)) => assert!(message.contains("127.0.0.1:1")),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
