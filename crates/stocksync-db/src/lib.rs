use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySql, MySqlPool, MySqlPoolOptions};
use sqlx::Transaction;
use stocksync_config::SyncConfig;
use stocksync_engine::CatalogGateway;

pub const ENV_DB_URL: &str = "STOCKSYNC_DATABASE_URL";

/// Connect to MySQL. `STOCKSYNC_DATABASE_URL` overrides the config-derived
/// URL when set (tests, non-default endpoints).
pub async fn connect(config: &SyncConfig) -> Result<MySqlPool> {
    let url = std::env::var(ENV_DB_URL).unwrap_or_else(|_| config.database_url());

    // One connection: records are applied strictly in input order, one
    // round trip at a time, and the batch transaction must own the session.
    let pool = MySqlPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .context("failed to connect to MySQL")?;

    Ok(pool)
}

/// Connectivity probe, run before any statement.
pub async fn status(pool: &MySqlPool) -> Result<()> {
    let (one,): (i64,) = sqlx::query_as("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    if one != 1 {
        bail!("status connectivity query returned {}", one);
    }
    Ok(())
}

/// MySQL-backed [`CatalogGateway`].
///
/// Owns every piece of SQL text in the workspace. Table names are the
/// configured prefix plus the fixed suffixes `product`,
/// `product_attribute` and `stock_available`; the prefix is validated at
/// construction so prefix substitution cannot inject SQL. All values go
/// through `?` parameter binding.
pub struct MySqlCatalog {
    pool: MySqlPool,
    tx: Option<Transaction<'static, MySql>>,
    sql_update_product: String,
    sql_resolve_secondary_id: String,
    sql_update_variant: String,
}

impl MySqlCatalog {
    pub fn new(pool: MySqlPool, table_prefix: &str) -> Result<Self> {
        validate_table_prefix(table_prefix)?;

        Ok(Self {
            pool,
            tx: None,
            sql_update_product: format!(
                "update {p}product set quantity = ? where ean13 = ?",
                p = table_prefix
            ),
            sql_resolve_secondary_id: format!(
                "select sa.id_stock_available \
                 from {p}product_attribute pa \
                 inner join {p}stock_available sa \
                   on pa.id_product = sa.id_product \
                   and pa.id_product_attribute = sa.id_product_attribute \
                 where pa.ean13 = ?",
                p = table_prefix
            ),
            sql_update_variant: format!(
                "update {p}stock_available set quantity = ? where id_stock_available = ?",
                p = table_prefix
            ),
        })
    }
}

fn validate_table_prefix(prefix: &str) -> Result<()> {
    if !prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        bail!(
            "table prefix may only contain ASCII alphanumerics and '_', got {:?}",
            prefix
        );
    }
    Ok(())
}

#[async_trait]
impl CatalogGateway for MySqlCatalog {
    async fn resolve_secondary_id(&mut self, identifier: &str) -> Result<Option<i64>> {
        // fetch_optional reads the first row of a multi-row result, which
        // is exactly the documented first-row-wins resolution policy.
        let query = sqlx::query_scalar::<_, i64>(&self.sql_resolve_secondary_id).bind(identifier);
        let id = match self.tx.as_mut() {
            Some(tx) => query.fetch_optional(&mut **tx).await,
            None => query.fetch_optional(&self.pool).await,
        }
        .with_context(|| format!("secondary id query failed for {identifier}"))?;

        Ok(id)
    }

    async fn update_product_quantity(&mut self, quantity: u32, identifier: &str) -> Result<u64> {
        let query = sqlx::query(&self.sql_update_product)
            .bind(quantity)
            .bind(identifier);
        let res = match self.tx.as_mut() {
            Some(tx) => query.execute(&mut **tx).await,
            None => query.execute(&self.pool).await,
        }
        .with_context(|| format!("product quantity update failed for {identifier}"))?;

        Ok(res.rows_affected())
    }

    async fn update_variant_quantity(&mut self, quantity: u32, secondary_id: i64) -> Result<u64> {
        let query = sqlx::query(&self.sql_update_variant)
            .bind(quantity)
            .bind(secondary_id);
        let res = match self.tx.as_mut() {
            Some(tx) => query.execute(&mut **tx).await,
            None => query.execute(&self.pool).await,
        }
        .with_context(|| format!("variant quantity update failed for stock row {secondary_id}"))?;

        Ok(res.rows_affected())
    }

    async fn begin_atomic(&mut self) -> Result<()> {
        if self.tx.is_some() {
            bail!("batch transaction already open");
        }
        let tx = self
            .pool
            .begin()
            .await
            .context("failed to begin batch transaction")?;
        self.tx = Some(tx);
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .context("commit without an open batch transaction")?;
        tx.commit()
            .await
            .context("failed to commit batch transaction")?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .context("rollback without an open batch transaction")?;
        tx.rollback()
            .await
            .context("failed to roll back batch transaction")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_prefix_validation() {
        assert!(validate_table_prefix("").is_ok());
        assert!(validate_table_prefix("ps_").is_ok());
        assert!(validate_table_prefix("shop2_").is_ok());
        assert!(validate_table_prefix("ps_; drop table x; --").is_err());
        assert!(validate_table_prefix("bad prefix").is_err());
    }
}
