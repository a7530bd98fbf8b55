use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

/// Run configuration, read from a plain-text file of exactly four
/// whitespace-separated tokens in fixed order:
/// database name, database user, database password, table-name prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    pub table_prefix: String,
}

impl SyncConfig {
    /// MySQL connection URL for the configured database on the fixed local
    /// endpoint.
    pub fn database_url(&self) -> String {
        format!(
            "mysql://{}:{}@localhost:3306/{}",
            self.db_user, self.db_password, self.db_name
        )
    }
}

pub fn load_sync_config(path: &Path) -> Result<SyncConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read config file failed: {}", path.display()))?;

    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.len() != 4 {
        bail!(
            "config must contain exactly 4 whitespace-separated tokens \
             (db name, db user, db password, table prefix), got {}",
            tokens.len()
        );
    }

    Ok(SyncConfig {
        db_name: tokens[0].to_string(),
        db_user: tokens[1].to_string(),
        db_password: tokens[2].to_string(),
        table_prefix: tokens[3].to_string(),
    })
}
