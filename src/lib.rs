//! Key-pair authenticated access to the Snowflake tables behind the propensity model.
//!
//! Configuration is read once into a [`WarehouseConfig`], then passed to
//! [`fetch_training_data`] or [`fetch_predict_data`]. Each call normalizes the
//! private key to unencrypted PKCS#8 DER, signs a JWT with it, runs one fixed
//! query over the Snowflake SQL API, and returns every row along with the
//! column names.
//!
//! Example usage:
//!
//! ```rust,no_run
//! use propensity_warehouse::{fetch_training_data, Cell, SnowflakeError, WarehouseConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SnowflakeError> {
//!     // SNOWFLAKE_USER, SNOWFLAKE_ACCOUNT, SNOWFLAKE_PRIVATE_KEY, ...
//!     let config = WarehouseConfig::from_env()?;
//!
//!     let (rows, columns) = fetch_training_data(&config).await?.into_parts();
//!     println!("{} rows of {:?}", rows.len(), columns);
//!
//!     match &rows[0][0] {
//!         Cell::Int(x) => println!("Got an integer: {}", x),
//!         Cell::Varchar(x) => println!("Got a string: {}", x),
//!         _ => println!("Got something else"),
//!     }
//!     Ok(())
//! }
//! ```
mod cells;
mod config;
mod connection;
mod credentials;
mod datasets;
mod errors;
mod jwt;
mod keys;
mod partition;
mod session;
mod statement;
#[cfg(test)]
mod test_server;

pub use cells::{Cell, RawCell};
pub use config::WarehouseConfig;
pub use connection::{connect, query_once, Warehouse, WarehouseConnection};
pub use credentials::{Authenticator, CredentialBundle};
pub use datasets::{
    fetch_predict_data, fetch_predict_data_from, fetch_training_data, fetch_training_data_from,
    ResultSet, PREDICT_DATA_QUERY, TRAINING_DATA_QUERY,
};
pub use errors::{ConfigError, ConnectionError, KeyError, SnowflakeError, SnowflakeResult};
pub use keys::normalize_private_key;
pub use partition::Partition;
pub use session::Session;
pub use statement::{ColumnType, QueryResponse, Statement};

/// The Snowflake SQL API, as a [`Warehouse`]
#[derive(Debug, Clone)]
pub struct SnowflakeClient {
    /// Overrides `https://<account>.snowflakecomputing.com`
    pub host: Option<String>,
    pub statement_timeout: Option<u64>,
}

impl SnowflakeClient {
    pub fn from_config(config: &WarehouseConfig) -> SnowflakeClient {
        SnowflakeClient {
            host: None,
            statement_timeout: config.statement_timeout,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> SnowflakeClient {
        self.host = Some(host.into());
        self
    }
}
