use crate::config::WarehouseConfig;
use crate::credentials::CredentialBundle;
use crate::datasets::ResultSet;
use crate::errors::{ConnectionError, SnowflakeResult};

/// Something that can open authenticated connections to a warehouse.
///
/// [`crate::SnowflakeClient`] talks to the Snowflake SQL API. Tests substitute their own.
#[allow(async_fn_in_trait)]
pub trait Warehouse {
    type Connection: WarehouseConnection;

    async fn connect(
        &self,
        credentials: CredentialBundle,
    ) -> Result<Self::Connection, ConnectionError>;
}

/// An open connection that runs statements until it is closed
#[allow(async_fn_in_trait)]
pub trait WarehouseConnection {
    /// Run a statement and materialize its whole result
    async fn query(&mut self, sql: &str) -> SnowflakeResult<ResultSet>;

    async fn close(self);
}

/// Assemble credentials from `config` and open a connection with them.
///
/// Every failure, including a missing or malformed private key, is reported
/// as [`crate::SnowflakeError::Connection`].
pub async fn connect<W: Warehouse>(
    warehouse: &W,
    config: &WarehouseConfig,
) -> SnowflakeResult<W::Connection> {
    let credentials = CredentialBundle::assemble(config)?;
    log::debug!(
        "Connecting to account {} as {}",
        credentials.account,
        credentials.user
    );
    Ok(warehouse.connect(credentials).await?)
}

/// Run one statement on a fresh connection, closing it whether or not the statement succeeds
pub async fn query_once<W: Warehouse>(
    warehouse: &W,
    config: &WarehouseConfig,
    sql: &str,
) -> SnowflakeResult<ResultSet> {
    let mut connection = connect(warehouse, config).await?;
    let result = connection.query(sql).await;
    connection.close().await;
    result
}
