use jwt_simple::algorithms::RS256KeyPair;

use crate::connection::{Warehouse, WarehouseConnection};
use crate::credentials::CredentialBundle;
use crate::datasets::ResultSet;
use crate::errors::{ConnectionError, SnowflakeResult};
use crate::statement::Statement;
use crate::{jwt, SnowflakeClient};

// The SQL API answers within 45 seconds, with 202 if the statement is still running
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// An authenticated connection to the Snowflake SQL API
///
/// The SQL API is stateless: this holds an HTTP client that presents the
/// signed token on every request, plus the context statements run in.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) host: String,
    pub(crate) http: reqwest::Client,
    pub(crate) database: String,
    pub(crate) warehouse: String,
    pub(crate) schema: String,
    pub(crate) role: Option<String>,
    pub(crate) timeout: Option<u64>,
}

impl Session {
    pub fn prepare(&self, sql: &str) -> Statement {
        Statement::new(sql, self)
    }
}

impl Warehouse for SnowflakeClient {
    type Connection = Session;

    async fn connect(&self, credentials: CredentialBundle) -> Result<Session, ConnectionError> {
        use reqwest::header::*;
        let key_pair = RS256KeyPair::from_der(&credentials.private_key)?;
        let token = jwt::create_token(
            &key_pair,
            &credentials.account.to_ascii_uppercase(),
            &credentials.user.to_ascii_uppercase(),
        )?;

        let mut headers = HeaderMap::with_capacity(5);
        headers.append(CONTENT_TYPE, "application/json".parse()?);
        headers.append(AUTHORIZATION, format!("Bearer {}", token).parse()?);
        headers.append(
            "X-Snowflake-Authorization-Token-Type",
            "KEYPAIR_JWT".parse()?,
        );
        headers.append(ACCEPT, "application/json".parse()?);
        headers.append(
            USER_AGENT,
            concat!(env!("CARGO_PKG_NAME"), '/', env!("CARGO_PKG_VERSION")).parse()?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let host = self.host.clone().unwrap_or_else(|| {
            format!(
                "https://{}.snowflakecomputing.com",
                credentials.account.to_ascii_lowercase()
            )
        });
        log::debug!(
            "Opened session on {} with {} authentication",
            host,
            credentials.authenticator.as_str()
        );

        Ok(Session {
            host,
            http,
            database: credentials.database.to_ascii_uppercase(),
            warehouse: credentials.warehouse.to_ascii_uppercase(),
            schema: credentials.schema.to_ascii_uppercase(),
            role: credentials.role.as_ref().map(|x| x.to_ascii_uppercase()),
            timeout: self.statement_timeout,
        })
    }
}

impl WarehouseConnection for Session {
    async fn query(&mut self, sql: &str) -> SnowflakeResult<ResultSet> {
        let response = self.prepare(sql).query().await?;
        ResultSet::from_response(&response).await
    }

    async fn close(self) {
        log::debug!("Closing session on {}", self.host);
    }
}
