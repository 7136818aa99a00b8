use crate::config::WarehouseConfig;
use crate::errors::ConnectionError;
use crate::keys::normalize_private_key;

/// Snowflake authenticator mode. Key-pair JWT is the only one supported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Authenticator {
    SnowflakeJwt,
}

impl Authenticator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Authenticator::SnowflakeJwt => "SNOWFLAKE_JWT",
        }
    }
}

/// Everything needed to open one connection. Built fresh for every attempt.
#[derive(Clone)]
pub struct CredentialBundle {
    pub user: String,
    pub account: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    pub role: Option<String>,
    pub authenticator: Authenticator,
    /// Unencrypted DER private key
    pub private_key: Vec<u8>,
}

impl CredentialBundle {
    /// Validate the configured key and normalize it to PKCS#8 DER.
    ///
    /// A missing or empty key fails before anything touches the network.
    pub fn assemble(config: &WarehouseConfig) -> Result<CredentialBundle, ConnectionError> {
        let material = config
            .private_key
            .as_deref()
            .filter(|material| !material.is_empty())
            .ok_or(ConnectionError::MissingPrivateKey)?;

        Ok(CredentialBundle {
            user: config.user.clone(),
            account: config.account.clone(),
            warehouse: config.warehouse.clone(),
            database: config.database.clone(),
            schema: config.schema.clone(),
            role: config.role.clone(),
            authenticator: Authenticator::SnowflakeJwt,
            private_key: normalize_private_key(material)?,
        })
    }
}

impl std::fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("user", &self.user)
            .field("account", &self.account)
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("role", &self.role)
            .field("authenticator", &self.authenticator.as_str())
            .field("private_key", &"<redacted>")
            .finish()
    }
}
