use crate::errors::ConfigError;

pub const ENV_USER: &str = "SNOWFLAKE_USER";
pub const ENV_ACCOUNT: &str = "SNOWFLAKE_ACCOUNT";
pub const ENV_WAREHOUSE: &str = "SNOWFLAKE_WAREHOUSE";
pub const ENV_DATABASE: &str = "SNOWFLAKE_DATABASE";
pub const ENV_SCHEMA: &str = "SNOWFLAKE_SCHEMA";
pub const ENV_ROLE: &str = "SNOWFLAKE_ROLE";
pub const ENV_PRIVATE_KEY: &str = "SNOWFLAKE_PRIVATE_KEY";
pub const ENV_PRIVATE_KEY_PATH: &str = "SNOWFLAKE_PRIVATE_KEY_PATH";

/// Where to connect and who to connect as.
///
/// Build this once at startup, usually with [`WarehouseConfig::from_env`],
/// and pass it to the fetch functions by reference.
#[derive(Clone)]
pub struct WarehouseConfig {
    pub user: String,
    pub account: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    pub role: Option<String>,
    /// PEM text or DER bytes. Validated when a connection is assembled.
    pub private_key: Option<Vec<u8>>,
    /// Server-side statement timeout in seconds. `None` leaves it to the account default.
    pub statement_timeout: Option<u64>,
}

impl WarehouseConfig {
    /// Read the `SNOWFLAKE_*` variables from the process environment
    pub fn from_env() -> Result<WarehouseConfig, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`WarehouseConfig::from_env`], but over any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<WarehouseConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &'static str| lookup(name).ok_or(ConfigError::MissingVar(name));
        let non_empty = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let private_key = match (non_empty(ENV_PRIVATE_KEY), non_empty(ENV_PRIVATE_KEY_PATH)) {
            (Some(key), _) => Some(key.into_bytes()),
            (None, Some(path)) => Some(
                std::fs::read(&path).map_err(|source| ConfigError::KeyFile { path, source })?,
            ),
            (None, None) => None,
        };

        Ok(WarehouseConfig {
            user: require(ENV_USER)?,
            account: require(ENV_ACCOUNT)?,
            warehouse: require(ENV_WAREHOUSE)?,
            database: require(ENV_DATABASE)?,
            schema: require(ENV_SCHEMA)?,
            role: non_empty(ENV_ROLE),
            private_key,
            statement_timeout: None,
        })
    }

    pub fn with_private_key(mut self, material: impl Into<Vec<u8>>) -> WarehouseConfig {
        self.private_key = Some(material.into());
        self
    }

    pub fn with_statement_timeout(mut self, timeout_seconds: u64) -> WarehouseConfig {
        self.statement_timeout = Some(timeout_seconds);
        self
    }
}

impl std::fmt::Debug for WarehouseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarehouseConfig")
            .field("user", &self.user)
            .field("account", &self.account)
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("role", &self.role)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("statement_timeout", &self.statement_timeout)
            .finish()
    }
}
