/// Failures while turning key material into PKCS#8 DER
#[derive(thiserror::Error, Debug)]
pub enum KeyError {
    #[error("Failed to process private key: encrypted keys are not supported")]
    Encrypted,
    #[error("Failed to process private key: not a DER or PEM encoded RSA private key")]
    UnsupportedFormat,
    #[error("Failed to process private key: {0}")]
    Decode(String),
    #[error("Failed to process private key: could not encode as PKCS#8 DER: {0}")]
    Encode(String),
}

/// Failures while assembling credentials or opening a connection
#[derive(thiserror::Error, Debug)]
pub enum ConnectionError {
    #[error("SNOWFLAKE_PRIVATE_KEY not set")]
    MissingPrivateKey,
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Token(#[from] jwt_simple::Error),
    #[error("key pair authentication rejected: {code}: {message}")]
    Auth { code: String, message: String },
    #[error("could not reach Snowflake: {0}")]
    Network(#[source] reqwest::Error),
    #[error(transparent)]
    Client(#[from] reqwest::Error),
    #[error(transparent)]
    InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{0} not set")]
    MissingVar(&'static str),
    #[error("failed to read private key file {path}: {source}")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum SnowflakeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to connect to Snowflake: {0}")]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("Snowflake server error: {code}: {message}")]
    ServerError { code: String, message: String },
    #[error(transparent)]
    JSONError(#[from] serde_json::Error),
    #[error("Could not decode {value:?} as {column_type}")]
    CellParse { column_type: &'static str, value: String },
    #[error("Row has {actual} values but the result has {expected} columns")]
    ColumnCountMismatch { expected: usize, actual: usize },
    #[error("Statement {statement_handle} still running after {timeout} seconds")]
    StillRunning { statement_handle: String, timeout: u64 },
    #[error("Response contains multiple partitions")]
    MultiplePartitions,
}

pub type SnowflakeResult<T> = Result<T, SnowflakeError>;

#[derive(serde::Deserialize, Debug)]
#[serde(untagged)]
pub enum SnowflakeWireResult<T> {
    Ok(T),
    Error { code: String, message: String },
}

impl<T> SnowflakeWireResult<T> {
    /// Convert from the custom wire format to a standard result
    pub fn into_result(self) -> SnowflakeResult<T> {
        match self {
            SnowflakeWireResult::Error { code, message } => {
                Err(SnowflakeError::ServerError { code, message })
            }
            SnowflakeWireResult::Ok(t) => Ok(t),
        }
    }
}
