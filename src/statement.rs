use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{StreamExt, TryStream, TryStreamExt};
use serde::{Deserialize, Serialize};

use crate::cells::RawCell;
use crate::errors::{ConnectionError, SnowflakeError, SnowflakeResult, SnowflakeWireResult};
use crate::partition::{Partition, StringTable};
use crate::session::Session;

const POLL_INTERVAL_START: Duration = Duration::from_millis(250);
const POLL_INTERVAL_MAX: Duration = Duration::from_secs(2);

/// A statement ready to be sent (created by [`Session::prepare`])
#[derive(Debug, Clone)]
pub struct Statement {
    wire: WireStatement,
    uuid: uuid::Uuid,
    session: Session,
}

impl Statement {
    /// Create a new statement from a SQL string and a Session
    ///
    /// Usually you will want to use [`Session::prepare`] instead of this method
    /// but the difference is merely ergonomic.
    pub fn new(sql: &str, session: &Session) -> Statement {
        Statement {
            wire: WireStatement {
                statement: sql.to_owned(),
                timeout: session.timeout,
                database: session.database.clone(),
                warehouse: session.warehouse.clone(),
                schema: session.schema.clone(),
                role: session.role.clone(),
            },
            uuid: uuid::Uuid::new_v4(),
            session: session.to_owned(),
        }
    }

    async fn send(&self) -> SnowflakeResult<reqwest::Response> {
        log::debug!(
            "Sending statement: {}",
            serde_json::to_string_pretty(&self.wire)?
        );
        let response = self
            .session
            .http
            .post(format!(
                "{}/api/v2/statements?nullable=true&requestId={}",
                self.session.host, self.uuid
            ))
            .json(&self.wire)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    SnowflakeError::from(ConnectionError::Network(e))
                } else {
                    SnowflakeError::from(e)
                }
            })?;

        // The token is only checked once the first statement arrives
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            let (code, message) = match response.json::<WireError>().await {
                Ok(WireError { code, message }) => (code, message),
                Err(_) => ("401".to_owned(), "Unauthorized".to_owned()),
            };
            return Err(ConnectionError::Auth { code, message }.into());
        }
        Ok(response)
    }

    /// Execute SQL that returns a result set
    ///
    /// This supports multiple partitions, which are fetched lazily
    /// but the first partition is buffered immediately.
    ///
    /// Statements still running when the API answers (HTTP 202) are polled on
    /// their status URL until they finish, or until the statement timeout
    /// passes if one is set.
    pub async fn query(&self) -> SnowflakeResult<QueryResponse> {
        let deadline = self
            .wire
            .timeout
            .filter(|&seconds| seconds > 0)
            .map(|seconds| (seconds, Instant::now() + Duration::from_secs(seconds)));
        let mut interval = POLL_INTERVAL_START;
        let mut response = self.send().await?;

        while response.status() == reqwest::StatusCode::ACCEPTED {
            let pending = response.json::<WirePending>().await?;
            if let Some((timeout, deadline)) = deadline {
                if Instant::now() >= deadline {
                    return Err(SnowflakeError::StillRunning {
                        statement_handle: pending.statement_handle,
                        timeout,
                    });
                }
            }
            log::debug!(
                "Statement {} still running, checking again in {:?}",
                pending.statement_handle,
                interval
            );
            tokio::time::sleep(interval).await;
            interval = (interval * 2).min(POLL_INTERVAL_MAX);

            let url = self.session.host.trim_end_matches('/').to_owned()
                + &pending.statement_status_url;
            response = self.session.http.get(&url).send().await?;
        }

        Ok(response
            .json::<SnowflakeWireResult<WireQueryResponse>>()
            .await?
            .into_result()?
            .hydrate(self.clone()))
    }

    /// Set the Snowflake-side timeout for the statement
    ///
    /// Zero asks for the account maximum. The same limit bounds how long
    /// [`Statement::query`] keeps polling a running statement.
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Statement {
        self.wire.timeout = Some(timeout_seconds);
        self
    }
}

/// The result of SQL that returns rows
///
/// The first partition is included immediately,
/// but additional partitions are fetched lazily and incur additional IO.
#[derive(Debug)]
pub struct QueryResponse {
    result_set_meta_data: WireStatementMetaData,
    data: Arc<StringTable>,
    statement_status_url: String,
    statement: Statement,
}

impl QueryResponse {
    /// Get the number of rows across all partitions
    pub fn num_rows(&self) -> usize {
        self.result_set_meta_data.num_rows
    }

    /// Get the number of columns
    pub fn num_columns(&self) -> usize {
        self.result_set_meta_data.row_type.len()
    }

    /// Get the number of partitions in the response
    pub fn num_partitions(&self) -> usize {
        self.result_set_meta_data.partition_info.len()
    }

    /// Column types in the result set
    pub fn column_types(&self) -> &[ColumnType] {
        &self.result_set_meta_data.row_type
    }

    /// Column names, in the order the statement produced them
    pub fn column_names(&self) -> Vec<String> {
        self.column_types()
            .iter()
            .map(|column| column.name.clone())
            .collect()
    }

    /// A convenience method to assert that there is only one partition and return it
    ///
    /// This never causes IO, is not async, and can only error with [`SnowflakeError::MultiplePartitions`]
    pub fn only_partition(self) -> SnowflakeResult<Partition> {
        if self.num_partitions() > 1 {
            Err(SnowflakeError::MultiplePartitions)
        } else {
            Ok(self.first_partition())
        }
    }

    fn first_partition(&self) -> Partition {
        Partition {
            index: 0,
            meta_data: self.result_set_meta_data.clone(),
            data: self.data.clone(),
        }
    }

    /// Get a single partition from the response
    ///
    /// If this is the first partition, you get it immediately,
    /// otherwise it will incur an additional request to get the partition.
    ///
    /// Returns `None` if the requested partition does not exist.
    pub async fn partition(&self, index: usize) -> SnowflakeResult<Option<Partition>> {
        if index == 0 {
            Ok(Some(self.first_partition()))
        } else if index >= self.num_partitions() {
            Ok(None)
        } else {
            log::debug!("Fetching partition {} of {}", index, self.num_partitions());
            let session = &self.statement.session;
            let url = session.host.trim_end_matches('/').to_owned() + &self.statement_status_url;
            let response = session
                .http
                .get(&url)
                .query(&[("partition", index)])
                .send()
                .await?
                .json::<SnowflakeWireResult<WirePartitionResponse>>()
                .await?
                .into_result()?;

            Ok(Some(Partition {
                index,
                meta_data: self.result_set_meta_data.clone(),
                data: response.data,
            }))
        }
    }

    /// Stream over all partitions in the response
    ///
    /// This incurs IO, so try to only use this once.
    ///
    /// In order to improve concurrency, this will buffer one partition,
    /// so you can have one partition in flight while processing another.
    pub fn partitions(&self) -> impl TryStream<Ok = Partition, Error = SnowflakeError> + '_ {
        let partition_futures = (0..self.num_partitions().max(1)).map(|index| self.partition(index));
        futures::stream::iter(partition_futures)
            .buffered(1)
            .try_filter_map(|partition| futures::future::ready(Ok(partition)))
    }

    /// Concatenate all partitions into a single partition
    ///
    /// This incurs IO and could use an unbounded amount of memory.
    pub async fn concat_partitions(&self) -> SnowflakeResult<Partition> {
        if self.num_partitions() <= 1 {
            return Ok(self.first_partition());
        }
        let mut cells = Vec::with_capacity(self.num_rows());
        for partition in self.partitions().try_collect::<Vec<_>>().await? {
            cells.extend(partition.data.iter().cloned());
        }
        Ok(Partition {
            index: 0,
            meta_data: self.result_set_meta_data.clone(),
            data: Arc::new(cells),
        })
    }
}

//
// Wire types
//

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireStatementMetaData {
    pub num_rows: usize,
    pub row_type: Vec<ColumnType>,
    // Only the number of partitions matters
    #[serde(default)]
    pub partition_info: Vec<WirePartitionInfo>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WirePartitionInfo {}

/// The type of a column in the result set
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ColumnType {
    /// The name of the column
    pub name: String,
    /// The database the column is in
    pub database: String,
    /// The schema the column is in
    pub schema: String,
    /// The table the column is in
    pub table: String,
    /// How many decimal digits of precision the column has
    /// (this is usually 38)
    pub precision: Option<u32>,
    /// The length of the column in bytes
    pub byte_length: Option<usize>,
    /// The format used when serializing the type to String before returning it
    #[serde(rename = "type")]
    pub data_type: RawCell,
    // The number of decimal digits of scale the column has (after the decimal point, usually 0)
    pub scale: Option<i32>,
    // Whether the column can be null
    pub nullable: bool,
}

impl WireQueryResponse {
    fn hydrate(self, statement: Statement) -> QueryResponse {
        QueryResponse {
            result_set_meta_data: self.result_set_meta_data,
            data: self.data,
            statement_status_url: self.statement_status_url,
            statement,
        }
    }
}

#[derive(Deserialize, Debug)]
struct WireError {
    code: String,
    message: String,
}

// Body of a 202: the statement was accepted but has not finished
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WirePending {
    statement_handle: String,
    statement_status_url: String,
}

#[derive(Deserialize, Debug)]
struct WirePartitionResponse {
    data: Arc<StringTable>,
}

#[derive(Serialize, Debug, Clone)]
struct WireStatement {
    statement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
    database: String,
    warehouse: String,
    schema: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WireQueryResponse {
    result_set_meta_data: WireStatementMetaData,
    data: Arc<StringTable>,
    statement_status_url: String,
}
