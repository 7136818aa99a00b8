//! The two datasets the propensity model trains and predicts on.
use crate::cells::Cell;
use crate::config::WarehouseConfig;
use crate::connection::{query_once, Warehouse};
use crate::errors::SnowflakeResult;
use crate::statement::QueryResponse;
use crate::SnowflakeClient;

pub const TRAINING_DATA_QUERY: &str = "SELECT * FROM PROPENSITY_TRAINING_DATA";
pub const PREDICT_DATA_QUERY: &str = "SELECT * FROM PROPENSITY_PREDICT_DATA";

/// Every row of a query, fully materialized, with column names in output order
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub rows: Vec<Vec<Cell>>,
    pub columns: Vec<String>,
}

impl ResultSet {
    pub fn into_parts(self) -> (Vec<Vec<Cell>>, Vec<String>) {
        (self.rows, self.columns)
    }

    /// Download and decode every partition of a response
    pub(crate) async fn from_response(response: &QueryResponse) -> SnowflakeResult<ResultSet> {
        let columns = response.column_names();
        let rows = response.concat_partitions().await?.cells()?;
        Ok(ResultSet { rows, columns })
    }
}

/// Fetch all of `PROPENSITY_TRAINING_DATA`
pub async fn fetch_training_data(config: &WarehouseConfig) -> SnowflakeResult<ResultSet> {
    fetch_training_data_from(&SnowflakeClient::from_config(config), config).await
}

/// Fetch all of `PROPENSITY_PREDICT_DATA`
pub async fn fetch_predict_data(config: &WarehouseConfig) -> SnowflakeResult<ResultSet> {
    fetch_predict_data_from(&SnowflakeClient::from_config(config), config).await
}

pub async fn fetch_training_data_from<W: Warehouse>(
    warehouse: &W,
    config: &WarehouseConfig,
) -> SnowflakeResult<ResultSet> {
    query_once(warehouse, config, TRAINING_DATA_QUERY).await
}

pub async fn fetch_predict_data_from<W: Warehouse>(
    warehouse: &W,
    config: &WarehouseConfig,
) -> SnowflakeResult<ResultSet> {
    query_once(warehouse, config, PREDICT_DATA_QUERY).await
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::connection::WarehouseConnection;
    use crate::credentials::tests::{config, PKCS8_PEM};
    use crate::credentials::{Authenticator, CredentialBundle};
    use crate::errors::{ConnectionError, SnowflakeError};

    #[derive(Default)]
    struct Calls {
        connects: usize,
        closes: usize,
        queries: Vec<String>,
        credentials: Option<CredentialBundle>,
    }

    /// Answers every statement with `result`, or a server error when there is none
    #[derive(Clone, Default)]
    struct FakeWarehouse {
        calls: Arc<Mutex<Calls>>,
        result: Option<ResultSet>,
    }

    struct FakeConnection {
        calls: Arc<Mutex<Calls>>,
        result: Option<ResultSet>,
    }

    impl Warehouse for FakeWarehouse {
        type Connection = FakeConnection;

        async fn connect(
            &self,
            credentials: CredentialBundle,
        ) -> Result<FakeConnection, ConnectionError> {
            let mut calls = self.calls.lock().unwrap();
            calls.connects += 1;
            calls.credentials = Some(credentials);
            Ok(FakeConnection {
                calls: self.calls.clone(),
                result: self.result.clone(),
            })
        }
    }

    impl WarehouseConnection for FakeConnection {
        async fn query(&mut self, sql: &str) -> SnowflakeResult<ResultSet> {
            self.calls.lock().unwrap().queries.push(sql.to_owned());
            self.result.clone().ok_or_else(|| SnowflakeError::ServerError {
                code: "002003".into(),
                message: "Object does not exist".into(),
            })
        }

        async fn close(self) {
            self.calls.lock().unwrap().closes += 1;
        }
    }

    fn two_rows() -> ResultSet {
        ResultSet {
            rows: vec![
                vec![Cell::Int(1), Cell::Varchar("a".into())],
                vec![Cell::Int(2), Cell::Varchar("b".into())],
            ],
            columns: vec!["ID".into(), "VAL".into()],
        }
    }

    fn warehouse(result: Option<ResultSet>) -> FakeWarehouse {
        FakeWarehouse {
            calls: Arc::default(),
            result,
        }
    }

    #[tokio::test]
    async fn training_data_end_to_end() -> SnowflakeResult<()> {
        let _ = env_logger::try_init();
        let pem = format!("{}\n", PKCS8_PEM.trim_end());
        let config = config(Some(pem.as_bytes()));
        let warehouse = warehouse(Some(two_rows()));

        let (rows, columns) = fetch_training_data_from(&warehouse, &config)
            .await?
            .into_parts();

        assert_eq!(
            rows,
            vec![
                vec![Cell::Int(1), Cell::Varchar("a".into())],
                vec![Cell::Int(2), Cell::Varchar("b".into())],
            ]
        );
        assert_eq!(columns, vec!["ID", "VAL"]);

        let calls = warehouse.calls.lock().unwrap();
        assert_eq!(calls.connects, 1);
        assert_eq!(calls.queries, vec![TRAINING_DATA_QUERY]);
        assert_eq!(calls.closes, 1);
        let credentials = calls.credentials.as_ref().unwrap();
        assert_eq!(credentials.authenticator, Authenticator::SnowflakeJwt);
        assert_eq!(credentials.user, "ml_service");
        Ok(())
    }

    #[tokio::test]
    async fn predict_data_queries_its_own_table() -> SnowflakeResult<()> {
        let config = config(Some(PKCS8_PEM.as_bytes()));
        let warehouse = warehouse(Some(two_rows()));

        let result = fetch_predict_data_from(&warehouse, &config).await?;
        assert_eq!(result.columns, vec!["ID", "VAL"]);

        let calls = warehouse.calls.lock().unwrap();
        assert_eq!(calls.queries, vec!["SELECT * FROM PROPENSITY_PREDICT_DATA"]);
        Ok(())
    }

    #[tokio::test]
    async fn column_order_is_preserved() -> SnowflakeResult<()> {
        let config = config(Some(PKCS8_PEM.as_bytes()));
        let reversed = ResultSet {
            rows: vec![vec![Cell::Varchar("a".into()), Cell::Int(1)]],
            columns: vec!["VAL".into(), "ID".into()],
        };
        let result = fetch_training_data_from(&warehouse(Some(reversed)), &config).await?;
        assert_eq!(result.columns, vec!["VAL", "ID"]);
        Ok(())
    }

    #[tokio::test]
    async fn missing_key_never_connects() {
        let warehouse = warehouse(Some(two_rows()));
        for key in [None, Some(b"".as_slice())] {
            let err = fetch_training_data_from(&warehouse, &config(key))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                SnowflakeError::Connection(ConnectionError::MissingPrivateKey)
            ));
            assert_eq!(
                err.to_string(),
                "Failed to connect to Snowflake: SNOWFLAKE_PRIVATE_KEY not set"
            );
        }
        let calls = warehouse.calls.lock().unwrap();
        assert_eq!(calls.connects, 0);
        assert!(calls.queries.is_empty());
    }

    #[tokio::test]
    async fn malformed_key_never_connects() {
        let warehouse = warehouse(Some(two_rows()));
        let err = fetch_predict_data_from(&warehouse, &config(Some(b"\x00\x01garbage".as_slice())))
            .await
            .unwrap_err();
        assert!(matches!(err, SnowflakeError::Connection(ConnectionError::Key(_))));
        assert_eq!(warehouse.calls.lock().unwrap().connects, 0);
    }

    #[tokio::test]
    async fn failed_query_still_closes_and_is_not_wrapped() {
        let config = config(Some(PKCS8_PEM.as_bytes()));
        let warehouse = warehouse(None);

        let err = fetch_training_data_from(&warehouse, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, SnowflakeError::ServerError { ref code, .. } if code == "002003"));

        let calls = warehouse.calls.lock().unwrap();
        assert_eq!(calls.queries.len(), 1);
        assert_eq!(calls.closes, 1);
    }

    #[tokio::test]
    async fn training_data_over_http() -> SnowflakeResult<()> {
        let config = config(Some(PKCS8_PEM.as_bytes()));
        let stub = crate::test_server::serve(vec![(
            200,
            crate::statement::tests::SINGLE_PARTITION.to_owned(),
        )])
        .await;
        let client = SnowflakeClient::from_config(&config).with_host(stub.host.clone());

        let (rows, columns) = fetch_training_data_from(&client, &config).await?.into_parts();
        assert_eq!(rows[1], vec![Cell::Int(2), Cell::Varchar("b".into())]);
        assert_eq!(columns, vec!["ID", "VAL"]);
        assert!(stub.requests()[0].starts_with("POST /api/v2/statements?nullable=true"));
        Ok(())
    }
}
