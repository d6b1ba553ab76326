use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// The shapes of result a metrics backend can return for an instant query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Scalar(f64),
    /// The value of each series in the result, in the order the backend returned them.
    Vector(Vec<f64>),
    /// Any other result type, such as a matrix or a string.
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("{error_type}: {message}")]
    Api { error_type: String, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// A time-series backend that evaluates instant queries.
#[async_trait]
pub trait MetricBackend: Send + Sync {
    async fn query(&self, query: &str, timeout: Duration) -> Result<QueryValue, BackendError>;
}

#[derive(Debug, thiserror::Error)]
pub enum QueryFailure {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("unexpected result type '{0}'")]
    UnexpectedResultType(String),
}

/// A query that could not be reduced to a number. Carries the query text for diagnosis.
#[derive(Debug, thiserror::Error)]
#[error("query `{query}` failed: {source}")]
pub struct QueryExecutionError {
    pub query: String,
    pub source: QueryFailure,
}

impl QueryExecutionError {
    fn new(query: &str, source: impl Into<QueryFailure>) -> Self {
        Self {
            query: query.to_string(),
            source: source.into(),
        }
    }
}

/// Evaluates a query and reduces the result to a single number.
///
/// A scalar is returned as is. A vector yields the value of its first element, or `0.0` when it
/// is empty because no series matched. Any other result type is an error.
#[derive(Clone)]
pub struct MetricQueryExecutor {
    backend: Arc<dyn MetricBackend>,
    timeout: Duration,
}

impl MetricQueryExecutor {
    pub fn new(backend: Arc<dyn MetricBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn execute(&self, query: &str) -> Result<f64, QueryExecutionError> {
        log::trace!("Executing query: {query}");

        let value = tokio::time::timeout(self.timeout, self.backend.query(query, self.timeout))
            .await
            .map_err(|_| QueryExecutionError::new(query, QueryFailure::Timeout(self.timeout)))?
            .map_err(|e| QueryExecutionError::new(query, e))?;

        match value {
            QueryValue::Scalar(value) => Ok(value),
            QueryValue::Vector(values) => Ok(values.first().copied().unwrap_or(0.0)),
            QueryValue::Other(result_type) => Err(QueryExecutionError::new(
                query,
                QueryFailure::UnexpectedResultType(result_type),
            )),
        }
    }
}
