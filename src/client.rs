//! Query execution over a pluggable transport.
//!
//! The HTTP exchange itself is left to a [`Transport`] implementation. A
//! [`Connection`] builds the request from its [`ClientConfig`], hands the
//! returned body to the Native reader and attaches the query summary.

use std::fmt;

use tracing::{debug, debug_span};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::reader::NativeReader;
use crate::response::{Response, Summary};
use crate::source::BoxedSource;

/// Per-query options.
///
/// # Example
/// ```
/// use chnative::QueryOptions;
///
/// let options = QueryOptions::new().with_param("max_threads", "4");
/// assert_eq!(options.params().len(), 1);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryOptions {
    params: Vec<(String, String)>,
}

impl QueryOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a URL query parameter, replacing an earlier one with the same key.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.params.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.params.push((key, value)),
        }
        self
    }

    /// Parameters in insertion order.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Everything a transport needs to issue one query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryRequest<'a> {
    /// `scheme://host:port` of the server
    pub base_url: String,
    /// SQL text, sent as the request body
    pub sql: &'a str,
    /// URL query parameters
    pub params: Vec<(String, String)>,
    /// Request headers
    pub headers: Vec<(&'static str, String)>,
}

/// A successful transport exchange.
pub struct TransportResult {
    /// Native format response body
    pub body: BoxedSource,
    /// Parsed `X-ClickHouse-Summary` header, if present
    pub summary: Option<Summary>,
}

impl fmt::Debug for TransportResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResult")
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

/// Issues queries and returns their raw bodies.
///
/// Implementations report a non-success status as `ClientError::Query`
/// carrying the server's message, and connection failures as
/// `ClientError::Transport`. Retries and timeouts are theirs to handle.
pub trait Transport {
    /// Execute one query.
    fn execute(&self, request: &QueryRequest<'_>) -> Result<TransportResult, ClientError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &QueryRequest<'_>) -> Result<TransportResult, ClientError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, request: &QueryRequest<'_>) -> Result<TransportResult, ClientError> {
        (**self).execute(request)
    }
}

/// A configured client bound to a transport.
#[derive(Debug)]
pub struct Connection<T> {
    config: ClientConfig,
    transport: T,
}

impl<T: Transport> Connection<T> {
    /// Create a connection.
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    /// The configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run a query and decode its Native body.
    ///
    /// # Errors
    /// - `ClientError::Query` / `ClientError::Transport` from the transport
    /// - `ClientError::Reader` if the body cannot be decoded
    pub fn query(&self, sql: &str, options: &QueryOptions) -> Result<Response, ClientError> {
        let span = debug_span!("query", database = %self.config.database);
        let _guard = span.enter();

        let request = QueryRequest {
            base_url: self.config.base_url(),
            sql,
            params: self.config.query_params(options),
            headers: self.config.default_headers(),
        };
        debug!(
            base_url = %request.base_url,
            params = request.params.len(),
            "Executing query"
        );

        let result = self.transport.execute(&request)?;
        let response = NativeReader::new(result.body).read_response()?;
        Ok(match result.summary {
            Some(summary) => response.with_summary(summary),
            None => response,
        })
    }
}
