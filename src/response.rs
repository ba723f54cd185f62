//! Query results.
//!
//! A [`Response`] is an immutable snapshot of a decoded Native stream:
//! column names, type strings and row-major values, plus the query
//! [`Summary`] the server reports out of band.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ClientError;
use crate::value::Value;

/// Query statistics from the `X-ClickHouse-Summary` header.
///
/// The server sends every counter as a JSON string; plain numbers are
/// accepted as well. Missing counters are zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Summary {
    #[serde(deserialize_with = "lenient_u64")]
    pub read_rows: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub read_bytes: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub written_rows: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub written_bytes: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub total_rows_to_read: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub result_rows: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub result_bytes: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub elapsed_ns: u64,
}

impl Summary {
    /// Parse the JSON value of a summary header.
    ///
    /// # Example
    /// ```
    /// use chnative::Summary;
    ///
    /// let summary = Summary::from_header(r#"{"read_rows":"10","read_bytes":"80"}"#).unwrap();
    /// assert_eq!(summary.read_rows, 10);
    /// assert_eq!(summary.read_bytes, 80);
    /// ```
    pub fn from_header(header: &str) -> Result<Self, ClientError> {
        serde_json::from_str(header).map_err(|e| ClientError::Summary(e.to_string()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Counter {
    Number(u64),
    Text(String),
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match Counter::deserialize(deserializer)? {
        Counter::Number(n) => Ok(n),
        Counter::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid counter '{}'", s))),
    }
}

/// Decoded result of a query.
///
/// Every row holds exactly `columns().len()` values, index-aligned with
/// `columns()` and `types()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    columns: Vec<String>,
    types: Vec<String>,
    rows: Vec<Vec<Value>>,
    summary: Option<Summary>,
}

impl Response {
    /// Create a response without a summary.
    pub fn new(columns: Vec<String>, types: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            types,
            rows,
            summary: None,
        }
    }

    /// Attach the query summary.
    pub fn with_summary(mut self, summary: Summary) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Column names in wire order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Column type strings, aligned with `columns()`.
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Rows in stream order.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Query summary, if the transport reported one.
    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first column with this name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value at a row and named column.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    /// Iterate rows as column name to value maps.
    ///
    /// With duplicate column names the last column wins.
    pub fn iter_maps(&self) -> impl Iterator<Item = HashMap<&str, &Value>> + '_ {
        self.rows.iter().map(move |row| {
            self.columns
                .iter()
                .map(String::as_str)
                .zip(row.iter())
                .collect()
        })
    }

    /// All rows as owned column name to value maps.
    pub fn to_maps(&self) -> Vec<HashMap<String, Value>> {
        self.rows
            .iter()
            .map(|row| self.columns.iter().cloned().zip(row.iter().cloned()).collect())
            .collect()
    }

    /// Rows as a JSON array of objects.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.rows
                .iter()
                .map(|row| {
                    serde_json::Value::Object(
                        self.columns
                            .iter()
                            .cloned()
                            .zip(row.iter().map(Value::to_json))
                            .collect(),
                    )
                })
                .collect(),
        )
    }

    /// Take ownership of the rows.
    pub fn into_rows(self) -> Vec<Vec<Value>> {
        self.rows
    }
}
