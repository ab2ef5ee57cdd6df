//! Stream-level Message DB function calls

use chrono::{DateTime, NaiveDateTime, Utc};
use deadpool_postgres::Pool;
use serde_json::Value;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::message_db::{
    error::{Error, Result},
    types::{Message, WriteMessage},
};

/// Options for reading a single stream
#[derive(Debug, Clone)]
pub struct StreamReadOptions {
    pub stream_name: String,
    /// Starting position (inclusive, 0-based)
    pub position: i64,
    pub batch_size: i64,
}

impl StreamReadOptions {
    pub fn new(stream_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            position: 0,
            batch_size: 1000,
        }
    }

    pub fn with_position(mut self, position: i64) -> Self {
        self.position = position;
        self
    }

    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Options that read the last `count` messages of a stream at `version`
    pub fn tail(stream_name: impl Into<String>, version: i64, count: i64) -> Self {
        Self::new(stream_name)
            .with_position((version - count + 1).max(0))
            .with_batch_size(count)
    }
}

/// Append a message, returning its stream position
pub async fn write_message(pool: &Pool, schema_name: &str, msg: WriteMessage) -> Result<i64> {
    let conn = pool.get().await?;

    let sql = format!(
        "SELECT {}.write_message($1, $2, $3, $4, $5, $6)",
        schema_name
    );
    let id = msg.id.to_string();

    let result = conn
        .query_one(
            &sql,
            &[
                &id,
                &msg.stream_name,
                &msg.message_type,
                &msg.data,
                &msg.metadata,
                &msg.expected_version,
            ],
        )
        .await;

    match result {
        Ok(row) => Ok(row.get(0)),
        Err(e) => {
            let wrong_version = e
                .as_db_error()
                .map(|db| db.message().contains("Wrong expected version"))
                .unwrap_or(false);
            if wrong_version {
                return Err(Error::ConcurrencyError {
                    stream_name: msg.stream_name,
                    expected_version: msg.expected_version.unwrap_or(-1),
                });
            }
            Err(e.into())
        }
    }
}

/// Read messages from a single stream in position order
pub async fn get_stream_messages(
    pool: &Pool,
    schema_name: &str,
    options: StreamReadOptions,
) -> Result<Vec<Message>> {
    let conn = pool.get().await?;

    let sql = format!(
        "SELECT * FROM {}.get_stream_messages($1, $2, $3, NULL)",
        schema_name
    );

    let rows = conn
        .query(
            &sql,
            &[&options.stream_name, &options.position, &options.batch_size],
        )
        .await?;

    rows.iter().map(parse_message_row).collect()
}

/// Position of the last message in a stream, or None if the stream is empty
pub async fn stream_version(pool: &Pool, schema_name: &str, stream_name: &str) -> Result<Option<i64>> {
    let conn = pool.get().await?;

    let sql = format!("SELECT {}.stream_version($1)", schema_name);
    let row = conn.query_one(&sql, &[&stream_name]).await?;

    Ok(row.get(0))
}

fn parse_message_row(row: &Row) -> Result<Message> {
    // Message DB hands ids and payloads back as text
    let id_str: String = row.get("id");
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| Error::DatabaseError(format!("Invalid UUID in database: {}", e)))?;

    let data_str: String = row.get("data");
    let data: Value = serde_json::from_str(&data_str)
        .map_err(|e| Error::DatabaseError(format!("Invalid JSON in data column: {}", e)))?;

    let metadata: Option<Value> = row
        .get::<_, Option<String>>("metadata")
        .and_then(|s| serde_json::from_str(&s).ok());

    // Stored without a zone, written in UTC
    let naive_time: NaiveDateTime = row.get("time");

    Ok(Message {
        id,
        stream_name: row.get("stream_name"),
        message_type: row.get("type"),
        data,
        metadata,
        position: row.get("position"),
        global_position: row.get("global_position"),
        time: DateTime::<Utc>::from_naive_utc_and_offset(naive_time, Utc),
    })
}
