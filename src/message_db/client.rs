use deadpool_postgres::Pool;

use crate::message_db::{
    connection::MessageDbConfig,
    error::Result,
    operations::{self, StreamReadOptions},
    types::{Message, WriteMessage},
};

/// Pooled Message DB client
#[derive(Clone)]
pub struct MessageDbClient {
    pool: Pool,
    schema_name: String,
}

impl MessageDbClient {
    /// Build the pool and check that a connection can be obtained
    pub async fn new(config: MessageDbConfig) -> Result<Self> {
        let schema_name = config.schema_name.clone();
        let pool = config.build_pool()?;

        let _conn = pool.get().await?;

        Ok(Self { pool, schema_name })
    }

    /// Write a message, honouring `expected_version` when set
    pub async fn write_message(&self, msg: WriteMessage) -> Result<i64> {
        operations::write_message(&self.pool, &self.schema_name, msg).await
    }

    pub async fn get_stream_messages(&self, options: StreamReadOptions) -> Result<Vec<Message>> {
        operations::get_stream_messages(&self.pool, &self.schema_name, options).await
    }

    /// For a stream with n messages returns n-1; None when the stream is empty
    pub async fn stream_version(&self, stream_name: &str) -> Result<Option<i64>> {
        operations::stream_version(&self.pool, &self.schema_name, stream_name).await
    }
}
