use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use futures_util::TryStreamExt;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AggregateId, EventEnvelope, EventId, EventStoreError, Result, Version,
    store::{
        AppendOptions, EventStore, EventStream, RecordedEvent, RecordedEventStream, StreamAppend,
        validate_batch, validate_events_for_append,
    },
};

const SELECT_COLUMNS: &str =
    "SELECT id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata FROM events";

const PAGE_QUERY: &str = "SELECT seq, id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata \
     FROM events WHERE seq > $1 ORDER BY seq ASC LIMIT $2";

/// Rows fetched per round trip when streaming the log.
const PAGE_SIZE: i64 = 256;

/// Advisory lock taken by every appending transaction.
const APPEND_LOCK_KEY: i64 = 0x6576_656e_7473;

/// PostgreSQL-backed event store.
///
/// Every append runs in one transaction; a batch shares a single transaction
/// across all of its streams, so a failure on any stream rolls back the rest.
///
/// Appending transactions hold a transaction-scoped advisory lock, so `seq`
/// values become visible in increasing order and log readers can resume
/// with `seq > last_seen`.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and returns a store over a fresh pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<EventEnvelope> {
        let metadata_json: serde_json::Value = row.try_get("metadata")?;
        let metadata: HashMap<String, serde_json::Value> = serde_json::from_value(metadata_json)?;

        Ok(EventEnvelope {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            aggregate_id: AggregateId::from_uuid(row.try_get::<Uuid, _>("aggregate_id")?),
            aggregate_type: row.try_get("aggregate_type")?,
            version: Version::new(row.try_get("version")?),
            timestamp: row.try_get("timestamp")?,
            payload: row.try_get("payload")?,
            metadata,
        })
    }

    fn row_to_recorded(row: PgRow) -> Result<RecordedEvent> {
        let seq: i64 = row.try_get("seq")?;
        Ok(RecordedEvent {
            sequence: seq.max(0) as u64,
            envelope: Self::row_to_event(row)?,
        })
    }

    async fn lock_appends(tx: &mut Transaction<'_, Postgres>) -> Result<()> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(APPEND_LOCK_KEY)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    fn page_stream(&self, after: u64) -> RecordedEventStream {
        let cursor = PageCursor {
            pool: self.pool.clone(),
            after: i64::try_from(after).unwrap_or(i64::MAX),
            buffered: VecDeque::new(),
            exhausted: false,
        };
        Box::pin(futures_util::stream::try_unfold(cursor, PageCursor::next))
    }

    /// Writes one stream segment inside an open transaction.
    async fn append_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        aggregate_id: AggregateId,
        events: &[EventEnvelope],
        options: &AppendOptions,
    ) -> Result<Version> {
        if let Some(expected) = options.expected_version {
            let current: Option<i64> =
                sqlx::query_scalar("SELECT MAX(version) FROM events WHERE aggregate_id = $1")
                    .bind(aggregate_id.as_uuid())
                    .fetch_one(&mut **tx)
                    .await?;

            let actual = Version::new(current.unwrap_or(0));
            if actual != expected {
                return Err(EventStoreError::ConcurrencyConflict {
                    aggregate_id,
                    expected,
                    actual,
                });
            }
        }

        let mut last_version = Version::initial();
        for event in events {
            let metadata_json = serde_json::to_value(&event.metadata)?;

            sqlx::query(
                r#"
                INSERT INTO events (id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(event.event_id.as_uuid())
            .bind(&event.event_type)
            .bind(event.aggregate_id.as_uuid())
            .bind(&event.aggregate_type)
            .bind(event.version.as_i64())
            .bind(event.timestamp)
            .bind(&event.payload)
            .bind(metadata_json)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                // A concurrent writer got the same version first.
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("unique_aggregate_version")
                {
                    return EventStoreError::ConcurrencyConflict {
                        aggregate_id,
                        expected: options.expected_version.unwrap_or_default(),
                        actual: event.version,
                    };
                }
                EventStoreError::Database(e)
            })?;

            last_version = event.version;
        }

        Ok(last_version)
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[tracing::instrument(skip(self, events), fields(count = events.len()))]
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        let aggregate_id = validate_events_for_append(&events)?;

        let mut tx = self.pool.begin().await?;
        Self::lock_appends(&mut tx).await?;
        let version = Self::append_in_tx(&mut tx, aggregate_id, &events, &options).await?;
        tx.commit().await?;

        Ok(version)
    }

    #[tracing::instrument(skip(self, batch), fields(streams = batch.len()))]
    async fn append_batch(&self, batch: Vec<StreamAppend>) -> Result<Vec<Version>> {
        let ids = validate_batch(&batch)?;

        // Dropping the transaction on any error rolls back the streams already written.
        let mut tx = self.pool.begin().await?;
        Self::lock_appends(&mut tx).await?;
        let mut versions = Vec::with_capacity(batch.len());
        for (stream, aggregate_id) in batch.iter().zip(ids) {
            versions.push(
                Self::append_in_tx(&mut tx, aggregate_id, &stream.events, &stream.options).await?,
            );
        }
        tx.commit().await?;

        Ok(versions)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE aggregate_id = $1 ORDER BY version ASC"
        ))
        .bind(aggregate_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn get_events_by_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE event_type = $1 ORDER BY seq ASC"
        ))
        .bind(event_type)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn get_events_by_metadata(&self, key: &str, value: &str) -> Result<Vec<EventEnvelope>> {
        let mut filter = serde_json::Map::new();
        filter.insert(key.to_string(), serde_json::Value::from(value));

        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE metadata @> $1 ORDER BY seq ASC"
        ))
        .bind(serde_json::Value::Object(filter))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        Ok(Box::pin(
            self.page_stream(0).map_ok(|recorded| recorded.envelope),
        ))
    }

    async fn stream_events_after(&self, after: u64) -> Result<RecordedEventStream> {
        Ok(self.page_stream(after))
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM events WHERE aggregate_id = $1")
                .bind(aggregate_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(version.map(Version::new))
    }
}

/// Keyset pagination over the log, one page in memory at a time.
struct PageCursor {
    pool: PgPool,
    after: i64,
    buffered: VecDeque<RecordedEvent>,
    exhausted: bool,
}

impl PageCursor {
    async fn next(mut self) -> Result<Option<(RecordedEvent, Self)>> {
        if self.buffered.is_empty() && !self.exhausted {
            let rows = sqlx::query(PAGE_QUERY)
                .bind(self.after)
                .bind(PAGE_SIZE)
                .fetch_all(&self.pool)
                .await?;
            self.exhausted = rows.len() < PAGE_SIZE as usize;
            for row in rows {
                self.buffered
                    .push_back(PostgresEventStore::row_to_recorded(row)?);
            }
            if let Some(last) = self.buffered.back() {
                self.after = i64::try_from(last.sequence).unwrap_or(i64::MAX);
            }
        }

        Ok(self.buffered.pop_front().map(|event| (event, self)))
    }
}
