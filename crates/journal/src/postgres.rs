use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::store::{AppendOptions, EntryStream, SagaJournal, validate_append};
use crate::{
    EntryId, JournalEntry, JournalError, JournalQuery, OrderId, Result, SagaId, Sequence,
};

const SELECT_COLUMNS: &str =
    "SELECT entry_id, entry_type, saga_id, order_id, sequence, recorded_at, payload FROM rebook_journal";

/// PostgreSQL-backed journal.
#[derive(Clone)]
pub struct PostgresJournal {
    pool: PgPool,
}

impl PostgresJournal {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and returns a journal over the new pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the schema migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_entry(row: PgRow) -> Result<JournalEntry> {
        Ok(JournalEntry {
            entry_id: EntryId::from_uuid(row.try_get::<Uuid, _>("entry_id")?),
            entry_type: row.try_get("entry_type")?,
            saga_id: SagaId::from_uuid(row.try_get::<Uuid, _>("saga_id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            sequence: Sequence::new(row.try_get("sequence")?),
            recorded_at: row.try_get("recorded_at")?,
            payload: row.try_get("payload")?,
        })
    }
}

#[async_trait]
impl SagaJournal for PostgresJournal {
    async fn append(&self, entries: Vec<JournalEntry>, options: AppendOptions) -> Result<Sequence> {
        validate_append(&entries)?;

        let saga_id = entries[0].saga_id;
        let mut tx = self.pool.begin().await?;

        if let Some(expected) = options.expected_sequence {
            let head: Option<i64> =
                sqlx::query_scalar("SELECT MAX(sequence) FROM rebook_journal WHERE saga_id = $1")
                    .bind(saga_id.as_uuid())
                    .fetch_one(&mut *tx)
                    .await?;
            let actual = Sequence::new(head.unwrap_or(0));
            if actual != expected {
                tracing::debug!(%saga_id, %expected, %actual, "journal sequence conflict");
                return Err(JournalError::SequenceConflict {
                    saga_id,
                    expected,
                    actual,
                });
            }
        }

        let mut last = Sequence::initial();
        for entry in &entries {
            sqlx::query(
                r#"
                INSERT INTO rebook_journal (entry_id, entry_type, saga_id, order_id, sequence, recorded_at, payload)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(entry.entry_id.as_uuid())
            .bind(&entry.entry_type)
            .bind(entry.saga_id.as_uuid())
            .bind(entry.order_id.as_uuid())
            .bind(entry.sequence.as_i64())
            .bind(entry.recorded_at)
            .bind(&entry.payload)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("unique_saga_sequence")
                {
                    return JournalError::SequenceConflict {
                        saga_id,
                        expected: options.expected_sequence.unwrap_or(Sequence::initial()),
                        actual: entry.sequence,
                    };
                }
                JournalError::Database(e)
            })?;
            last = entry.sequence;
        }

        tx.commit().await?;
        metrics::counter!("journal_entries_appended_total", "backend" => "postgres")
            .increment(entries.len() as u64);
        tracing::debug!(%saga_id, head = %last, entries = entries.len(), "journal append committed");
        Ok(last)
    }

    async fn read_saga(&self, saga_id: SagaId) -> Result<Vec<JournalEntry>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE saga_id = $1 ORDER BY sequence ASC"
        ))
        .bind(saga_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_entry).collect()
    }

    async fn query(&self, query: JournalQuery) -> Result<Vec<JournalEntry>> {
        let mut sql = format!("{SELECT_COLUMNS} WHERE 1=1");
        let mut n = 0;

        if query.saga_id.is_some() {
            n += 1;
            sql.push_str(&format!(" AND saga_id = ${n}"));
        }
        if query.order_id.is_some() {
            n += 1;
            sql.push_str(&format!(" AND order_id = ${n}"));
        }
        if query.entry_types.is_some() {
            n += 1;
            sql.push_str(&format!(" AND entry_type = ANY(${n})"));
        }
        if query.recorded_after.is_some() {
            n += 1;
            sql.push_str(&format!(" AND recorded_at >= ${n}"));
        }
        if query.recorded_before.is_some() {
            n += 1;
            sql.push_str(&format!(" AND recorded_at <= ${n}"));
        }
        sql.push_str(" ORDER BY position ASC");
        if query.limit.is_some() {
            n += 1;
            sql.push_str(&format!(" LIMIT ${n}"));
        }

        let mut q = sqlx::query(&sql);
        if let Some(id) = query.saga_id {
            q = q.bind(id.as_uuid());
        }
        if let Some(id) = query.order_id {
            q = q.bind(id.as_uuid());
        }
        if let Some(types) = query.entry_types {
            q = q.bind(types);
        }
        if let Some(after) = query.recorded_after {
            q = q.bind(after);
        }
        if let Some(before) = query.recorded_before {
            q = q.bind(before);
        }
        if let Some(limit) = query.limit {
            q = q.bind(limit as i64);
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_entry).collect()
    }

    async fn stream_all(&self) -> Result<EntryStream> {
        use futures_util::stream;

        // Rows are fetched up front: the returned stream must not borrow the pool.
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY position ASC"))
            .fetch_all(&self.pool)
            .await?;

        Ok(Box::pin(stream::iter(
            rows.into_iter().map(Self::row_to_entry),
        )))
    }

    async fn head(&self, saga_id: SagaId) -> Result<Option<Sequence>> {
        let head: Option<i64> =
            sqlx::query_scalar("SELECT MAX(sequence) FROM rebook_journal WHERE saga_id = $1")
                .bind(saga_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;
        Ok(head.map(Sequence::new))
    }
}
