//! Sequence allocator for document numbers.
//!
//! Counters live in `sequences`, one row per (business, key, period). A
//! number is drawn by locking that row `FOR UPDATE`, bumping `last_number`,
//! and returning the new value inside the caller's transaction, so a rollback
//! of the surrounding work also rolls back the increment.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use receipta_core::LedgerError;
use receipta_core::sequence::{SEQUENCE_MAX_ATTEMPTS, SequenceKey, next_number};

use crate::entities::sequences;

use super::db_err;

/// Sequence repository.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    db: DatabaseConnection,
}

impl SequenceRepository {
    /// Creates a new sequence repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Allocates the next number in its own transaction.
    ///
    /// Ledger operations call [`SequenceRepository::next_in`] with their own
    /// transaction instead.
    pub async fn next(
        &self,
        business_id: Uuid,
        key: SequenceKey,
        period: i32,
    ) -> Result<i32, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let number = Self::next_in(&txn, business_id, key, period).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(number)
    }

    /// Allocates the next number inside an open transaction.
    ///
    /// The first allocation of a period inserts the row with `last_number = 1`
    /// using `ON CONFLICT DO NOTHING`. Losing that race means another caller
    /// created the row first, so the loop goes back to the locked read.
    ///
    /// # Errors
    ///
    /// Returns `SequenceExhausted` after [`SEQUENCE_MAX_ATTEMPTS`] attempts or
    /// when the counter would overflow.
    #[instrument(skip(conn))]
    pub async fn next_in<C>(
        conn: &C,
        business_id: Uuid,
        key: SequenceKey,
        period: i32,
    ) -> Result<i32, LedgerError>
    where
        C: ConnectionTrait,
    {
        let exhausted = |attempts| LedgerError::SequenceExhausted {
            key,
            period,
            attempts,
        };

        for attempt in 1..=SEQUENCE_MAX_ATTEMPTS {
            let existing = sequences::Entity::find()
                .filter(sequences::Column::BusinessId.eq(business_id))
                .filter(sequences::Column::SequenceKey.eq(sequences_key(key)))
                .filter(sequences::Column::Period.eq(period))
                .lock_exclusive()
                .one(conn)
                .await
                .map_err(db_err)?;

            if let Some(row) = existing {
                let next = next_number(row.last_number).ok_or_else(|| exhausted(attempt))?;
                let mut active: sequences::ActiveModel = row.into();
                active.last_number = Set(next);
                active.updated_at = Set(Utc::now().into());
                active.update(conn).await.map_err(db_err)?;

                debug!(number = next, "allocated sequence number");
                return Ok(next);
            }

            let now = Utc::now().into();
            let row = sequences::ActiveModel {
                id: Set(Uuid::new_v4()),
                business_id: Set(business_id),
                sequence_key: Set(sequences_key(key)),
                period: Set(period),
                last_number: Set(1),
                created_at: Set(now),
                updated_at: Set(now),
            };
            let inserted = sequences::Entity::insert(row)
                .on_conflict(
                    OnConflict::columns([
                        sequences::Column::BusinessId,
                        sequences::Column::SequenceKey,
                        sequences::Column::Period,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(conn)
                .await
                .map_err(db_err)?;

            if inserted == 1 {
                debug!(number = 1, "created sequence row");
                return Ok(1);
            }

            warn!(attempt, "sequence row created concurrently, retrying");
        }

        Err(exhausted(SEQUENCE_MAX_ATTEMPTS))
    }

    /// Returns the last number issued, or `None` if the period has not started.
    pub async fn current(
        &self,
        business_id: Uuid,
        key: SequenceKey,
        period: i32,
    ) -> Result<Option<i32>, LedgerError> {
        let row = sequences::Entity::find()
            .filter(sequences::Column::BusinessId.eq(business_id))
            .filter(sequences::Column::SequenceKey.eq(sequences_key(key)))
            .filter(sequences::Column::Period.eq(period))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(|r| r.last_number))
    }
}

fn sequences_key(key: SequenceKey) -> crate::entities::sea_orm_active_enums::SequenceKey {
    key.into()
}
