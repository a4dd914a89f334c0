use crate::models::Card;
use database::{self, RepositoryError};
use sqlx::FromRow;

#[derive(FromRow)]
struct CardRecord {
    card_id: i64,
    card_number: i64,
    card_type: String,
    expiration_date: String,
    card_state: String,
    timestamp_creation: String,
    timestamp_modification: String,
}

impl From<CardRecord> for Card {
    fn from(record: CardRecord) -> Self {
        Card {
            card_id: record.card_id,
            card_number: record.card_number,
            card_type: record.card_type,
            expiration_date: record.expiration_date,
            card_state: record.card_state,
            timestamp_creation: record.timestamp_creation,
            timestamp_modification: record.timestamp_modification,
        }
    }
}

/// Every statement here filters on `card_id`, the table's primary key.
pub(crate) struct CardRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> CardRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    pub async fn list(&mut self) -> Result<Vec<Card>, RepositoryError> {
        let records = sqlx::query_as::<_, CardRecord>(
            "SELECT card_id, card_number, card_type, expiration_date, card_state, timestamp_creation, timestamp_modification
             FROM cards ORDER BY card_id",
        )
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(records.into_iter().map(|r| r.into()).collect())
    }

    pub async fn get(&mut self, card_id: i64) -> Result<Card, RepositoryError> {
        let record = sqlx::query_as::<_, CardRecord>(
            "SELECT card_id, card_number, card_type, expiration_date, card_state, timestamp_creation, timestamp_modification
             FROM cards WHERE card_id = $1",
        )
        .bind(card_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(record.into())
    }

    /// `Ok(false)` means the row is absent; a failed probe is an `Err`.
    pub async fn exists(&mut self, card_id: i64) -> Result<bool, RepositoryError> {
        let found: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM cards WHERE card_id = $1)",
        )
        .bind(card_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(found != 0)
    }

    pub async fn insert(&mut self, card: &Card) -> Result<i64, RepositoryError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO cards (card_id, card_number, card_type, expiration_date, card_state, timestamp_creation, timestamp_modification)
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING card_id",
        )
        .bind(card.card_id)
        .bind(card.card_number)
        .bind(&card.card_type)
        .bind(&card.expiration_date)
        .bind(&card.card_state)
        .bind(&card.timestamp_creation)
        .bind(&card.timestamp_modification)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(id)
    }

    /// Rewrites the row currently stored under `card_id`. The card may carry a
    /// different `card_id`, in which case the row is re-keyed.
    pub async fn update(&mut self, card_id: i64, card: &Card) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE cards SET card_id = $1, card_number = $2, card_type = $3, expiration_date = $4,
             card_state = $5, timestamp_creation = $6, timestamp_modification = $7
             WHERE card_id = $8",
        )
        .bind(card.card_id)
        .bind(card.card_number)
        .bind(&card.card_type)
        .bind(&card.expiration_date)
        .bind(&card.card_state)
        .bind(&card.timestamp_creation)
        .bind(&card.timestamp_modification)
        .bind(card_id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    pub async fn delete(&mut self, card_id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM cards WHERE card_id = $1")
            .bind(card_id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
