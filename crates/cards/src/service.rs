use crate::models::{Card, CardPatch, CreateCardRequest, UpdateCardRequest};
use crate::repository::CardRepository;
use database::{Database, RepositoryError};
use tracing::instrument;
use validator::Validate;

#[derive(Debug, thiserror::Error)]
pub enum CardError {
    #[error("Card not found")]
    NotFound,
    #[error("Card already exists")]
    Exists,
    #[error("Invalid body: {0}")]
    InvalidBody(String),
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<RepositoryError> for CardError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => CardError::NotFound,
            RepositoryError::UniqueViolation(_) => CardError::Exists,
            RepositoryError::Infrastructure(e) => CardError::Unexpected(e.to_string()),
        }
    }
}

pub struct CardService;

impl CardService {
    #[instrument(skip(db))]
    pub async fn list_cards(db: &Database) -> Result<Vec<Card>, CardError> {
        let mut conn = db.acquire().await?;
        let mut repo = CardRepository::new(&mut conn);

        let cards = repo.list().await?;
        Ok(cards)
    }

    #[instrument(skip(db))]
    pub async fn get_card(db: &Database, id: i64) -> Result<Card, CardError> {
        let mut conn = db.acquire().await?;
        let mut repo = CardRepository::new(&mut conn);

        let card = repo.get(id).await?;
        Ok(card)
    }

    /// Stores a new card under the caller-supplied `card_id` and returns it as
    /// persisted.
    #[instrument(skip(db))]
    pub async fn create_card(db: &Database, req: CreateCardRequest) -> Result<Card, CardError> {
        req.validate()
            .map_err(|e| CardError::InvalidBody(e.to_string()))?;

        let mut uow = db.begin().await?;
        let mut repo = CardRepository::new(uow.connection());

        match repo.exists(req.card_id).await {
            Ok(true) => return Err(CardError::Exists),
            Ok(false) => {}
            Err(e) => {
                tracing::error!("Existence probe for card {} failed: {}", req.card_id, e);
                return Err(CardError::Unexpected(e.to_string()));
            }
        }

        let mut card = Card::from(req);
        card.card_id = repo.insert(&card).await?;

        uow.commit().await?;

        Ok(card)
    }

    /// Merges the populated fields of `req` into the stored card.
    ///
    /// The read and the write run as separate statements, so two concurrent
    /// updates of the same card resolve last-write-wins.
    #[instrument(skip(db))]
    pub async fn update_card(
        db: &Database,
        id: i64,
        req: UpdateCardRequest,
    ) -> Result<Card, CardError> {
        let mut card = Self::get_card(db, id).await?;

        let patch = CardPatch::from(req);
        if patch.is_empty() {
            return Err(CardError::InvalidBody(
                "at least one field must be provided".into(),
            ));
        }
        patch.apply_to(&mut card);

        let mut uow = db.begin().await?;
        let mut repo = CardRepository::new(uow.connection());

        repo.update(id, &card).await?;

        uow.commit().await?;
        Ok(card)
    }

    #[instrument(skip(db))]
    pub async fn delete_card(db: &Database, id: i64) -> Result<(), CardError> {
        let mut uow = db.begin().await?;
        let mut repo = CardRepository::new(uow.connection());

        repo.delete(id).await?;

        uow.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::get_test_db;

    fn debit_card_request() -> CreateCardRequest {
        CreateCardRequest {
            card_id: 7,
            card_number: 123456,
            card_type: "debit".into(),
            expiration_date: "2030-01".into(),
            card_state: "active".into(),
            timestamp_creation: "t1".into(),
            timestamp_modification: "t1".into(),
        }
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let db = get_test_db().await;

        let created = CardService::create_card(&db, debit_card_request()).await.unwrap();
        assert_eq!(created.card_id, 7);

        let fetched = CardService::get_card(&db, 7).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.card_number, 123456);
        assert_eq!(fetched.card_type, "debit");
        assert_eq!(fetched.expiration_date, "2030-01");
        assert_eq!(fetched.card_state, "active");
        assert_eq!(fetched.timestamp_creation, "t1");
        assert_eq!(fetched.timestamp_modification, "t1");
    }

    #[tokio::test]
    async fn test_list_cards_empty() {
        let db = get_test_db().await;
        let cards = CardService::list_cards(&db).await.unwrap();
        assert!(cards.is_empty());
    }

    #[tokio::test]
    async fn test_list_cards_returns_created() {
        let db = get_test_db().await;
        CardService::create_card(&db, debit_card_request()).await.unwrap();
        CardService::create_card(&db, CreateCardRequest { card_id: 8, ..Default::default() })
            .await
            .unwrap();

        let cards = CardService::list_cards(&db).await.unwrap();
        assert_eq!(cards.len(), 2);
    }

    #[tokio::test]
    async fn test_create_duplicate_is_rejected_without_mutation() {
        let db = get_test_db().await;
        CardService::create_card(&db, debit_card_request()).await.unwrap();

        let duplicate = CreateCardRequest {
            card_state: "blocked".into(),
            ..debit_card_request()
        };
        let err = CardService::create_card(&db, duplicate).await;
        assert!(matches!(err, Err(CardError::Exists)));

        let stored = CardService::get_card(&db, 7).await.unwrap();
        assert_eq!(stored.card_state, "active");
        assert_eq!(CardService::list_cards(&db).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_requires_card_id() {
        let db = get_test_db().await;
        let err = CardService::create_card(&db, CreateCardRequest::default()).await;
        assert!(matches!(err, Err(CardError::InvalidBody(_))));
    }

    #[tokio::test]
    async fn test_create_accepts_otherwise_empty_card() {
        let db = get_test_db().await;
        let created = CardService::create_card(&db, CreateCardRequest { card_id: 1, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(created.card_id, 1);
        assert!(created.card_state.is_empty());
    }

    #[tokio::test]
    async fn test_get_card_not_found() {
        let db = get_test_db().await;
        let err = CardService::get_card(&db, 999).await;
        assert!(matches!(err, Err(CardError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_single_field_keeps_the_rest() {
        let db = get_test_db().await;
        let original = CardService::create_card(&db, debit_card_request()).await.unwrap();

        let req = UpdateCardRequest {
            card_state: Some("blocked".into()),
            ..Default::default()
        };
        let updated = CardService::update_card(&db, 7, req).await.unwrap();

        let expected = Card { card_state: "blocked".into(), ..original };
        assert_eq!(updated, expected);
        assert_eq!(CardService::get_card(&db, 7).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_update_overwrites_every_populated_field() {
        let db = get_test_db().await;
        CardService::create_card(&db, debit_card_request()).await.unwrap();

        let req = UpdateCardRequest {
            card_number: Some(654321),
            card_type: Some("credit".into()),
            timestamp_modification: Some("t2".into()),
            expiration_date: Some(String::new()),
            ..Default::default()
        };
        let updated = CardService::update_card(&db, 7, req).await.unwrap();

        assert_eq!(updated.card_number, 654321);
        assert_eq!(updated.card_type, "credit");
        assert_eq!(updated.timestamp_modification, "t2");
        assert_eq!(updated.expiration_date, "2030-01");
        assert_eq!(updated.card_state, "active");
        assert_eq!(updated.timestamp_creation, "t1");
    }

    #[tokio::test]
    async fn test_update_with_empty_body_is_invalid() {
        let db = get_test_db().await;
        let original = CardService::create_card(&db, debit_card_request()).await.unwrap();

        let req = UpdateCardRequest {
            card_id: Some(0),
            card_type: Some(String::new()),
            ..Default::default()
        };
        let err = CardService::update_card(&db, 7, req).await;
        assert!(matches!(err, Err(CardError::InvalidBody(_))));

        assert_eq!(CardService::get_card(&db, 7).await.unwrap(), original);
    }

    #[tokio::test]
    async fn test_update_missing_card_is_not_found() {
        let db = get_test_db().await;

        let req = UpdateCardRequest {
            card_state: Some("blocked".into()),
            ..Default::default()
        };
        let err = CardService::update_card(&db, 42, req).await;
        assert!(matches!(err, Err(CardError::NotFound)));

        // Existence is checked before the body.
        let err = CardService::update_card(&db, 42, UpdateCardRequest::default()).await;
        assert!(matches!(err, Err(CardError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_card_id_onto_existing_card_conflicts() {
        let db = get_test_db().await;
        CardService::create_card(&db, debit_card_request()).await.unwrap();
        CardService::create_card(&db, CreateCardRequest { card_id: 8, ..Default::default() })
            .await
            .unwrap();

        let req = UpdateCardRequest { card_id: Some(8), ..Default::default() };
        let err = CardService::update_card(&db, 7, req).await;
        assert!(matches!(err, Err(CardError::Exists)));
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let db = get_test_db().await;
        CardService::create_card(&db, debit_card_request()).await.unwrap();

        CardService::delete_card(&db, 7).await.unwrap();
        let err = CardService::delete_card(&db, 7).await;
        assert!(matches!(err, Err(CardError::NotFound)));

        let err = CardService::get_card(&db, 7).await;
        assert!(matches!(err, Err(CardError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_missing_card() {
        let db = get_test_db().await;
        let err = CardService::delete_card(&db, 3).await;
        assert!(matches!(err, Err(CardError::NotFound)));
    }

    #[tokio::test]
    async fn test_storage_failure_is_unexpected() {
        let db = get_test_db().await;
        sqlx::query("DROP TABLE cards").execute(&db.pool).await.unwrap();

        let err = CardService::get_card(&db, 7).await;
        assert!(matches!(err, Err(CardError::Unexpected(_))));

        let err = CardService::create_card(&db, debit_card_request()).await;
        assert!(matches!(err, Err(CardError::Unexpected(_))));
    }
}
