use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Card {
    pub card_id: i64,
    pub card_number: i64,
    pub card_type: String,
    pub expiration_date: String,
    pub card_state: String,
    pub timestamp_creation: String,
    pub timestamp_modification: String,
}

/// Body of `POST /cards`. Omitted fields default to zero / empty, only
/// `card_id` is required to be meaningful.
///
/// A `card_id` below 1 is rejected on purpose: it is the primary key.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CreateCardRequest {
    #[validate(range(min = 1, message = "card_id must be a positive integer"))]
    pub card_id: i64,
    pub card_number: i64,
    pub card_type: String,
    pub expiration_date: String,
    pub card_state: String,
    pub timestamp_creation: String,
    pub timestamp_modification: String,
}

impl From<CreateCardRequest> for Card {
    fn from(req: CreateCardRequest) -> Self {
        Card {
            card_id: req.card_id,
            card_number: req.card_number,
            card_type: req.card_type,
            expiration_date: req.expiration_date,
            card_state: req.card_state,
            timestamp_creation: req.timestamp_creation,
            timestamp_modification: req.timestamp_modification,
        }
    }
}

/// Body of `PATCH /cards/{id}`, as received on the wire.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateCardRequest {
    pub card_id: Option<i64>,
    pub card_number: Option<i64>,
    pub card_type: Option<String>,
    pub expiration_date: Option<String>,
    pub card_state: Option<String>,
    pub timestamp_creation: Option<String>,
    pub timestamp_modification: Option<String>,
}

/// The fields an update will actually overwrite.
///
/// A field is present only when the caller supplied it with a non-zero,
/// non-empty value; zero and empty mean "leave unchanged".
#[derive(Debug, Default, PartialEq)]
pub struct CardPatch {
    card_id: Option<i64>,
    card_number: Option<i64>,
    card_type: Option<String>,
    expiration_date: Option<String>,
    card_state: Option<String>,
    timestamp_creation: Option<String>,
    timestamp_modification: Option<String>,
}

fn positive(value: Option<i64>) -> Option<i64> {
    value.filter(|v| *v > 0)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl From<UpdateCardRequest> for CardPatch {
    fn from(req: UpdateCardRequest) -> Self {
        CardPatch {
            card_id: positive(req.card_id),
            card_number: positive(req.card_number),
            card_type: non_empty(req.card_type),
            expiration_date: non_empty(req.expiration_date),
            card_state: non_empty(req.card_state),
            timestamp_creation: non_empty(req.timestamp_creation),
            timestamp_modification: non_empty(req.timestamp_modification),
        }
    }
}

impl CardPatch {
    pub fn is_empty(&self) -> bool {
        *self == CardPatch::default()
    }

    /// Overwrites every present field on `card`; absent fields are untouched.
    pub fn apply_to(self, card: &mut Card) {
        if let Some(v) = self.card_id {
            card.card_id = v;
        }
        if let Some(v) = self.card_number {
            card.card_number = v;
        }
        if let Some(v) = self.card_type {
            card.card_type = v;
        }
        if let Some(v) = self.expiration_date {
            card.expiration_date = v;
        }
        if let Some(v) = self.card_state {
            card.card_state = v;
        }
        if let Some(v) = self.timestamp_creation {
            card.timestamp_creation = v;
        }
        if let Some(v) = self.timestamp_modification {
            card.timestamp_modification = v;
        }
    }
}
