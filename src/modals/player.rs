//! Player dialog.

use serde::Serialize;

use crate::{
    dao::{models::PlayerEntity, record_store::RecordScope},
    dto::reference::{self, ReferenceOption},
    modal::{RecordModal, Seed},
    validation::{Constraint, FieldKind, FieldValue, FormFields, FormSchema},
};

pub const NAME: &str = "name";
pub const USERNAME: &str = "username";
pub const ACTIVE: &str = "active";
pub const PATENT: &str = "patent";

/// Scope of a player: the organizer owning it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerScope {
    pub user_id: Option<String>,
}

/// Editable player form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerDraft {
    pub id: Option<String>,
    pub name: String,
    pub username: String,
    pub active: bool,
    /// Selected patent, resolved against the catalogue.
    pub patent: Option<ReferenceOption>,
}

impl FormFields for PlayerDraft {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            NAME => FieldValue::Text(Some(&self.name)),
            USERNAME => FieldValue::Text(Some(&self.username)),
            ACTIVE => FieldValue::Flag(Some(self.active)),
            PATENT => FieldValue::Reference(self.patent.as_ref()),
            _ => FieldValue::Missing,
        }
    }
}

/// Row written to the players collection.
#[derive(Debug, Serialize)]
pub struct PlayerPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub name: String,
    pub username: String,
    pub patent: Option<String>,
    pub active: bool,
}

/// Adapter for the player dialog.
pub struct PlayerModal {
    collection: String,
    patents: Vec<ReferenceOption>,
    schema: FormSchema,
}

impl PlayerModal {
    /// Build the adapter for `collection`, resolving patents against `patents`.
    pub fn new(collection: impl Into<String>, patents: Vec<ReferenceOption>) -> Self {
        let schema = FormSchema::new()
            .field(
                NAME,
                "Name",
                FieldKind::Text,
                [Constraint::Required, Constraint::MinLength(3)],
            )
            .field(
                USERNAME,
                "Steam username",
                FieldKind::Text,
                [Constraint::Required, Constraint::MinLength(3)],
            )
            .field(ACTIVE, "Active", FieldKind::Flag, [Constraint::Required])
            .field(
                PATENT,
                "Patent",
                FieldKind::Reference,
                [Constraint::Required, Constraint::RequiredId],
            );

        Self {
            collection: collection.into(),
            patents,
            schema,
        }
    }

    /// Options offered by the patent selector.
    pub fn patents(&self) -> &[ReferenceOption] {
        &self.patents
    }
}

impl RecordModal for PlayerModal {
    type Scope = PlayerScope;
    type Record = PlayerEntity;
    type Draft = PlayerDraft;
    type Payload = PlayerPayload;

    fn subject(&self) -> &str {
        "Player"
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    fn schema(&self) -> &FormSchema {
        &self.schema
    }

    fn fetch_scope(&self, scope: &PlayerScope) -> RecordScope {
        RecordScope::new().with_optional("user_id", scope.user_id.as_deref())
    }

    fn populate(&self, record: PlayerEntity) -> PlayerDraft {
        PlayerDraft {
            id: Some(record.id),
            name: record.name,
            username: record.username,
            active: record.active,
            patent: record
                .patent
                .as_deref()
                .map(|id| reference::resolve(&self.patents, id)),
        }
    }

    fn payload(&self, seed: &Seed<PlayerScope>, draft: &PlayerDraft) -> PlayerPayload {
        PlayerPayload {
            id: draft.id.clone(),
            user_id: seed.scope.user_id.clone(),
            name: draft.name.clone(),
            username: draft.username.clone(),
            patent: draft.patent.as_ref().map(|patent| patent.id.clone()),
            active: draft.active,
        }
    }
}
