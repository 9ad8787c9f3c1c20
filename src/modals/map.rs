//! Map dialog.

use serde::Serialize;

use crate::{
    dao::{models::MapEntity, record_store::RecordScope},
    dto::reference::{self, ReferenceOption},
    modal::{RecordModal, Seed},
    validation::{Constraint, FieldKind, FieldValue, FormFields, FormSchema},
};

pub const NAME: &str = "name";
pub const MAP_TYPE: &str = "map_type";
pub const ACTIVE: &str = "active";

/// Scope of a map: the organizer owning it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapScope {
    pub user_id: Option<String>,
}

/// Editable map form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapDraft {
    pub id: Option<String>,
    pub name: String,
    /// Game mode, resolved against the map type catalogue.
    pub map_type: Option<ReferenceOption>,
    pub active: bool,
}

impl FormFields for MapDraft {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            NAME => FieldValue::Text(Some(&self.name)),
            MAP_TYPE => FieldValue::Reference(self.map_type.as_ref()),
            ACTIVE => FieldValue::Flag(Some(self.active)),
            _ => FieldValue::Missing,
        }
    }
}

/// Row written to the maps collection.
#[derive(Debug, Serialize)]
pub struct MapPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub name: String,
    pub map_type: Option<String>,
    pub active: bool,
}

/// Adapter for the map dialog.
pub struct MapModal {
    collection: String,
    map_types: Vec<ReferenceOption>,
    schema: FormSchema,
}

impl MapModal {
    /// Build the adapter for `collection` with the selectable game modes.
    pub fn new(collection: impl Into<String>, map_types: Vec<ReferenceOption>) -> Self {
        Self {
            collection: collection.into(),
            map_types,
            schema: FormSchema::new()
                .field(
                    NAME,
                    "Name",
                    FieldKind::Text,
                    [Constraint::Required, Constraint::MinLength(3)],
                )
                .field(
                    MAP_TYPE,
                    "Type",
                    FieldKind::Reference,
                    [Constraint::Required, Constraint::RequiredId],
                )
                .field(ACTIVE, "Active", FieldKind::Flag, []),
        }
    }

    /// Options offered by the game mode selector.
    pub fn map_types(&self) -> &[ReferenceOption] {
        &self.map_types
    }
}

impl RecordModal for MapModal {
    type Scope = MapScope;
    type Record = MapEntity;
    type Draft = MapDraft;
    type Payload = MapPayload;

    fn subject(&self) -> &str {
        "Map"
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    fn schema(&self) -> &FormSchema {
        &self.schema
    }

    fn fetch_scope(&self, scope: &MapScope) -> RecordScope {
        RecordScope::new().with_optional("user_id", scope.user_id.as_deref())
    }

    fn populate(&self, record: MapEntity) -> MapDraft {
        MapDraft {
            map_type: Some(reference::resolve(&self.map_types, &record.map_type))
                .filter(ReferenceOption::has_id),
            id: Some(record.id),
            name: record.name,
            active: record.active,
        }
    }

    fn payload(&self, seed: &Seed<MapScope>, draft: &MapDraft) -> MapPayload {
        MapPayload {
            id: draft.id.clone(),
            user_id: seed.scope.user_id.clone(),
            name: draft.name.clone(),
            map_type: draft.map_type.as_ref().map(|option| option.id.clone()),
            active: draft.active,
        }
    }
}
