//! Options backing reference-typed form fields.

use serde::{Deserialize, Serialize};

/// Display object selected in a reference field: an identifier plus its label.
///
/// Only the identifier is persisted; the label may be empty while options are
/// still loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceOption {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl ReferenceOption {
    /// Create an option with both identifier and label.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Option whose label is not known yet.
    pub fn unlabelled(id: impl Into<String>) -> Self {
        Self::new(id, String::new())
    }

    /// Whether the option carries a usable identifier.
    pub fn has_id(&self) -> bool {
        !self.id.trim().is_empty()
    }
}

/// Resolve `id` against `catalogue`, keeping the bare identifier when the
/// catalogue does not know it so a re-save never drops the stored value.
pub fn resolve(catalogue: &[ReferenceOption], id: &str) -> ReferenceOption {
    catalogue
        .iter()
        .find(|option| option.id == id)
        .cloned()
        .unwrap_or_else(|| ReferenceOption::unlabelled(id))
}
