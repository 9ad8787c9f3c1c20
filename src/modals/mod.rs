//! Entity dialogs built on [`ModalController`](crate::modal::ModalController).
//!
//! Each module provides the [`RecordModal`](crate::modal::RecordModal) adapter
//! of one collection: its draft, validation schema and payload mapping.

pub mod map;
pub mod player;
pub mod ranking_import;

pub use self::map::{MapDraft, MapModal, MapScope};
pub use self::player::{PlayerDraft, PlayerModal, PlayerScope};
pub use self::ranking_import::{RankingImportDraft, RankingImportModal};
