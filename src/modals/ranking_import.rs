//! Leaderboard import dialog: records one player's line on a sweepstake map.

use serde::Serialize;

use crate::{
    dao::{models::RankingEntity, record_store::RecordScope},
    dto::reference::{self, ReferenceOption},
    modal::{RankingScope, RecordModal, Seed},
    validation::{Constraint, FieldKind, FieldValue, FormFields, FormSchema},
};

pub const PLAYER: &str = "player";
pub const KILLS: &str = "kills";
pub const DEATHS: &str = "deaths";
pub const ASSISTANCES: &str = "assistances";
pub const HEADSHOT_PERCENTAGE: &str = "headshot_percentage";
pub const DAMAGE: &str = "damage";

/// Editable scoreboard line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankingImportDraft {
    pub id: Option<String>,
    pub player: Option<ReferenceOption>,
    pub kills: Option<i64>,
    pub deaths: Option<i64>,
    pub assistances: Option<i64>,
    pub headshot_percentage: Option<i64>,
    pub damage: Option<i64>,
}

impl FormFields for RankingImportDraft {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            PLAYER => FieldValue::Reference(self.player.as_ref()),
            KILLS => FieldValue::Integer(self.kills),
            DEATHS => FieldValue::Integer(self.deaths),
            ASSISTANCES => FieldValue::Integer(self.assistances),
            HEADSHOT_PERCENTAGE => FieldValue::Integer(self.headshot_percentage),
            DAMAGE => FieldValue::Integer(self.damage),
            _ => FieldValue::Missing,
        }
    }
}

/// Row written to the rankings collection.
#[derive(Debug, Serialize)]
pub struct RankingPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub sweepstake_id: String,
    pub map_id: String,
    pub player_id: Option<String>,
    pub kills: i64,
    pub deaths: i64,
    pub assistances: i64,
    pub headshot_percentage: i64,
    pub damage: i64,
}

/// Adapter for the leaderboard import dialog.
pub struct RankingImportModal {
    collection: String,
    players: Vec<ReferenceOption>,
    schema: FormSchema,
}

impl RankingImportModal {
    /// Build the adapter for `collection`; `players` feeds the player selector.
    pub fn new(collection: impl Into<String>, players: Vec<ReferenceOption>) -> Self {
        let counter = [Constraint::Required, Constraint::Min(0)];
        Self {
            collection: collection.into(),
            players,
            schema: FormSchema::new()
                .field(
                    PLAYER,
                    "Player",
                    FieldKind::Reference,
                    [Constraint::Required, Constraint::RequiredId],
                )
                .field(KILLS, "Kills", FieldKind::Integer, counter)
                .field(DEATHS, "Deaths", FieldKind::Integer, counter)
                .field(ASSISTANCES, "Assists", FieldKind::Integer, counter)
                .field(
                    HEADSHOT_PERCENTAGE,
                    "Headshot %",
                    FieldKind::Integer,
                    [Constraint::Required, Constraint::Min(0), Constraint::Max(100)],
                )
                .field(DAMAGE, "Damage", FieldKind::Integer, counter),
        }
    }

    /// Options offered by the player selector.
    pub fn players(&self) -> &[ReferenceOption] {
        &self.players
    }
}

impl RecordModal for RankingImportModal {
    type Scope = RankingScope;
    type Record = RankingEntity;
    type Draft = RankingImportDraft;
    type Payload = RankingPayload;

    fn subject(&self) -> &str {
        "Ranking"
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    fn schema(&self) -> &FormSchema {
        &self.schema
    }

    fn fetch_scope(&self, scope: &RankingScope) -> RecordScope {
        RecordScope::new()
            .with_optional("user_id", scope.user_id.as_deref())
            .with("sweepstake_id", scope.sweepstake_id.as_str())
            .with("map_id", scope.map_id.as_str())
    }

    fn populate(&self, record: RankingEntity) -> RankingImportDraft {
        let mut player = reference::resolve(&self.players, &record.player_id);
        if player.name.is_empty() {
            player.name = record.format_player_name.unwrap_or_default();
        }

        RankingImportDraft {
            id: Some(record.id),
            player: Some(player),
            kills: Some(record.kills),
            deaths: Some(record.deaths),
            assistances: Some(record.assistances),
            headshot_percentage: Some(record.headshot_percentage),
            damage: Some(record.damage),
        }
    }

    fn payload(&self, seed: &Seed<RankingScope>, draft: &RankingImportDraft) -> RankingPayload {
        let scope = &seed.scope;
        RankingPayload {
            id: draft.id.clone(),
            user_id: scope.user_id.clone(),
            sweepstake_id: scope.sweepstake_id.clone(),
            map_id: scope.map_id.clone(),
            player_id: draft.player.as_ref().map(|player| player.id.clone()),
            kills: draft.kills.unwrap_or_default(),
            deaths: draft.deaths.unwrap_or_default(),
            assistances: draft.assistances.unwrap_or_default(),
            headshot_percentage: draft.headshot_percentage.unwrap_or_default(),
            damage: draft.damage.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{
        dao::models::SweepstakeMapEntity,
        modal::{
            ModalController, ModalHandle, ModalPhase, RankingModalController, RankingSeed,
            SubmitOutcome, Viewer,
        },
        test_support::{Harness, wait_for},
    };

    fn scope() -> RankingScope {
        RankingScope {
            user_id: Some("owner".into()),
            sweepstake_id: "s1".into(),
            map_id: "m1".into(),
        }
    }

    fn controller(harness: &Harness) -> ModalController<RankingImportModal> {
        ModalController::new(
            RankingImportModal::new(
                "rankings",
                vec![ReferenceOption::new("p1", "Ana"), ReferenceOption::new("p2", "Bruno")],
            ),
            harness.context(),
        )
    }

    fn filled(draft: &mut RankingImportDraft) {
        draft.player = Some(ReferenceOption::new("p2", "Bruno"));
        draft.kills = Some(21);
        draft.deaths = Some(14);
        draft.assistances = Some(4);
        draft.headshot_percentage = Some(52);
        draft.damage = Some(2450);
    }

    #[tokio::test]
    async fn ranking_dialog_opens_an_empty_import_for_its_map() {
        let harness = Harness::new();
        let import = controller(&harness);
        let ranking = RankingModalController::new(
            harness.store.clone(),
            harness.notifier.clone(),
            "rankings",
            Some(Arc::new(import.clone()) as Arc<dyn ModalHandle<Seed<RankingScope>>>),
        );
        let mut list = ranking.watch();

        ranking.open(RankingSeed {
            sweepstake_map: Some(SweepstakeMapEntity {
                id: "sm1".into(),
                user_id: "owner".into(),
                sweepstake_id: "s1".into(),
                map_id: "m1".into(),
                maps: None,
            }),
            viewer: Some(Viewer { id: "owner".into() }),
        });
        wait_for(&mut list, |s| s.phase == ModalPhase::Ready).await;
        assert!(ranking.import_leaderboard());

        assert_eq!(import.phase(), ModalPhase::Ready);
        assert_eq!(import.submit_label(), "Add");
        assert_eq!(import.snapshot().seed, Some(Seed::create(scope())));
    }

    #[tokio::test]
    async fn submit_writes_the_line_with_its_scope() {
        let harness = Harness::new();
        let modal = controller(&harness);
        let mut updates = modal.watch();

        modal.open(Seed::create(scope()));
        modal.edit(filled);
        assert_eq!(modal.submit(), SubmitOutcome::Dispatched);
        wait_for(&mut updates, |s| s.phase == ModalPhase::Closed).await;

        assert_eq!(
            harness.store.upserts()[0].1,
            json!({
                "user_id": "owner",
                "sweepstake_id": "s1",
                "map_id": "m1",
                "player_id": "p2",
                "kills": 21,
                "deaths": 14,
                "assistances": 4,
                "headshot_percentage": 52,
                "damage": 2450
            })
        );
        assert_eq!(harness.invalidator.keys(), vec!["rankings".to_string()]);
    }

    #[tokio::test]
    async fn out_of_range_numbers_are_rejected() {
        let harness = Harness::new();
        let modal = controller(&harness);

        modal.open(Seed::create(scope()));
        modal.edit(|draft| {
            filled(draft);
            draft.headshot_percentage = Some(130);
            draft.deaths = Some(-1);
            draft.damage = None;
        });

        let SubmitOutcome::Invalid(report) = modal.submit() else {
            panic!("expected the draft to be rejected");
        };
        assert_eq!(
            report.fields().collect::<Vec<_>>(),
            vec![DEATHS, HEADSHOT_PERCENTAGE, DAMAGE]
        );
        assert_eq!(
            report.message(HEADSHOT_PERCENTAGE),
            Some("Headshot % must be at most 100")
        );
        assert_eq!(report.get(DAMAGE).unwrap().code, "required");
    }

    #[tokio::test]
    async fn existing_line_loads_with_its_player() {
        let harness = Harness::new();
        harness
            .store
            .memory
            .insert(
                "rankings",
                json!({
                    "id": "r1",
                    "user_id": "owner",
                    "sweepstake_id": "s1",
                    "map_id": "m1",
                    "player_id": "p9",
                    "kills": 3,
                    "deaths": 7,
                    "assistances": 1,
                    "headshot_percentage": 20,
                    "damage": 640,
                    "format_player_name": "Carla"
                }),
            )
            .unwrap();
        let modal = controller(&harness);
        let mut updates = modal.watch();

        modal.open(Seed::edit("r1", scope()));
        let ready = wait_for(&mut updates, |s| s.phase == ModalPhase::Ready).await;

        assert_eq!(ready.draft.player, Some(ReferenceOption::new("p9", "Carla")));
        assert_eq!(ready.draft.damage, Some(640));
        assert_eq!(modal.submit_label(), "Save");
    }
}
