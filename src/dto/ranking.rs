use serde::Serialize;

use crate::dao::models::RankingEntity;

/// Row of the ranking table shown for a sweepstake map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankingRow {
    pub id: String,
    pub player_id: String,
    pub player_name: String,
    pub player_username: String,
    pub premier: Option<i32>,
    pub kills: i64,
    pub deaths: i64,
    pub assistances: i64,
    pub headshot_percentage: i64,
    pub damage: i64,
}

impl From<RankingEntity> for RankingRow {
    fn from(entity: RankingEntity) -> Self {
        Self {
            id: entity.id,
            player_id: entity.player_id,
            player_name: entity.format_player_name.unwrap_or_default(),
            player_username: entity.format_player_username.unwrap_or_default(),
            premier: entity.players.and_then(|player| player.premier),
            kills: entity.kills,
            deaths: entity.deaths,
            assistances: entity.assistances,
            headshot_percentage: entity.headshot_percentage,
            damage: entity.damage,
        }
    }
}
