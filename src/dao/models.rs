use serde::{Deserialize, Serialize};

/// Player registered by an organizer, as stored in the `players` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Stable identifier for the player.
    pub id: String,
    /// Organizer owning this player entry.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Display name.
    pub name: String,
    /// Steam username.
    pub username: String,
    /// Identifier of the competitive patent (rank) held by the player.
    #[serde(default)]
    pub patent: Option<String>,
    /// Whether the player can take part in new draws.
    #[serde(default)]
    pub active: bool,
    /// Premier rating, when known.
    #[serde(default)]
    pub premier: Option<i32>,
}

/// Map available for sweepstakes, as stored in the `maps` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MapEntity {
    /// Stable identifier for the map.
    pub id: String,
    /// Organizer owning this map entry.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Display name (e.g. "Mirage").
    pub name: String,
    /// Game mode identifier (`bomb` or `rescue`).
    pub map_type: String,
    /// Whether the map can be drawn.
    #[serde(default)]
    pub active: bool,
}

/// Link between a sweepstake and one of its drawn maps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SweepstakeMapEntity {
    /// Stable identifier for the link.
    pub id: String,
    /// Organizer owning the sweepstake.
    pub user_id: String,
    /// Sweepstake the map belongs to.
    pub sweepstake_id: String,
    /// Drawn map.
    pub map_id: String,
    /// Joined map details, when the backend embeds them.
    #[serde(default)]
    pub maps: Option<MapEntity>,
}

/// Subset of the player row embedded in ranking results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RankedPlayerEntity {
    /// Premier rating at the time of the ranking.
    #[serde(default)]
    pub premier: Option<i32>,
}

/// One player's scoreboard line on a sweepstake map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankingEntity {
    /// Stable identifier for the ranking line.
    pub id: String,
    /// Organizer owning the sweepstake.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Sweepstake the line belongs to.
    pub sweepstake_id: String,
    /// Map the line was played on.
    pub map_id: String,
    /// Player the line belongs to.
    pub player_id: String,
    pub kills: i64,
    pub deaths: i64,
    pub assistances: i64,
    pub headshot_percentage: i64,
    pub damage: i64,
    /// Player name formatted by the backend view.
    #[serde(default)]
    pub format_player_name: Option<String>,
    /// Player username formatted by the backend view.
    #[serde(default)]
    pub format_player_username: Option<String>,
    /// Embedded player details.
    #[serde(default)]
    pub players: Option<RankedPlayerEntity>,
}
