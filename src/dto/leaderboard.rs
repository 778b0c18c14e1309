use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::{IntoParams, ToSchema};

/// Query string accepted by the leaderboard routes.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LeaderboardQuery {
    /// Number of entries to return (defaults to 10, capped at 100).
    pub limit: Option<usize>,
}

/// One ranked player.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct LeaderboardEntry {
    /// One-based rank.
    pub rank: usize,
    pub user_id: u64,
    /// Display name, falling back to the e-mail address.
    pub display_name: Option<String>,
    pub score: u64,
    pub attempts: u64,
    pub correct: u64,
    pub accuracy: f64,
    pub last_update: Option<String>,
}

/// Global ranking, also the payload of `leaderboard-global`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GlobalLeaderboard {
    pub players: Vec<LeaderboardEntry>,
}

/// Per-game ranking, also the payload of `leaderboard-game`.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameLeaderboard {
    /// Game session id when the ranking was requested for a session.
    pub game_id: Option<u64>,
    pub game_name: String,
    pub players: Vec<LeaderboardEntry>,
}
