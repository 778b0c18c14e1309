//! Leaderboards computed from the store: global, per game session and per game name.
//!
//! Rankings are pure functions over aggregates; the async helpers only gather rows and the
//! spawn helpers push fresh snapshots onto the broadcast hub without blocking the caller.

use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use tracing::warn;

use crate::{
    dao::{
        models::{ScoreAggregate, UserEntity},
        quiz_store::QuizStore,
    },
    dto::{
        format_system_time,
        leaderboard::{GameLeaderboard, GlobalLeaderboard, LeaderboardEntry},
    },
    error::ServiceError,
    services::sse_events,
    state::SharedState,
};

/// A user's totals before ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub user_id: u64,
    pub totals: ScoreAggregate,
}

/// Ranking order: score descending, then earliest last update (never-updated first), then
/// user id.
pub fn compare_standings(a: &Standing, b: &Standing) -> Ordering {
    b.totals
        .score
        .cmp(&a.totals.score)
        .then_with(|| a.totals.last_update.cmp(&b.totals.last_update))
        .then_with(|| a.user_id.cmp(&b.user_id))
}

/// Sort, truncate and decorate standings with ranks and display names.
pub fn rank(
    mut standings: Vec<Standing>,
    users: &HashMap<u64, UserEntity>,
    limit: usize,
) -> Vec<LeaderboardEntry> {
    standings.sort_by(compare_standings);
    standings
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, standing)| LeaderboardEntry {
            rank: index + 1,
            user_id: standing.user_id,
            display_name: users.get(&standing.user_id).and_then(display_name),
            score: standing.totals.score,
            attempts: standing.totals.attempts,
            correct: standing.totals.correct,
            accuracy: standing.totals.accuracy,
            last_update: standing.totals.last_update.map(format_system_time),
        })
        .collect()
}

fn display_name(user: &UserEntity) -> Option<String> {
    user.display_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .or_else(|| user.email.clone())
}

async fn users_by_id(
    store: &Arc<dyn QuizStore>,
) -> Result<HashMap<u64, UserEntity>, ServiceError> {
    Ok(store
        .list_users()
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect())
}

/// Top users by global performance. Users without any answer count as zero.
pub async fn global_leaderboard(
    state: &SharedState,
    limit: Option<usize>,
) -> Result<GlobalLeaderboard, ServiceError> {
    let limit = state.config().leaderboard.resolve(limit);
    let store = state.require_quiz_store().await?;
    let users = users_by_id(&store).await?;

    let mut totals: HashMap<u64, ScoreAggregate> = users
        .keys()
        .map(|id| (*id, ScoreAggregate::default()))
        .collect();
    for row in store.list_performance().await? {
        totals.insert(row.user_id, row.totals);
    }

    let standings = totals
        .into_iter()
        .map(|(user_id, totals)| Standing { user_id, totals })
        .collect();

    Ok(GlobalLeaderboard {
        players: rank(standings, &users, limit),
    })
}

/// Participants of a game session ranked by their score for the session's game name.
pub async fn session_leaderboard(
    state: &SharedState,
    game_id: u64,
    limit: Option<usize>,
) -> Result<GameLeaderboard, ServiceError> {
    let limit = state.config().leaderboard.resolve(limit);
    let store = state.require_quiz_store().await?;
    let game = store
        .find_game_session(game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game session `{game_id}` not found")))?;

    let mut scores: HashMap<u64, ScoreAggregate> = store
        .list_game_scores(game.name.clone())
        .await?
        .into_iter()
        .map(|row| (row.user_id, row.totals))
        .collect();

    let standings = store
        .list_participants(game.id)
        .await?
        .into_iter()
        .map(|user_id| Standing {
            user_id,
            totals: scores.remove(&user_id).unwrap_or_default(),
        })
        .collect();

    let users = users_by_id(&store).await?;
    Ok(GameLeaderboard {
        game_id: Some(game.id),
        game_name: game.name,
        players: rank(standings, &users, limit),
    })
}

/// Every score recorded under a game name, across all sessions sharing that name.
pub async fn named_game_leaderboard(
    state: &SharedState,
    game_name: &str,
    limit: Option<usize>,
) -> Result<GameLeaderboard, ServiceError> {
    let limit = state.config().leaderboard.resolve(limit);
    let store = state.require_quiz_store().await?;

    let standings = store
        .list_game_scores(game_name.to_string())
        .await?
        .into_iter()
        .map(|row| Standing {
            user_id: row.user_id,
            totals: row.totals,
        })
        .collect();

    let users = users_by_id(&store).await?;
    Ok(GameLeaderboard {
        game_id: None,
        game_name: game_name.to_string(),
        players: rank(standings, &users, limit),
    })
}

/// Recompute and broadcast the global leaderboard in the background.
pub fn spawn_global_broadcast(state: &SharedState) {
    let state = state.clone();
    tokio::spawn(async move {
        let limit = Some(state.config().leaderboard.broadcast_limit);
        match global_leaderboard(&state, limit).await {
            Ok(leaderboard) => sse_events::broadcast_global_leaderboard(&state, &leaderboard),
            Err(err) => warn!(error = %err, "failed to refresh global leaderboard"),
        }
    });
}

/// Recompute and broadcast one game session's leaderboard in the background.
pub fn spawn_game_broadcast(state: &SharedState, game_id: u64) {
    let state = state.clone();
    tokio::spawn(async move {
        let limit = Some(state.config().leaderboard.broadcast_limit);
        match session_leaderboard(&state, game_id, limit).await {
            Ok(leaderboard) => sse_events::broadcast_game_leaderboard(&state, &leaderboard),
            Err(err) => warn!(game_id, error = %err, "failed to refresh game leaderboard"),
        }
    });
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    fn standing(user_id: u64, score: u64, updated_secs: Option<u64>) -> Standing {
        Standing {
            user_id,
            totals: ScoreAggregate {
                score,
                attempts: 1,
                correct: u64::from(score > 0),
                accuracy: 0.0,
                last_update: updated_secs
                    .map(|secs| SystemTime::UNIX_EPOCH + Duration::from_secs(secs)),
            },
        }
    }

    fn user(id: u64, display_name: Option<&str>, email: Option<&str>) -> UserEntity {
        UserEntity {
            id,
            uid: format!("uid-{id}"),
            email: email.map(str::to_string),
            display_name: display_name.map(str::to_string),
        }
    }

    #[test]
    fn ranks_by_score_then_earliest_update_then_id() {
        let standings = vec![
            standing(4, 20, Some(50)),
            standing(3, 30, Some(90)),
            standing(2, 20, Some(10)),
            standing(1, 20, None),
            standing(5, 0, None),
        ];

        let ranked = rank(standings, &HashMap::new(), 10);
        let order: Vec<_> = ranked.iter().map(|entry| entry.user_id).collect();
        assert_eq!(order, vec![3, 1, 2, 4, 5]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[4].rank, 5);
    }

    #[test]
    fn truncates_to_limit() {
        let standings = (1..=5).map(|id| standing(id, id * 10, None)).collect();
        let ranked = rank(standings, &HashMap::new(), 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].user_id, 5);
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let users: HashMap<_, _> = [
            (1, user(1, Some("Ada"), Some("ada@example.com"))),
            (2, user(2, None, Some("bob@example.com"))),
            (3, user(3, Some("  "), None)),
        ]
        .into_iter()
        .collect();

        let ranked = rank(
            vec![standing(1, 3, None), standing(2, 2, None), standing(3, 1, None)],
            &users,
            10,
        );
        assert_eq!(ranked[0].display_name.as_deref(), Some("Ada"));
        assert_eq!(ranked[1].display_name.as_deref(), Some("bob@example.com"));
        assert_eq!(ranked[2].display_name, None);
    }
}
