use serde::{Deserialize, Serialize};

use crate::stats::GameStatus;

/// Facts published after a statistics write has been committed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatsEvent {
    /// A game's score or status changed
    GameScoreUpdated {
        game_id: i32,
        home_score: i32,
        away_score: i32,
        status: GameStatus,
    },

    /// A user's rollup rows were recomputed
    UserStatisticsRefreshed { user_id: String },
}

impl StatsEvent {
    /// Channel the event is delivered on, e.g. `game:12` or `user:abc`
    pub fn topic(&self) -> String {
        match self {
            StatsEvent::GameScoreUpdated { game_id, .. } => format!("game:{}", game_id),
            StatsEvent::UserStatisticsRefreshed { user_id } => format!("user:{}", user_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_are_keyed_by_entity() {
        let score = StatsEvent::GameScoreUpdated {
            game_id: 12,
            home_score: 2,
            away_score: 1,
            status: GameStatus::Completed,
        };
        let refreshed = StatsEvent::UserStatisticsRefreshed {
            user_id: "user1".into(),
        };

        assert_eq!(score.topic(), "game:12");
        assert_eq!(refreshed.topic(), "user:user1");
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(StatsEvent::UserStatisticsRefreshed {
            user_id: "user1".into(),
        })
        .unwrap();

        assert_eq!(json["type"], "user_statistics_refreshed");
        assert_eq!(json["user_id"], "user1");
    }
}
