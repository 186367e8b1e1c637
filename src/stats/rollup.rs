use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{debug, info, instrument};

use super::{calculators::totals_by_season, repository::GameRecordStore, StatsError, UserStatistics};

/// Keeps the per-(user, season) rollup rows in line with the raw stat rows.
///
/// Only called from write paths (ingestion, result finalization, explicit recompute).
#[derive(Clone)]
pub struct RollupMaintainer {
    store: Arc<dyn GameRecordStore>,
    user_mutexes: Arc<RwLock<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl RollupMaintainer {
    pub fn new(store: Arc<dyn GameRecordStore>) -> Self {
        Self {
            store,
            user_mutexes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Replaces every rollup row of the user with totals recomputed from its stat rows.
    ///
    /// Idempotent. A user without stat rows (or unknown to the store) ends up with no rows.
    #[instrument(skip(self))]
    pub async fn recompute_user_statistics(
        &self,
        user_id: &str,
    ) -> Result<Vec<UserStatistics>, StatsError> {
        let user_lock = self.user_lock(user_id).await;
        let result = {
            let _guard = user_lock.lock().await;
            self.replace_rollups(user_id).await
        };
        self.release_user_lock(user_id, user_lock).await;
        result
    }

    async fn replace_rollups(&self, user_id: &str) -> Result<Vec<UserStatistics>, StatsError> {
        let lines = self.store.list_player_game_lines(user_id, None).await?;
        let rollups: Vec<UserStatistics> = totals_by_season(&lines)
            .into_iter()
            .map(|(season, totals)| totals.into_rollup(user_id, season))
            .collect();

        self.store.replace_user_statistics(user_id, &rollups).await?;

        debug!(
            user_id = %user_id,
            stat_rows = lines.len(),
            seasons = rollups.len(),
            "User statistics recomputed"
        );
        Ok(rollups)
    }

    /// Recomputes each distinct user once; returns how many were refreshed
    #[instrument(skip(self, user_ids))]
    pub async fn recompute_many<I, S>(&self, user_ids: I) -> Result<usize, StatsError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unique: BTreeSet<String> = user_ids.into_iter().map(Into::into).collect();
        for user_id in &unique {
            self.recompute_user_statistics(user_id).await?;
        }
        Ok(unique.len())
    }

    /// Full rebuild over every known player
    #[instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<usize, StatsError> {
        let players = self.store.list_players().await?;
        let refreshed = self
            .recompute_many(players.into_iter().map(|p| p.user_id))
            .await?;

        info!(users = refreshed, "Rollups rebuilt");
        Ok(refreshed)
    }

    async fn user_lock(&self, user_id: &str) -> Arc<AsyncMutex<()>> {
        {
            let guard = self.user_mutexes.read().await;
            if let Some(lock) = guard.get(user_id) {
                return lock.clone();
            }
        }

        let mut guard = self.user_mutexes.write().await;
        guard
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Drops the map entry once no other recompute holds or awaits the lock
    async fn release_user_lock(&self, user_id: &str, user_lock: Arc<AsyncMutex<()>>) {
        let mut guard = self.user_mutexes.write().await;
        // One reference in the map, one held here
        if Arc::strong_count(&user_lock) == 2 {
            guard.remove(user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::{fixture_store, FailingGameRecordStore};

    #[tokio::test]
    async fn recompute_groups_by_season() {
        let store = Arc::new(fixture_store());
        let maintainer = RollupMaintainer::new(store.clone());

        let rollups = maintainer.recompute_user_statistics("user1").await.unwrap();

        assert_eq!(rollups.len(), 2);
        assert_eq!(rollups[0].season, 2024);
        assert_eq!(rollups[0].games_played, 1);
        assert_eq!(rollups[1].season, 2025);
        assert_eq!(rollups[1].games_played, 2);
        assert_eq!(rollups[1].total_goals, 3);
        assert_eq!(rollups[1].average_goals_per_game, 1.5);
    }

    #[tokio::test]
    async fn recompute_is_idempotent() {
        let store = Arc::new(fixture_store());
        let maintainer = RollupMaintainer::new(store.clone());

        let first = maintainer.recompute_user_statistics("user2").await.unwrap();
        let stored_first = store.get_user_statistics("user2").await.unwrap();
        let second = maintainer.recompute_user_statistics("user2").await.unwrap();
        let stored_second = store.get_user_statistics("user2").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(stored_first, stored_second);
        assert_eq!(stored_second.len(), 2);
    }

    #[tokio::test]
    async fn unknown_user_is_a_no_op() {
        let store = Arc::new(fixture_store());
        let maintainer = RollupMaintainer::new(store.clone());

        let rollups = maintainer.recompute_user_statistics("ghost").await.unwrap();

        assert!(rollups.is_empty());
        assert!(store.get_user_statistics("ghost").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recompute_many_deduplicates() {
        let maintainer = RollupMaintainer::new(Arc::new(fixture_store()));

        let refreshed = maintainer
            .recompute_many(["user1", "user3", "user1"])
            .await
            .unwrap();

        assert_eq!(refreshed, 2);
    }

    #[tokio::test]
    async fn rebuild_all_covers_every_player() {
        let store = Arc::new(fixture_store());
        let maintainer = RollupMaintainer::new(store.clone());

        assert_eq!(maintainer.rebuild_all().await.unwrap(), 5);
        assert_eq!(store.get_user_statistics("user3").await.unwrap().len(), 2);
        assert!(store.get_user_statistics("user5").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let maintainer = RollupMaintainer::new(Arc::new(FailingGameRecordStore));

        let result = maintainer.recompute_user_statistics("user1").await;

        assert!(matches!(result, Err(StatsError::StoreUnavailable(_))));
        assert!(maintainer.user_mutexes.read().await.is_empty());
    }

    #[tokio::test]
    async fn user_locks_are_released_after_recompute() {
        let maintainer = RollupMaintainer::new(Arc::new(fixture_store()));

        for i in 0..1000 {
            maintainer
                .recompute_user_statistics(&format!("ghost{}", i))
                .await
                .unwrap();
        }
        maintainer.rebuild_all().await.unwrap();

        assert!(maintainer.user_mutexes.read().await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_recomputes_of_one_user_converge() {
        let store = Arc::new(fixture_store());
        let maintainer = RollupMaintainer::new(store.clone());

        let (a, b) = tokio::join!(
            maintainer.recompute_user_statistics("user1"),
            maintainer.recompute_user_statistics("user1"),
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(store.get_user_statistics("user1").await.unwrap().len(), 2);
        assert!(maintainer.user_mutexes.read().await.is_empty());
    }
}
