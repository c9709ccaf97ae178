// In-memory implementation of GiveawayStore.
//
// This is the degraded mode: everything is lost on restart. It is also what
// the core tests run against, since it needs no setup.

use crate::core::giveaway::{Giveaway, GiveawayError, GiveawayStore, JoinOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};

/// In-memory implementation of GiveawayStore.
///
/// Mutations go through DashMap's `get_mut`, which holds the shard lock for the
/// whole check-then-append, so two concurrent joins cannot both see "not in yet".
pub struct InMemoryGiveawayStore {
    /// Giveaway ID -> record
    giveaways: DashMap<u64, Giveaway>,
    /// IDs of removed giveaways, never handed out again
    retired: DashSet<u64>,
}

impl InMemoryGiveawayStore {
    pub fn new() -> Self {
        Self {
            giveaways: DashMap::new(),
            retired: DashSet::new(),
        }
    }
}

impl Default for InMemoryGiveawayStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GiveawayStore for InMemoryGiveawayStore {
    async fn insert(&self, giveaway: Giveaway) -> Result<(), GiveawayError> {
        let id = giveaway.id;
        if self.retired.contains(&id) {
            return Err(GiveawayError::DuplicateId(id));
        }

        match self.giveaways.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(GiveawayError::DuplicateId(id)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(giveaway);
                Ok(())
            }
        }
    }

    async fn get(&self, id: u64) -> Result<Option<Giveaway>, GiveawayError> {
        Ok(self.giveaways.get(&id).map(|g| g.clone()))
    }

    async fn add_entry(&self, id: u64, user_id: u64) -> Result<JoinOutcome, GiveawayError> {
        let Some(mut giveaway) = self.giveaways.get_mut(&id) else {
            return Ok(JoinOutcome::NotFound);
        };

        if giveaway.finalizing {
            return Ok(JoinOutcome::NotFound);
        }
        if giveaway.entries.contains(&user_id) {
            return Ok(JoinOutcome::AlreadyJoined);
        }

        giveaway.entries.push(user_id);
        Ok(JoinOutcome::Joined)
    }

    async fn set_manual_winners(&self, id: u64, winners: &[u64]) -> Result<bool, GiveawayError> {
        match self.giveaways.get_mut(&id) {
            Some(mut giveaway) if !giveaway.finalizing => {
                giveaway.manual_winners = winners.to_vec();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Giveaway>, GiveawayError> {
        Ok(self
            .giveaways
            .iter()
            .filter(|entry| entry.has_ended(now))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn list_active(&self, guild_id: u64) -> Result<Vec<Giveaway>, GiveawayError> {
        let mut active: Vec<Giveaway> = self
            .giveaways
            .iter()
            .filter(|entry| entry.guild_id == guild_id && !entry.finalizing)
            .map(|entry| entry.value().clone())
            .collect();
        active.sort_by_key(|g| (g.end_time, g.id));
        Ok(active)
    }

    async fn mark_finalizing(&self, id: u64) -> Result<bool, GiveawayError> {
        match self.giveaways.get_mut(&id) {
            Some(mut giveaway) if !giveaway.finalizing => {
                giveaway.finalizing = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear_finalizing(&self, id: u64) -> Result<bool, GiveawayError> {
        match self.giveaways.get_mut(&id) {
            Some(mut giveaway) if giveaway.finalizing => {
                giveaway.finalizing = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove(&self, id: u64) -> Result<bool, GiveawayError> {
        self.retired.insert(id);
        Ok(self.giveaways.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn giveaway(id: u64, guild_id: u64, end_secs: i64) -> Giveaway {
        Giveaway {
            id,
            guild_id,
            channel_id: 1,
            prize: format!("Prize {}", id),
            host_id: 1,
            end_time: Utc.timestamp_opt(end_secs, 0).unwrap(),
            entries: Vec::new(),
            manual_winners: Vec::new(),
            finalizing: false,
        }
    }

    #[tokio::test]
    async fn test_ids_are_never_reused() {
        let store = InMemoryGiveawayStore::new();
        store.insert(giveaway(1, 1, 10)).await.unwrap();

        assert!(matches!(
            store.insert(giveaway(1, 1, 10)).await,
            Err(GiveawayError::DuplicateId(1))
        ));

        assert!(store.remove(1).await.unwrap());
        assert!(!store.remove(1).await.unwrap());
        assert!(matches!(
            store.insert(giveaway(1, 1, 10)).await,
            Err(GiveawayError::DuplicateId(1))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_joins_count_once() {
        let store = Arc::new(InMemoryGiveawayStore::new());
        store.insert(giveaway(1, 1, 10)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.add_entry(1, 42).await }));
        }

        let mut joined = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == JoinOutcome::Joined {
                joined += 1;
            }
        }

        assert_eq!(joined, 1);
        assert_eq!(store.get(1).await.unwrap().unwrap().entries, vec![42]);
    }

    #[tokio::test]
    async fn test_list_expired_and_active() {
        let store = InMemoryGiveawayStore::new();
        store.insert(giveaway(1, 7, 10)).await.unwrap();
        store.insert(giveaway(2, 7, 30)).await.unwrap();
        store.insert(giveaway(3, 8, 5)).await.unwrap();
        store.insert(giveaway(4, 7, 20)).await.unwrap();

        let now = Utc.timestamp_opt(10, 0).unwrap();
        let mut expired: Vec<u64> = store
            .list_expired(now)
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.id)
            .collect();
        expired.sort();
        assert_eq!(expired, vec![1, 3]);

        store.mark_finalizing(1).await.unwrap();
        let active: Vec<u64> = store
            .list_active(7)
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(active, vec![4, 2]);
    }
}
