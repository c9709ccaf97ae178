// Winner selection: manual override first, fair random draw otherwise.
//
// The manual override is the "secret winner" feature: an administrator can
// pre-pick the result with `gset`. Overrides are still checked against the
// guild so we never announce someone who has left. If none of them are left,
// the draw falls back to the entries as if no override had been set.

use super::giveaway_models::{Giveaway, PlatformError};
use super::giveaway_service::MembershipLookup;
use rand::Rng;
use std::sync::Arc;

/// Source of randomness for the draw, injectable so tests can be reproducible.
pub trait RandomSource: Send + Sync {
    /// Uniform index in `0..len`. Only called with `len > 0`.
    fn pick_index(&self, len: usize) -> usize;
}

/// Thread-local RNG from `rand`. Uniform, not cryptographically fair.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn pick_index(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Seeded RNG so draws repeat exactly between test runs.
#[cfg(test)]
pub struct SeededRandom {
    rng: std::sync::Mutex<rand::rngs::StdRng>,
}

#[cfg(test)]
impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        use rand::SeedableRng;
        Self {
            rng: std::sync::Mutex::new(rand::rngs::StdRng::seed_from_u64(seed)),
        }
    }
}

#[cfg(test)]
impl RandomSource for SeededRandom {
    fn pick_index(&self, len: usize) -> usize {
        self.rng.lock().unwrap().gen_range(0..len)
    }
}

pub struct WinnerSelector {
    random: Arc<dyn RandomSource>,
}

impl WinnerSelector {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }

    /// Pick the winners of a giveaway.
    ///
    /// 1. Manual winners who are still guild members, in assignment order.
    /// 2. Otherwise one uniformly drawn entry.
    /// 3. Otherwise nobody.
    ///
    /// A failing membership lookup is returned as an error rather than being
    /// read as "not a member", so a flaky API never silently drops a winner.
    pub async fn select<L: MembershipLookup + ?Sized>(
        &self,
        giveaway: &Giveaway,
        members: &L,
    ) -> Result<Vec<u64>, PlatformError> {
        if !giveaway.manual_winners.is_empty() {
            let mut valid = Vec::with_capacity(giveaway.manual_winners.len());
            for &user_id in &giveaway.manual_winners {
                if members.is_member(giveaway.guild_id, user_id).await? {
                    valid.push(user_id);
                } else {
                    tracing::debug!(
                        giveaway_id = giveaway.id,
                        user_id,
                        "Dropping manual winner who left the guild"
                    );
                }
            }

            if !valid.is_empty() {
                return Ok(valid);
            }
        }

        Ok(self.draw(&giveaway.entries).into_iter().collect())
    }

    fn draw(&self, entries: &[u64]) -> Option<u64> {
        if entries.is_empty() {
            return None;
        }
        let index = self.random.pick_index(entries.len());
        entries.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;

    /// Guild with a fixed member list.
    struct Members(Vec<u64>);

    #[async_trait]
    impl MembershipLookup for Members {
        async fn is_member(&self, _guild_id: u64, user_id: u64) -> Result<bool, PlatformError> {
            Ok(self.0.contains(&user_id))
        }
    }

    struct Unreachable;

    #[async_trait]
    impl MembershipLookup for Unreachable {
        async fn is_member(&self, _guild_id: u64, _user_id: u64) -> Result<bool, PlatformError> {
            Err(PlatformError::Membership("gateway timeout".to_string()))
        }
    }

    fn giveaway(entries: Vec<u64>, manual_winners: Vec<u64>) -> Giveaway {
        Giveaway {
            id: 1,
            guild_id: 10,
            channel_id: 20,
            prize: "Nitro".to_string(),
            host_id: 30,
            end_time: Utc::now(),
            entries,
            manual_winners,
            finalizing: false,
        }
    }

    fn selector(seed: u64) -> WinnerSelector {
        WinnerSelector::new(Arc::new(SeededRandom::new(seed)))
    }

    #[tokio::test]
    async fn test_manual_winners_win_in_order() {
        let g = giveaway(vec![1, 2, 3], vec![9, 7, 8]);
        let winners = selector(1)
            .select(&g, &Members(vec![1, 2, 3, 7, 8, 9]))
            .await
            .unwrap();
        assert_eq!(winners, vec![9, 7, 8]);
    }

    #[tokio::test]
    async fn test_departed_manual_winners_are_dropped_not_replaced() {
        let g = giveaway(vec![1, 2, 3], vec![9, 7, 8]);
        let winners = selector(1)
            .select(&g, &Members(vec![1, 2, 3, 9, 8]))
            .await
            .unwrap();
        assert_eq!(winners, vec![9, 8]);
    }

    #[tokio::test]
    async fn test_falls_back_to_draw_when_no_manual_winner_is_left() {
        let g = giveaway(vec![1, 2], vec![9]);
        let winners = selector(7).select(&g, &Members(vec![1, 2])).await.unwrap();
        assert_eq!(winners.len(), 1);
        assert!(g.entries.contains(&winners[0]));
    }

    #[tokio::test]
    async fn test_departed_manual_winner_and_no_entries() {
        let g = giveaway(Vec::new(), vec![9]);
        let winners = selector(7).select(&g, &Members(Vec::new())).await.unwrap();
        assert!(winners.is_empty());
    }

    #[tokio::test]
    async fn test_empty_giveaway_has_no_winner() {
        let g = giveaway(Vec::new(), Vec::new());
        let winners = selector(3).select(&g, &Members(Vec::new())).await.unwrap();
        assert!(winners.is_empty());
    }

    #[tokio::test]
    async fn test_seeded_draw_is_reproducible() {
        let g = giveaway((1..=50).collect(), Vec::new());
        let members = Members(Vec::new());

        let first = selector(42).select(&g, &members).await.unwrap();
        let second = selector(42).select(&g, &members).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[tokio::test]
    async fn test_draw_reaches_every_entry() {
        let g = giveaway(vec![1, 2, 3], Vec::new());
        let selector = selector(5);
        let members = Members(Vec::new());

        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.extend(selector.select(&g, &members).await.unwrap());
        }
        assert_eq!(seen.len(), 3);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_an_error() {
        let g = giveaway(vec![1], vec![9]);
        let result = selector(1).select(&g, &Unreachable).await;
        assert!(matches!(result, Err(PlatformError::Membership(_))));
    }

    #[tokio::test]
    async fn test_entries_only_do_not_need_membership_lookup() {
        let g = giveaway(vec![4], Vec::new());
        let winners = selector(1).select(&g, &Unreachable).await.unwrap();
        assert_eq!(winners, vec![4]);
    }
}
