//! Per-title mutual exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Hands out one async lock per title id.
///
/// Entries nobody holds are dropped on the next acquisition, so the map only
/// grows with the number of titles being worked on concurrently.
#[derive(Debug, Default)]
pub struct TitleLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl TitleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `title_id`.
    pub async fn lock(&self, title_id: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.retain(|_, slot| Arc::strong_count(slot) > 1);
            Arc::clone(map.entry(title_id.to_string()).or_default())
        };
        slot.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.inner.lock().map(|m| m.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_title_is_exclusive() {
        let locks = Arc::new(TitleLocks::new());
        let guard = locks.lock("t1").await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock("t1").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_titles_do_not_block() {
        let locks = TitleLocks::new();
        let _a = locks.lock("t1").await;
        let _b = locks.lock("t2").await;
        assert_eq!(locks.tracked(), 2);
    }

    #[tokio::test]
    async fn test_released_entries_are_pruned() {
        let locks = TitleLocks::new();
        drop(locks.lock("t1").await);
        drop(locks.lock("t2").await);
        let _c = locks.lock("t3").await;
        assert_eq!(locks.tracked(), 1);
    }
}
