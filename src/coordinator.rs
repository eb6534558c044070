//! Per-match mutual exclusion.
//!
//! Every match id maps to its own mutex. Work on one match runs inside that
//! mutex; different matches never contend. The coordinator knows nothing
//! about game rules.

use crate::game::MatchId;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LockError {
    /// The section stayed busy. A move queued before this one may still
    /// have been applied, so re-read the match before retrying.
    #[error("match {match_id} busy after waiting {waited:?}")]
    Timeout { match_id: MatchId, waited: Duration },
}

#[derive(Debug)]
pub struct MatchLocks {
    locks: DashMap<MatchId, Arc<Mutex<()>>>,
    timeout: Duration,
}

impl Default for MatchLocks {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}

impl MatchLocks {
    pub fn new(timeout: Duration) -> Self {
        Self { locks: DashMap::new(), timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `f` while holding the exclusive section of `match_id`.
    ///
    /// Release is fair: waiters get the section in the order they queued.
    pub fn with_match<T, F>(&self, match_id: MatchId, f: F) -> Result<T, LockError>
    where
        F: FnOnce() -> T,
    {
        // Clone the Arc out so the map shard is not held while waiting.
        let lock = self.locks.entry(match_id).or_default().value().clone();
        let Some(guard) = lock.try_lock_for(self.timeout) else {
            warn!(%match_id, waited = ?self.timeout, "match lock timed out");
            return Err(LockError::Timeout { match_id, waited: self.timeout });
        };
        debug!(%match_id, "match lock acquired");
        let out = f();
        MutexGuard::unlock_fair(guard);
        Ok(out)
    }

    /// Drop the entry for a finished or unknown match once nobody holds or
    /// awaits it.
    pub fn forget(&self, match_id: MatchId) -> bool {
        self.locks.remove_if(&match_id, |_, lock| Arc::strong_count(lock) == 1).is_some()
    }

    /// Number of matches with a lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn sections_on_same_match_do_not_overlap() {
        let locks = MatchLocks::default();
        let inside = AtomicBool::new(false);
        let entered = AtomicUsize::new(0);
        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..50 {
                        locks
                            .with_match(MatchId(1), || {
                                let overlapped = inside.swap(true, Ordering::SeqCst);
                                assert!(!overlapped, "overlapping section");
                                entered.fetch_add(1, Ordering::SeqCst);
                                inside.store(false, Ordering::SeqCst);
                            })
                            .unwrap();
                    }
                });
            }
        });
        assert_eq!(entered.load(Ordering::SeqCst), 400);
    }

    #[test]
    fn busy_match_times_out_but_other_matches_proceed() {
        let locks = MatchLocks::new(Duration::from_millis(50));
        let locks = &locks;
        let (held_tx, held_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        thread::scope(|s| {
            s.spawn(move || {
                locks
                    .with_match(MatchId(1), || {
                        held_tx.send(()).unwrap();
                        release_rx.recv().unwrap();
                    })
                    .unwrap();
            });
            held_rx.recv().unwrap();
            let err = locks.with_match(MatchId(1), || ()).unwrap_err();
            assert!(matches!(err, LockError::Timeout { match_id: MatchId(1), .. }));
            assert_eq!(locks.with_match(MatchId(2), || 7).unwrap(), 7);
            release_tx.send(()).unwrap();
        });
    }

    #[test]
    fn forget_removes_idle_entries() {
        let locks = MatchLocks::default();
        locks.with_match(MatchId(3), || ()).unwrap();
        assert_eq!(locks.len(), 1);
        assert!(locks.forget(MatchId(3)));
        assert!(locks.is_empty());
        assert!(!locks.forget(MatchId(3)));
    }
}
