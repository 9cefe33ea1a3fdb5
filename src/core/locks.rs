//! Per-period write serialisation.
//!
//! Mutating operations on the same period (create, calculate, batch save, archive)
//! must not interleave; operations on different periods may run in parallel. The
//! registry hands out one async mutex per period string for the whole process.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

static PERIOD_LOCKS: LazyLock<PeriodLocks> = LazyLock::new(PeriodLocks::default);

/// Registry of per-period async locks.
#[derive(Debug, Default)]
pub struct PeriodLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl PeriodLocks {
    /// Waits for exclusive write access to `period`.
    ///
    /// The guard must be held for the whole unit of work. Not re-entrant: a holder
    /// must not call another locking operation on the same period.
    ///
    /// Entries are never evicted. Callers validate the period first, so the registry
    /// holds at most one small mutex per `YYYY-MM` ever written.
    pub async fn acquire(&self, period: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(period.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}

/// Acquires the process-wide write lock for `period`.
pub async fn lock_period(period: &str) -> OwnedMutexGuard<()> {
    PERIOD_LOCKS.acquire(period).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_period_is_exclusive() {
        let locks = PeriodLocks::default();
        let guard = locks.acquire("2024-01").await;

        let second = tokio::time::timeout(Duration::from_millis(50), locks.acquire("2024-01")).await;
        assert!(second.is_err(), "second acquire should block while first guard is held");

        drop(guard);
        let third = tokio::time::timeout(Duration::from_millis(50), locks.acquire("2024-01")).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn test_different_periods_are_independent() {
        let locks = PeriodLocks::default();
        let _first = locks.acquire("2024-01").await;
        let second = tokio::time::timeout(Duration::from_millis(50), locks.acquire("2024-02")).await;
        assert!(second.is_ok());
    }
}
