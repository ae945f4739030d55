//! Advisory locking with MySQL `GET_LOCK`
//!
//! The lock is session-scoped: it lives as long as the connection that took it, and the guard
//! releases it on drop. Runners sharing a ledger table share a lock name.

use crate::executor::StrataExecutor;
use crate::migration::MigrationError;
use log::{debug, warn};
use std::time::Duration;

pub(crate) const ACQUIRE_LOCK_SQL: &str = "SELECT GET_LOCK(?, ?) AS acquired";
pub(crate) const RELEASE_LOCK_SQL: &str = "SELECT RELEASE_LOCK(?) AS released";

/// Lock name used by runners of the ledger `ledger_table`
pub fn lock_name(ledger_table: &str) -> String {
    format!("strata:{ledger_table}")
}

/// Lock guard that releases the advisory lock when dropped
pub struct MigrationLockGuard<'a> {
    executor: &'a dyn StrataExecutor,
    name: String,
}

impl<'a> MigrationLockGuard<'a> {
    /// Wait up to `timeout` for the lock named `name`
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::LockTimeout` if another session still holds the lock when the
    /// timeout expires.
    pub fn acquire(
        executor: &'a dyn StrataExecutor,
        name: &str,
        timeout: Duration,
    ) -> Result<Self, MigrationError> {
        let seconds = timeout.as_secs();
        let seconds_param = i64::try_from(seconds).unwrap_or(i64::MAX);
        let row = executor.query_one(ACQUIRE_LOCK_SQL, &[name.into(), seconds_param.into()])?;

        // 1 = acquired, 0 = timed out, NULL = error (e.g. killed while waiting)
        if row.and_then(|r| r.get_i64("acquired")) != Some(1) {
            return Err(MigrationError::LockTimeout {
                name: name.to_string(),
                seconds,
            });
        }
        debug!("acquired migration lock `{name}`");
        Ok(Self {
            executor,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for MigrationLockGuard<'_> {
    fn drop(&mut self) {
        match self.executor.query_one(RELEASE_LOCK_SQL, &[self.name.as_str().into()]) {
            Ok(_) => debug!("released migration lock `{}`", self.name),
            Err(e) => warn!("failed to release migration lock `{}`: {e}", self.name),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::MemoryExecutor;

    #[test]
    fn test_guard_releases_on_drop() {
        let exec = MemoryExecutor::new();
        {
            let guard = MigrationLockGuard::acquire(&exec, "strata:migrations", Duration::from_secs(1)).unwrap();
            assert_eq!(guard.name(), "strata:migrations");
            assert!(exec.holds_lock("strata:migrations"));
        }
        assert!(!exec.holds_lock("strata:migrations"));
    }

    #[test]
    fn test_lock_held_elsewhere_times_out() {
        let exec = MemoryExecutor::new();
        exec.hold_lock(&lock_name("migrations"));
        let err = MigrationLockGuard::acquire(&exec, &lock_name("migrations"), Duration::from_secs(2))
            .err()
            .unwrap();
        assert!(matches!(err, MigrationError::LockTimeout { seconds: 2, .. }));
    }
}
