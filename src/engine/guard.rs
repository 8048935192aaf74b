// 8.0.3: reentrancy guard. one flag per engine, held for the whole of a
// mutating operation and released when the lock drops, error paths included.

use crate::error::{LendingError, LendingResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct ReentrancyGuard {
    entered: Arc<AtomicBool>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self) -> LendingResult<GuardLock> {
        if self
            .entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            tracing::warn!("rejected re-entrant call");
            return Err(LendingError::ReentrantCall);
        }
        Ok(GuardLock {
            entered: Arc::clone(&self.entered),
        })
    }

    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct GuardLock {
    entered: Arc<AtomicBool>,
}

impl Drop for GuardLock {
    fn drop(&mut self) {
        self.entered.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Engine, EngineConfig};
    use crate::oracle::SimplePriceOracle;

    #[test]
    fn second_entry_is_rejected() {
        let guard = ReentrancyGuard::new();
        let lock = guard.enter().unwrap();
        assert!(guard.is_entered());
        assert_eq!(guard.enter().unwrap_err(), LendingError::ReentrantCall);
        drop(lock);
        assert!(!guard.is_entered());
        assert!(guard.enter().is_ok());
    }

    #[test]
    fn nested_transaction_is_rejected_and_guard_recovers() {
        let mut engine = Engine::new(EngineConfig::default(), Arc::new(SimplePriceOracle::new())).unwrap();

        let err = engine.transact(|e| e.transact(|_| Ok(()))).unwrap_err();
        assert_eq!(err, LendingError::ReentrantCall);
        assert!(!engine.guard.is_entered());

        assert!(engine.transact(|_| Ok(())).is_ok());
    }
}
