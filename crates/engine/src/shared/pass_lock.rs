use std::{
    fmt::Display,
    sync::atomic::{AtomicBool, Ordering},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Dispatch,
    Recurrence,
}

impl Display for PassKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dispatch => write!(f, "dispatch"),
            Self::Recurrence => write!(f, "recurrence"),
        }
    }
}

/// Makes sure at most one pass of a kind runs at a time.
/// A trigger that finds the lock taken is skipped rather than queued.
#[derive(Debug)]
pub struct PassLock {
    kind: PassKind,
    busy: AtomicBool,
}

/// Releases the `PassLock` when dropped
#[derive(Debug)]
pub struct PassGuard<'a> {
    lock: &'a PassLock,
}

impl PassLock {
    pub fn new(kind: PassKind) -> Self {
        Self {
            kind,
            busy: AtomicBool::new(false),
        }
    }

    pub fn kind(&self) -> PassKind {
        self.kind
    }

    pub fn try_acquire(&self) -> Option<PassGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PassGuard { lock: self })
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.lock.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_released() {
        let lock = PassLock::new(PassKind::Dispatch);
        let guard = lock.try_acquire();
        assert!(guard.is_some());
        assert!(lock.try_acquire().is_none());

        drop(guard);
        assert!(lock.try_acquire().is_some());
    }
}
