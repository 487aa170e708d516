//! Frontier limiter bounding total fetch admissions for a session

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Per-session admission gate consulted before every fetch
///
/// With a limit of `N`, exactly the first `N` calls to [`admit`](Self::admit)
/// succeed, including under concurrent invocation: the check and the increment
/// happen in one atomic update, so the count never overshoots. Requests the
/// engine issued before the limit was reached are not affected.
#[derive(Debug)]
pub struct FrontierLimiter {
    limit: Option<u64>,
    admitted: AtomicU64,
    exhausted_logged: AtomicBool,
}

impl FrontierLimiter {
    /// Creates a limiter; `None` admits everything
    pub fn new(limit: Option<u64>) -> Self {
        Self {
            limit,
            admitted: AtomicU64::new(0),
            exhausted_logged: AtomicBool::new(false),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Admits one more fetch if the budget allows it
    pub fn admit(&self) -> bool {
        let Some(limit) = self.limit else {
            self.admitted.fetch_add(1, Ordering::Relaxed);
            return true;
        };

        let admitted = self
            .admitted
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count < limit).then_some(count + 1)
            })
            .is_ok();

        if !admitted && !self.exhausted_logged.swap(true, Ordering::Relaxed) {
            tracing::warn!("Fetch limit of {} reached, rejecting further requests", limit);
        }

        admitted
    }

    /// Number of fetches admitted so far
    pub fn admitted(&self) -> u64 {
        self.admitted.load(Ordering::Acquire)
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Admissions left before the gate closes, `None` when unbounded
    pub fn remaining(&self) -> Option<u64> {
        self.limit
            .map(|limit| limit.saturating_sub(self.admitted()))
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == Some(0)
    }
}
