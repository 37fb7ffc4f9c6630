//! Explicit debounce timer driven by caller-supplied timestamps.

/// Collapses a burst of `touch` calls into one firing, `quiet_ms` after the
/// last touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debouncer {
    quiet_ms: i64,
    deadline: Option<i64>,
}

impl Debouncer {
    pub fn new(quiet_ms: u64) -> Self {
        Self {
            quiet_ms: i64::try_from(quiet_ms).unwrap_or(i64::MAX),
            deadline: None,
        }
    }

    /// Restart the quiet period from `now_ms`.
    pub fn touch(&mut self, now_ms: i64) {
        self.deadline = Some(now_ms.saturating_add(self.quiet_ms));
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True exactly once when the quiet period has elapsed.
    pub fn fire_if_due(&mut self, now_ms: i64) -> bool {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Drop a pending firing.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
