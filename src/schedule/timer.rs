/// Single-shot timer. Re-arming replaces the pending deadline, so triggers never stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebounceTimer {
    deadline: Option<u64>,
}

impl DebounceTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, now_ms: u64, delay_ms: u64) {
        self.deadline = Some(now_ms + delay_ms);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    /// Returns true exactly once, on the first poll at or after the deadline.
    pub fn fire_if_due(&mut self, now_ms: u64) -> bool {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
