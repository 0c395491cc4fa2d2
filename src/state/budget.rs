/// Attempt accounting for a single stage
///
/// A stage loop keeps going while the success target is unmet, the attempt
/// ceiling is not reached, and the run of consecutive failures is below the
/// circuit-breaker limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    max_attempts: u32,
    attempts: u32,
    successes: u32,
    consecutive_failures: u32,
}

impl RetryBudget {
    /// Creates a budget allowing at most `max_attempts` attempts
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            attempts: 0,
            successes: 0,
            consecutive_failures: 0,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn successes(&self) -> u32 {
        self.successes
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Returns true once every allowed attempt has been spent
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Returns true once `limit` attempts in a row have failed
    pub fn is_tripped(&self, limit: u32) -> bool {
        self.consecutive_failures >= limit
    }

    /// Spends one attempt. Returns false (and spends nothing) when exhausted.
    pub fn begin_attempt(&mut self) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.attempts += 1;
        true
    }

    pub fn record_success(&mut self) {
        self.successes += 1;
        self.consecutive_failures = 0;
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures += 1;
    }
}
