use std::time::Duration;

/// Number of times the truncate step is tried before giving up.
pub const TRUNCATE_ATTEMPTS: u32 = 5;
/// Delay between two truncate attempts while the file is still locked.
pub const TRUNCATE_RETRY_DELAY: Duration = Duration::from_secs(1);
/// Sleep increment of the foreground wait loop.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Timing policy shared by the responder and the lifecycle controller.
///
/// There is no config file; the binary always runs with `Policy::default()`.
/// Tests build shortened policies so they don't sleep for whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// Upper bound on truncate attempts, including the first one.
    pub truncate_attempts: u32,
    /// Pause between truncate attempts.
    pub truncate_retry_delay: Duration,
    /// How long the controller sleeps between two looks at the running flag.
    pub poll_interval: Duration,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            truncate_attempts: TRUNCATE_ATTEMPTS,
            truncate_retry_delay: TRUNCATE_RETRY_DELAY,
            poll_interval: POLL_INTERVAL,
        }
    }
}

impl Policy {
    /// Same bounds as the default policy, with millisecond delays.
    #[cfg(test)]
    pub fn fast() -> Self {
        Self {
            truncate_attempts: TRUNCATE_ATTEMPTS,
            truncate_retry_delay: Duration::from_millis(1),
            poll_interval: Duration::from_millis(5),
        }
    }
}
