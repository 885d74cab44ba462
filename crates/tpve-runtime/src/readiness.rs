use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

/// Pacing between stages. Fixed settle delays are modelled as waits on a
/// predicate that never becomes true.
pub trait Readiness {
    /// Poll `ready` until it returns true or `timeout` elapses.
    /// Returns whether the target became ready.
    fn wait_until_ready(
        &self,
        target: &str,
        ready: &mut dyn FnMut() -> bool,
        timeout: Duration,
    ) -> bool;

    /// Flat delay of `period`.
    fn settle(&self, target: &str, period: Duration) {
        self.wait_until_ready(target, &mut || false, period);
    }
}

/// Real-time implementation polling once per second.
#[derive(Debug, Clone, Copy)]
pub struct SleepReadiness {
    pub interval: Duration,
}

impl Default for SleepReadiness {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

impl Readiness for SleepReadiness {
    fn wait_until_ready(
        &self,
        target: &str,
        ready: &mut dyn FnMut() -> bool,
        timeout: Duration,
    ) -> bool {
        debug!(target_name = target, ?timeout, "waiting");
        let deadline = Instant::now() + timeout;
        loop {
            if ready() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(self.interval.min(deadline - now));
        }
    }
}
