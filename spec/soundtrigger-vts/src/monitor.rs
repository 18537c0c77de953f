//! Counting rendezvous between callback threads and the test thread.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A counting semaphore with a bounded wait.
///
/// Each [`notify`](Monitor::notify) adds one unit; each successful
/// [`wait`](Monitor::wait) consumes exactly one. Writes made before a
/// `notify` are visible to the thread whose `wait` consumed that unit.
#[derive(Debug, Default)]
pub struct Monitor {
    count: Mutex<u32>,
    cond: Condvar,
}

impl Monitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one unit and wake a waiter.
    pub fn notify(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_add(1);
        self.cond.notify_one();
    }

    /// Wait up to `timeout` for a unit. Returns true and consumes it, or
    /// returns false on timeout without touching the count.
    ///
    /// A timeout too large to express as a deadline waits without one.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut count = self.count.lock();
        while *count == 0 {
            match deadline {
                Some(deadline) => {
                    if self.cond.wait_until(&mut count, deadline).timed_out() {
                        break;
                    }
                }
                None => self.cond.wait(&mut count),
            }
        }

        if *count > 0 {
            *count -= 1;
            true
        } else {
            false
        }
    }

    /// Units currently available.
    pub fn pending(&self) -> u32 {
        *self.count.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn notifications_accumulate() {
        let monitor = Monitor::new();
        for _ in 0..3 {
            monitor.notify();
        }
        assert_eq!(monitor.pending(), 3);

        assert!(monitor.wait(Duration::ZERO));
        assert!(monitor.wait(Duration::ZERO));
        assert_eq!(monitor.pending(), 1);
        assert!(monitor.wait(Duration::ZERO));
        assert_eq!(monitor.pending(), 0);
    }

    #[test]
    fn timeout_waits_at_least_the_deadline() {
        let monitor = Monitor::new();
        monitor.notify();
        assert!(monitor.wait(Duration::from_millis(10)));

        let timeout = Duration::from_millis(100);
        let start = Instant::now();
        assert!(!monitor.wait(timeout));
        assert!(start.elapsed() >= timeout);
        assert_eq!(monitor.pending(), 0);
    }

    #[test]
    fn wakes_on_notify_from_another_thread() {
        let monitor = Arc::new(Monitor::new());
        let notifier = monitor.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            notifier.notify();
        });

        assert!(monitor.wait(Duration::from_secs(5)));
        handle.join().unwrap();
        assert_eq!(monitor.pending(), 0);
    }

    #[test]
    fn unbounded_timeouts_do_not_overflow() {
        let monitor = Arc::new(Monitor::new());
        monitor.notify();
        assert!(monitor.wait(Duration::MAX));

        let notifier = monitor.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            notifier.notify();
        });
        assert!(monitor.wait(Duration::from_secs(u64::MAX)));
        handle.join().unwrap();
        assert_eq!(monitor.pending(), 0);
    }

    #[test]
    fn notify_before_wait_is_not_lost() {
        let monitor = Arc::new(Monitor::new());
        let notifier = monitor.clone();
        std::thread::spawn(move || notifier.notify()).join().unwrap();
        assert!(monitor.wait(Duration::from_millis(1)));
    }
}
