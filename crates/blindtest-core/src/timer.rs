//! Cancellable one-shot timers for acceptance-window announcements.
//!
//! Each timer is a tokio task that sleeps for the window and then runs
//! its action. Timers are keyed by [`TimerKey`] (game epoch, round index,
//! target) so a round can cancel exactly the announcements it still
//! owes. Cancelling an unknown, fired, or already cancelled key is a
//! no-op.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use blindtest_types::Target;
use tokio::task::AbortHandle;

/// Identifies one pending announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerKey {
    /// Game epoch; bumped on every `start`.
    pub epoch: u64,
    /// Index of the round in the game's round history.
    pub round_index: usize,
    /// Target whose announcement is pending.
    pub target: Target,
}

/// Set of live timers.
#[derive(Debug, Default)]
pub struct TimerSet {
    handles: BTreeMap<TimerKey, AbortHandle>,
}

impl TimerSet {
    /// Create an empty timer set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` after `delay` unless cancelled first.
    ///
    /// Scheduling a key that is already live replaces (and aborts) the
    /// previous timer. Must be called from within a tokio runtime.
    pub fn schedule<F>(&mut self, key: TimerKey, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        })
        .abort_handle();
        if let Some(previous) = self.handles.insert(key, handle) {
            previous.abort();
        }
    }

    /// Forget a timer that has fired. Called by the timer's own action.
    pub fn complete(&mut self, key: TimerKey) -> bool {
        self.handles.remove(&key).is_some()
    }

    /// Cancel one timer. Returns whether it was live.
    pub fn cancel(&mut self, key: TimerKey) -> bool {
        self.handles.remove(&key).is_some_and(|handle| {
            handle.abort();
            true
        })
    }

    /// Cancel every live timer. Returns how many were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        let handles = std::mem::take(&mut self.handles);
        let count = handles.len();
        for handle in handles.into_values() {
            handle.abort();
        }
        count
    }

    /// Whether `key` is live.
    pub fn contains(&self, key: TimerKey) -> bool {
        self.handles.contains_key(&key)
    }

    /// Number of live timers.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether no timer is live.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn key(target: Target) -> TimerKey {
        TimerKey {
            epoch: 1,
            round_index: 0,
            target,
        }
    }

    fn counting_action(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timers = TimerSet::new();
        timers.schedule(key(Target::Title), Duration::from_millis(1000), counting_action(&fired));

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timers = TimerSet::new();
        timers.schedule(key(Target::Title), Duration::from_millis(1000), counting_action(&fired));
        timers.schedule(key(Target::Artist(0)), Duration::from_millis(1000), counting_action(&fired));
        assert_eq!(timers.len(), 2);

        assert!(timers.cancel(key(Target::Title)));
        assert!(!timers.cancel(key(Target::Title)));
        assert_eq!(timers.cancel_all(), 1);
        assert!(timers.is_empty());

        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_previous_timer() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timers = TimerSet::new();
        timers.schedule(key(Target::Title), Duration::from_millis(100), counting_action(&fired));
        timers.schedule(key(Target::Title), Duration::from_millis(100), counting_action(&fired));
        assert_eq!(timers.len(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn complete_and_cancel_unknown_keys_are_noops() {
        let mut timers = TimerSet::new();
        assert!(!timers.complete(key(Target::Title)));
        assert!(!timers.cancel(key(Target::Artist(2))));
        assert_eq!(timers.cancel_all(), 0);
        assert!(!timers.contains(key(Target::Title)));
    }
}
