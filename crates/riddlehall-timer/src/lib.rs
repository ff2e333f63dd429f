//! Keyed, cancellable delayed tasks for Riddlehall rooms.
//!
//! A [`TimerRegistry`] owns a set of timers, each identified by a key the
//! caller chooses (for example "match duration" or "host response"). Each
//! timer is a Tokio task that sleeps for its delay and then runs a
//! callback. Scheduling a key that is already armed replaces the old
//! timer; cancelling aborts the task.
//!
//! # Stale firings
//!
//! Aborting a task cannot recall a callback that has already run. A room
//! actor typically turns a firing into a message on its own command
//! channel, and that message may still be queued when the timer gets
//! cancelled or replaced. To tell these apart every schedule call hands
//! out a fresh [`TimerToken`], which the callback receives and should pass
//! back with its message. The owner then calls
//! [`TimerRegistry::claim`]: it succeeds only if the token still belongs
//! to the armed timer for that key.
//!
//! ```ignore
//! let tx = self_sender.clone();
//! timers.schedule(Key::HostResponse, wait, move |token| async move {
//!     let _ = tx.send(Command::TimerFired { key: Key::HostResponse, token }).await;
//! });
//!
//! // later, inside the actor loop:
//! Command::TimerFired { key, token } => {
//!     if timers.claim(&key, token) {
//!         /* still current: act on it */
//!     }
//! }
//! ```
//!
//! The registry itself is not shared between tasks. It lives inside the
//! actor that owns the state the timers guard, which is what serializes
//! claims against cancellations.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// Identifies one scheduling of a timer.
///
/// Tokens are unique per registry and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

impl TimerToken {
    /// The raw sequence number, for logging.
    pub fn get(self) -> u64 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Counters describing what a registry has done so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerMetrics {
    /// Timers armed, including replacements.
    pub scheduled: u64,
    /// Armed timers that a later schedule on the same key displaced.
    pub replaced: u64,
    /// Timers aborted through `cancel` or `cancel_all`.
    pub cancelled: u64,
    /// Firings claimed while still current.
    pub fired: u64,
    /// Firings rejected because the timer had been cancelled or replaced.
    pub stale: u64,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct Entry {
    token: TimerToken,
    armed_at: Instant,
    deadline: Instant,
    handle: JoinHandle<()>,
}

/// A keyed set of cancellable delayed tasks.
///
/// At most one timer is armed per key. Dropping the registry aborts every
/// timer it still holds.
pub struct TimerRegistry<K> {
    name: &'static str,
    entries: HashMap<K, Entry>,
    next_token: u64,
    metrics: TimerMetrics,
}

impl<K> TimerRegistry<K>
where
    K: Eq + Hash + Clone + Debug,
{
    /// Creates an empty registry. `name` only shows up in log lines.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: HashMap::new(),
            next_token: 0,
            metrics: TimerMetrics::default(),
        }
    }

    /// Arms a timer for `key` that runs `fire` after `delay`.
    ///
    /// If `key` is already armed, the old timer is aborted first. The
    /// returned token is also passed to `fire`.
    ///
    /// Must be called from inside a Tokio runtime.
    pub fn schedule<F, Fut>(&mut self, key: K, delay: Duration, fire: F) -> TimerToken
    where
        F: FnOnce(TimerToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.next_token += 1;
        let token = TimerToken(self.next_token);

        let handle = tokio::spawn(async move {
            time::sleep(delay).await;
            fire(token).await;
        });

        let now = Instant::now();
        let entry = Entry {
            token,
            armed_at: now,
            deadline: now + delay,
            handle,
        };

        if let Some(old) = self.entries.insert(key.clone(), entry) {
            old.handle.abort();
            self.metrics.replaced += 1;
            debug!(
                registry = self.name,
                ?key,
                old_token = old.token.get(),
                "timer replaced"
            );
        }
        self.metrics.scheduled += 1;

        trace!(
            registry = self.name,
            ?key,
            token = token.get(),
            delay_ms = delay.as_millis() as u64,
            "timer armed"
        );

        token
    }

    /// Cancels the timer for `key`. Returns `false` if none was armed.
    pub fn cancel(&mut self, key: &K) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                entry.handle.abort();
                self.metrics.cancelled += 1;
                trace!(registry = self.name, ?key, "timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancels every armed timer. Returns how many were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.entries.len();
        for (_, entry) in self.entries.drain() {
            entry.handle.abort();
        }
        self.metrics.cancelled += count as u64;
        if count > 0 {
            trace!(registry = self.name, count, "all timers cancelled");
        }
        count
    }

    /// Accepts a firing if `token` is still the armed timer for `key`.
    ///
    /// On success the entry is removed, so a key fires at most once per
    /// schedule. A firing whose timer was cancelled or replaced in the
    /// meantime returns `false` and must be ignored by the caller.
    pub fn claim(&mut self, key: &K, token: TimerToken) -> bool {
        match self.entries.get(key) {
            Some(entry) if entry.token == token => {
                self.entries.remove(key);
                self.metrics.fired += 1;
                true
            }
            _ => {
                self.metrics.stale += 1;
                debug!(
                    registry = self.name,
                    ?key,
                    token = token.get(),
                    "stale timer firing ignored"
                );
                false
            }
        }
    }

    /// Whether a timer is armed for `key`.
    pub fn is_armed(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// The token of the armed timer for `key`, if any.
    pub fn token(&self, key: &K) -> Option<TimerToken> {
        self.entries.get(key).map(|e| e.token)
    }

    /// Time left before the timer for `key` fires.
    pub fn remaining(&self, key: &K) -> Option<Duration> {
        self.entries
            .get(key)
            .map(|e| e.deadline.saturating_duration_since(Instant::now()))
    }

    /// Time since the timer for `key` was armed.
    pub fn elapsed(&self, key: &K) -> Option<Duration> {
        self.entries.get(key).map(|e| e.armed_at.elapsed())
    }

    /// Number of armed timers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn metrics(&self) -> &TimerMetrics {
        &self.metrics
    }
}

impl<K> Drop for TimerRegistry<K> {
    fn drop(&mut self) {
        for (_, entry) in self.entries.drain() {
            entry.handle.abort();
        }
    }
}
