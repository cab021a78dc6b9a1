//! Reentrancy guard for corrective wallet writes.
//!
//! Every corrective batch runs inside one suppression window. Hosts fire
//! the wallet notification synchronously from inside each write, on the
//! writing thread, so a notification observed on the thread that owns the
//! open window was caused by the core itself and must not trigger another
//! mirror pass. Notifications arriving on any other thread are real player
//! activity and are never swallowed by the window.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

/// Shared suppression flag. Clones observe the same window.
#[derive(Debug, Clone, Default)]
pub struct Suppression(Arc<Mutex<Option<ThreadId>>>);

impl Suppression {
    pub fn new() -> Self {
        Self::default()
    }

    fn owner(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True while a corrective batch is being written on any thread.
    pub fn is_active(&self) -> bool {
        self.owner().is_some()
    }

    /// True while the calling thread itself is writing a corrective batch.
    pub fn covers_current_thread(&self) -> bool {
        *self.owner() == Some(thread::current().id())
    }

    /// Opens a suppression window owned by the calling thread. The previous
    /// window, if any, is restored when the guard drops, including during
    /// unwinding.
    pub fn engage(&self) -> SuppressionGuard<'_> {
        let previous = self.owner().replace(thread::current().id());
        SuppressionGuard {
            suppression: self,
            previous,
        }
    }
}

/// Closes the suppression window on drop.
#[must_use = "the suppression window closes as soon as the guard is dropped"]
pub struct SuppressionGuard<'a> {
    suppression: &'a Suppression,
    previous: Option<ThreadId>,
}

impl Drop for SuppressionGuard<'_> {
    fn drop(&mut self) {
        *self.suppression.owner() = self.previous.take();
    }
}
