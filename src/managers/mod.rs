// Stateful components of the core
// Managers own per-tab state, focus state, timers and the suspension lifecycle.

use std::sync::{Mutex, MutexGuard};

pub mod commands;
pub mod focus_tracker;
pub mod identity_remapper;
pub mod suspend_coordinator;
pub mod suspension_queue;
pub mod tab_state_store;
pub mod timer_scheduler;

/// Locks `mutex`, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
