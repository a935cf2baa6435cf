//! Single-slot overwrite channel.
//!
//! A [`SlotChannel`] holds only the latest value written to it. Writes replace
//! whatever was there, reads clone the current value out. Neither side ever
//! waits for the other, and there is no queue: a reader that is slower than the
//! writer simply skips frames.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Latest-value holder shared between one writer and any number of readers.
///
/// `T::default()` is the "nothing written yet" value, and readers treat it as
/// a signal to skip work.
#[derive(Debug, Default)]
pub struct SlotChannel<T> {
    slot: Mutex<T>,
}

impl<T: Clone + Default> SlotChannel<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(T::default()),
        }
    }

    /// Overwrite the stored value. Any unread value is discarded.
    pub fn write(&self, value: T) {
        *self.lock() = value;
    }

    /// Clone out the current value
    pub fn read(&self) -> T {
        self.lock().clone()
    }

    // The slot only ever holds a fully assigned T, so a panic in another
    // holder cannot leave it half-written.
    fn lock(&self) -> MutexGuard<'_, T> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
