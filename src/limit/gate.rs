//! Concurrency gating for active downloads.
//!
//! This module provides the [`DownloadGate`], a counting semaphore that caps
//! how many downloads may stream simultaneously. Sessions past the cap
//! suspend in `acquire` until a slot frees; there is no queue-length cap and
//! no fairness guarantee beyond release order.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument};

/// Minimum allowed gate capacity.
const MIN_CAPACITY: usize = 1;

/// Maximum allowed gate capacity.
const MAX_CAPACITY: usize = 100;

/// Error type for gate operations.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// Invalid capacity value provided.
    #[error("invalid gate capacity {value}: must be between {MIN_CAPACITY} and {MAX_CAPACITY}")]
    InvalidCapacity {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Semaphore was closed unexpectedly.
    #[error("download gate closed unexpectedly")]
    Closed,
}

/// Bounded semaphore capping simultaneous streaming downloads.
///
/// Cheap to share behind an `Arc`; permits are owned so a session can carry
/// its slot across await points and release it on any exit path by drop.
#[derive(Debug)]
pub struct DownloadGate {
    /// Permits for concurrent downloads.
    permits: Arc<Semaphore>,
    /// Configured capacity.
    capacity: usize,
}

impl DownloadGate {
    /// Creates a gate admitting at most `capacity` concurrent downloads.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::InvalidCapacity`] if `capacity` is outside the
    /// valid range (1-100).
    #[instrument(level = "debug")]
    pub fn new(capacity: usize) -> Result<Self, GateError> {
        if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&capacity) {
            return Err(GateError::InvalidCapacity { value: capacity });
        }

        debug!(capacity, "creating download gate");

        Ok(Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    /// Waits for a download slot, suspending while the gate is full.
    ///
    /// The returned permit releases its slot when dropped, which covers
    /// every exit path including cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Closed`] if the underlying semaphore was closed;
    /// the gate never closes it itself.
    pub async fn acquire(&self) -> Result<DownloadPermit, GateError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| GateError::Closed)?;
        debug!(available = self.permits.available_permits(), "download slot acquired");
        Ok(DownloadPermit { _permit: permit })
    }

    /// Returns the configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns how many slots are currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

/// An acquired download slot; dropping it frees the slot.
#[derive(Debug)]
pub struct DownloadPermit {
    _permit: OwnedSemaphorePermit,
}
