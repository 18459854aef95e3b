//! Admission gate bounding concurrent matting work
//!
//! Matting is the expensive step of the pipeline, so the number of
//! simultaneous invocations is bounded process-wide by a counting
//! semaphore with a permit count fixed at startup. Permits are held as
//! RAII tokens: dropping the token returns the permit, so every exit
//! path (success, error, panic unwind) releases exactly once.

use crate::error::{MatteError, Result};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting gate over the expensive matting step
///
/// Cheap to clone through an `Arc`; all clones share the same permit
/// pool. Waiters are served with the FIFO fairness of the underlying
/// semaphore.
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    max_permits: usize,
}

impl AdmissionGate {
    /// Create a gate with a fixed number of permits
    #[must_use]
    pub fn new(max_permits: usize) -> Self {
        let max_permits = max_permits.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_permits)),
            max_permits,
        }
    }

    /// Acquire a permit, suspending until one is available
    ///
    /// # Errors
    /// - The gate's semaphore was closed (never done by this crate)
    pub async fn acquire(&self) -> Result<GateToken> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| MatteError::internal("admission gate closed"))?;

        Ok(GateToken { _permit: permit })
    }

    /// Number of permits currently available
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Permit count the gate was configured with
    #[must_use]
    pub fn max_permits(&self) -> usize {
        self.max_permits
    }
}

/// RAII permit for one matting operation
///
/// Held for the duration of the protected work; the permit returns to
/// the gate when the token drops.
pub struct GateToken {
    _permit: OwnedSemaphorePermit,
}
