// =============================================================================
// Admission Gate — single global ticket for every outbound provider call
// =============================================================================
//
// Alpha Vantage budgets requests per key, not per symbol, so every fetch in
// the process queues on one ticket. The holder sleeps a fixed spacing delay
// before it may issue its request and keeps the ticket until the response has
// been handled. Dropping the ticket (including when a waiting or sleeping
// future is cancelled or dropped) returns it to the queue.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::error::FetchError;

/// Default pause between acquiring the ticket and sending the request.
pub const DEFAULT_SPACING: Duration = Duration::from_millis(300);

/// FIFO admission gate with exactly one ticket.
#[derive(Clone)]
pub struct AdmissionGate {
    tickets: Arc<Semaphore>,
    spacing: Duration,
}

/// Proof of exclusive access to the upstream channel. Released on drop.
pub struct AdmissionTicket {
    _permit: OwnedSemaphorePermit,
    queued_for: Duration,
}

impl AdmissionTicket {
    /// Time spent waiting for the ticket, excluding the spacing delay.
    pub fn queued_for(&self) -> Duration {
        self.queued_for
    }
}

impl AdmissionGate {
    pub fn new(spacing: Duration) -> Self {
        Self {
            tickets: Arc::new(Semaphore::new(1)),
            spacing,
        }
    }

    /// `true` when nobody holds the ticket.
    pub fn is_idle(&self) -> bool {
        self.tickets.available_permits() == 1
    }

    /// Wait for the ticket, then wait out the spacing delay.
    ///
    /// The spacing applies unconditionally, however long the queue wait was.
    /// Cancellation at either stage returns [`FetchError::Cancelled`] and
    /// leaves the ticket free.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<AdmissionTicket, FetchError> {
        let started = Instant::now();

        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("cancelled while queued for admission");
                return Err(FetchError::Cancelled);
            }
            permit = self.tickets.clone().acquire_owned() => {
                // The semaphore is never closed; treat closure like shutdown.
                permit.map_err(|_| FetchError::Cancelled)?
            }
        };
        let queued_for = started.elapsed();
        trace!(queued_ms = queued_for.as_millis() as u64, "admission ticket acquired");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("cancelled during spacing delay");
                return Err(FetchError::Cancelled);
            }
            _ = tokio::time::sleep(self.spacing) => {}
        }

        Ok(AdmissionTicket {
            _permit: permit,
            queued_for,
        })
    }
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self::new(DEFAULT_SPACING)
    }
}

impl std::fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("spacing", &self.spacing)
            .field("idle", &self.is_idle())
            .finish()
    }
}
