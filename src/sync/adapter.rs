use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info_span, warn, Instrument};

use super::client::PinBackend;
use super::types::*;

/// Identifies one create request until its response arrives
pub type RequestId = u64;

/// Results of background persistence requests, applied on the UI loop
#[derive(Debug)]
pub enum SyncEvent {
    /// Server stored the pin and assigned an id
    Created { request: RequestId, pin: Pin },
    /// Create failed; nothing was stored
    CreateFailed {
        request: RequestId,
        pin: NewPin,
        error: String,
    },
    /// Server acknowledged the delete
    Deleted { id: PinId },
    /// Delete failed after all retries
    DeleteFailed { id: PinId, error: String },
}

/// Backoff for delete retries
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(250),
            max_jitter: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Exponential delay with random jitter
    pub fn delay(&self, attempt: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        self.base_delay * 2u32.saturating_pow(attempt) + Duration::from_millis(jitter)
    }
}

/// Issues pin writes on background tasks and reports the outcome over a
/// channel. Never touches map state itself.
pub struct SyncAdapter<B: PinBackend> {
    backend: B,
    retry: RetryPolicy,
    event_tx: mpsc::Sender<SyncEvent>,
    next_request: RequestId,
}

impl<B: PinBackend> SyncAdapter<B> {
    pub fn new(backend: B, retry: RetryPolicy) -> (Self, mpsc::Receiver<SyncEvent>) {
        let (event_tx, event_rx) = mpsc::channel(32);

        let adapter = Self {
            backend,
            retry,
            event_tx,
            next_request: 1,
        };
        (adapter, event_rx)
    }

    /// Start a create request. Returns immediately.
    pub fn create(&mut self, pin: NewPin) -> RequestId {
        let request = self.next_request;
        self.next_request += 1;

        let backend = self.backend.clone();
        let event_tx = self.event_tx.clone();
        let span = info_span!("create_pin", request, country = %pin.country);

        tokio::spawn(
            async move {
                let event = match backend.create_pin(pin.clone()).await {
                    Ok(created) => SyncEvent::Created {
                        request,
                        pin: created,
                    },
                    Err(e) => {
                        warn!(error = %e, "Create request failed");
                        SyncEvent::CreateFailed {
                            request,
                            pin,
                            error: e.to_string(),
                        }
                    }
                };
                let _ = event_tx.send(event).await;
            }
            .instrument(span),
        );

        request
    }

    /// Start a delete request, retrying recoverable failures
    pub fn delete(&self, id: PinId) {
        let backend = self.backend.clone();
        let event_tx = self.event_tx.clone();
        let retry = self.retry;

        tokio::spawn(
            async move {
                let mut attempt = 0;
                let event = loop {
                    match backend.delete_pin(id).await {
                        Ok(()) => break SyncEvent::Deleted { id },
                        Err(e) if e.is_recoverable() && attempt < retry.max_retries => {
                            let delay = retry.delay(attempt);
                            attempt += 1;
                            warn!(error = %e, attempt, ?delay, "Delete failed, retrying");
                            sleep(delay).await;
                        }
                        Err(e) => {
                            warn!(error = %e, attempt, "Delete failed");
                            break SyncEvent::DeleteFailed {
                                id,
                                error: e.to_string(),
                            };
                        }
                    }
                };
                debug!(?event, "Delete finished");
                let _ = event_tx.send(event).await;
            }
            .instrument(info_span!("delete_pin", id)),
        );
    }
}
