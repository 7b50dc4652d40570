//! In-memory persistence service for tests

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::StatusCode;

use crate::error::SyncError;

use super::client::PinBackend;
use super::types::*;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(NewPin),
    Delete(PinId),
}

#[derive(Default)]
struct Inner {
    calls: Vec<Call>,
    next_id: PinId,
    create_failure: Option<StatusCode>,
    delete_failures: VecDeque<StatusCode>,
}

/// Records every request and answers like the real service would
#[derive(Clone)]
pub struct RecordingBackend {
    inner: Arc<Mutex<Inner>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 100,
                ..Inner::default()
            })),
        }
    }

    /// Answer every create with this status
    pub fn failing_creates(self, status: StatusCode) -> Self {
        self.inner.lock().create_failure = Some(status);
        self
    }

    /// Answer the next deletes with these statuses, then succeed
    pub fn with_delete_failures(self, statuses: &[StatusCode]) -> Self {
        self.inner.lock().delete_failures.extend(statuses.iter().copied());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().calls.clone()
    }
}

impl PinBackend for RecordingBackend {
    fn create_pin(&self, pin: NewPin) -> impl Future<Output = Result<Pin, SyncError>> + Send {
        let result = {
            let mut inner = self.inner.lock();
            inner.calls.push(Call::Create(pin.clone()));
            match inner.create_failure {
                Some(status) => Err(SyncError::HttpStatus(status)),
                None => {
                    let id = inner.next_id;
                    inner.next_id += 1;
                    Ok(Pin {
                        id,
                        user_id: pin.user_id,
                        latitude: pin.latitude,
                        longitude: pin.longitude,
                        country: Some(pin.country),
                    })
                }
            }
        };
        async move { result }
    }

    fn delete_pin(&self, id: PinId) -> impl Future<Output = Result<(), SyncError>> + Send {
        let result = {
            let mut inner = self.inner.lock();
            inner.calls.push(Call::Delete(id));
            match inner.delete_failures.pop_front() {
                Some(status) => Err(SyncError::HttpStatus(status)),
                None => Ok(()),
            }
        };
        async move { result }
    }
}
