mod adapter;
mod client;
mod types;

#[cfg(test)]
pub mod testing;

pub use adapter::{RequestId, RetryPolicy, SyncAdapter, SyncEvent};
pub use client::{PinBackend, PinClient};
pub use types::{Credential, NewPin, Pin, PinId};
