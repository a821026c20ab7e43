//! Delivery of queued entries to the remote sink.

mod sink;
mod worker;

pub use sink::{sink_from_config, DisabledSink, HttpSink, RemoteSink};
pub use worker::{drain_and_notify, spawn_sync_worker, SyncHandle};

use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("sink rejected entry with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no remote sink configured")]
    Disabled,
}

/// What woke the sync worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    ConnectivityRestored,
    Interval,
    /// A client waiting on the result of the drain.
    Manual,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    pub remaining: usize,
}
