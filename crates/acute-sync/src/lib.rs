use acute_core::RawSummary;
use std::future::Future;

pub mod client;
pub mod config;
pub mod error;
pub mod poller;

pub use client::SummaryClient;
pub use config::{SyncConfig, DEFAULT_BASE_URL};
pub use error::ClientError;
pub use poller::{spawn_poller, PollEvent, PollerConfig, PollerHandle};

/// Where the poller gets its snapshots from.
pub trait SummarySource: Send + Sync {
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<RawSummary>, ClientError>> + Send;
}

impl SummarySource for SummaryClient {
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<RawSummary>, ClientError>> + Send {
        SummaryClient::fetch_all(self)
    }
}
