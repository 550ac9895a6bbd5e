//! Scrape worker port.
//!
//! The worker owns the content store: it fetches items not yet present,
//! downloads associated media, and ingests the results. Authentication to
//! the source platform and rate-limited pagination are its concern, not
//! ours -- a scrape call resolves when ingestion has finished.

use pulsefeed_types::error::ScrapeError;
use pulsefeed_types::message::MediaKind;
use pulsefeed_types::scrape::ScrapeOutcome;

/// Operations exposed by the scrape worker.
pub trait ScrapeWorker: Send + Sync + 'static {
    /// Scrape up to `limit` new items from a channel into the content
    /// store. Resolves on completion.
    fn scrape(
        &self,
        channel: &str,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<ScrapeOutcome, ScrapeError>> + Send;

    /// Join a channel so future items can be observed.
    fn join(
        &self,
        channel: &str,
    ) -> impl std::future::Future<Output = Result<(), ScrapeError>> + Send;

    /// Fetch raw media bytes for an ingested item. `Ok(None)` means the
    /// media is not available.
    fn fetch_media(
        &self,
        channel: &str,
        media_id: i64,
        kind: MediaKind,
    ) -> impl std::future::Future<Output = Result<Option<Vec<u8>>, ScrapeError>> + Send;
}
