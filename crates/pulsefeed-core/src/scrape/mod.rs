//! Scrape triggering: the worker port and the process-wide job
//! coordinator that deduplicates in-flight scrapes per channel.

pub mod coordinator;
pub mod worker;

pub use coordinator::{ScrapeCoordinator, ScrapeTicket};
pub use worker::ScrapeWorker;
