//! Scrape job coordinator: a process-wide registry of in-flight jobs
//! keyed by channel, with watch-based completion signals.
//!
//! This registry is the one process-wide shared mutable structure in the
//! system. A channel with a pending/running job never gets a second job:
//! later callers subscribe to the existing job's signal instead. Jobs are
//! driven on their own tasks, so a caller that stops waiting leaves the
//! job running for future requests to benefit from.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use pulsefeed_types::error::ScrapeError;
use pulsefeed_types::message::MediaKind;
use pulsefeed_types::scrape::{ScrapeJob, ScrapeJobStatus};

use super::worker::ScrapeWorker;

/// A caller's view of one submitted (or joined) scrape job.
#[derive(Debug)]
pub struct ScrapeTicket {
    pub job_id: Uuid,
    /// True when this call created the job; false when it joined an
    /// existing one.
    pub newly_created: bool,
    rx: watch::Receiver<ScrapeJobStatus>,
}

impl ScrapeTicket {
    /// Last observed status without waiting.
    pub fn status(&self) -> ScrapeJobStatus {
        *self.rx.borrow()
    }
}

struct JobEntry {
    job_id: Uuid,
    tx: watch::Sender<ScrapeJobStatus>,
}

/// Coordinates scrape triggers against the worker.
pub struct ScrapeCoordinator<W: ScrapeWorker> {
    worker: Arc<W>,
    jobs: Arc<DashMap<String, JobEntry>>,
    /// Items requested per channel scrape.
    limit: u32,
}

impl<W: ScrapeWorker> ScrapeCoordinator<W> {
    pub fn new(worker: Arc<W>, limit: u32) -> Self {
        Self {
            worker,
            jobs: Arc::new(DashMap::new()),
            limit,
        }
    }

    /// Submit a scrape for a channel, or join the in-flight job if one
    /// exists.
    ///
    /// The returned ticket carries the completion signal; the job itself
    /// runs on its own task and outlives any waiter.
    pub fn trigger(&self, channel: &str, requested_by: i64) -> ScrapeTicket {
        let channel = channel.trim_start_matches('@').to_lowercase();

        let (job, tx, rx) = match self.jobs.entry(channel.clone()) {
            Entry::Occupied(entry) => {
                debug!(%channel, job_id = %entry.get().job_id, "joining in-flight scrape job");
                return ScrapeTicket {
                    job_id: entry.get().job_id,
                    newly_created: false,
                    rx: entry.get().tx.subscribe(),
                };
            }
            Entry::Vacant(slot) => {
                let job = ScrapeJob::new(channel.clone(), requested_by);
                let (tx, rx) = watch::channel(ScrapeJobStatus::Pending);
                slot.insert(JobEntry {
                    job_id: job.job_id,
                    tx: tx.clone(),
                });
                (job, tx, rx)
            }
        };

        let ticket = ScrapeTicket {
            job_id: job.job_id,
            newly_created: true,
            rx,
        };

        let worker = Arc::clone(&self.worker);
        let jobs = Arc::clone(&self.jobs);
        let limit = self.limit;
        tokio::spawn(async move {
            debug!(channel = %job.channel, job_id = %job.job_id, "scrape job starting");
            let _ = tx.send(ScrapeJobStatus::Running);

            let status = match worker.scrape(&job.channel, limit).await {
                Ok(outcome) => ScrapeJobStatus::Succeeded {
                    items_ingested: outcome.items_ingested,
                },
                Err(e) => {
                    // Treated as "no new content"; never surfaced raw.
                    warn!(channel = %job.channel, job_id = %job.job_id, error = %e, "scrape job failed");
                    ScrapeJobStatus::Failed
                }
            };

            debug!(channel = %job.channel, job_id = %job.job_id, %status, "scrape job finished");
            let _ = tx.send(status);
            // Evict so a later under-stocked request starts a fresh job;
            // cloned receivers keep the terminal status observable.
            jobs.remove(&job.channel);
        });

        ticket
    }

    /// Wait for every ticket to reach a terminal status, bounded by
    /// `timeout`. Returns how many finished in time; the rest keep
    /// running in the background.
    pub async fn await_jobs(tickets: &mut [ScrapeTicket], timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut finished = 0;

        for ticket in tickets.iter_mut() {
            loop {
                if ticket.rx.borrow().is_terminal() {
                    finished += 1;
                    break;
                }
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                match tokio::time::timeout(remaining, ticket.rx.changed()).await {
                    Ok(Ok(())) => {}
                    // Sender dropped or deadline passed; check once more
                    // in case the terminal status landed.
                    Ok(Err(_)) | Err(_) => {
                        if ticket.rx.borrow().is_terminal() {
                            finished += 1;
                        }
                        break;
                    }
                }
            }
        }
        finished
    }

    /// Ask the worker to join a channel; failure is logged, not surfaced.
    pub async fn ensure_joined(&self, channel: &str) {
        if let Err(e) = self.worker.join(channel).await {
            warn!(%channel, error = %e, "channel join failed");
        }
    }

    /// Fetch media bytes for an ingested item through the worker.
    pub async fn fetch_media(
        &self,
        channel: &str,
        media_id: i64,
        kind: MediaKind,
    ) -> Result<Option<Vec<u8>>, ScrapeError> {
        self.worker.fetch_media(channel, media_id, kind).await
    }

    /// Number of jobs currently pending or running.
    pub fn in_flight(&self) -> usize {
        self.jobs.len()
    }

    /// Status of the in-flight job for a channel, if any.
    pub fn status_of(&self, channel: &str) -> Option<ScrapeJobStatus> {
        let channel = channel.trim_start_matches('@').to_lowercase();
        self.jobs.get(&channel).map(|e| *e.tx.borrow())
    }
}

impl<W: ScrapeWorker> std::fmt::Debug for ScrapeCoordinator<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapeCoordinator")
            .field("in_flight", &self.jobs.len())
            .field("limit", &self.limit)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pulsefeed_types::scrape::ScrapeOutcome;

    use std::sync::atomic::{AtomicU32, Ordering};

    /// Worker stub counting scrape calls; each scrape takes `delay`.
    struct SlowWorker {
        calls: AtomicU32,
        delay: Duration,
        fail: bool,
    }

    impl SlowWorker {
        fn new(delay: Duration) -> Self {
            Self {
                calls: AtomicU32::new(0),
                delay,
                fail: false,
            }
        }
    }

    impl ScrapeWorker for SlowWorker {
        async fn scrape(&self, _channel: &str, _limit: u32) -> Result<ScrapeOutcome, ScrapeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(ScrapeError::Unavailable("client disconnected".to_string()));
            }
            Ok(ScrapeOutcome { items_ingested: 4 })
        }

        async fn join(&self, _channel: &str) -> Result<(), ScrapeError> {
            Ok(())
        }

        async fn fetch_media(
            &self,
            _channel: &str,
            _media_id: i64,
            _kind: MediaKind,
        ) -> Result<Option<Vec<u8>>, ScrapeError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn overlapping_triggers_share_one_job() {
        let worker = Arc::new(SlowWorker::new(Duration::from_millis(50)));
        let coordinator = ScrapeCoordinator::new(Arc::clone(&worker), 7);

        let first = coordinator.trigger("@durov", 1);
        let second = coordinator.trigger("durov", 2);

        assert!(first.newly_created);
        assert!(!second.newly_created);
        assert_eq!(first.job_id, second.job_id);

        let mut tickets = [first, second];
        let finished =
            ScrapeCoordinator::<SlowWorker>::await_jobs(&mut tickets, Duration::from_secs(2)).await;
        assert_eq!(finished, 2);
        assert_eq!(worker.calls.load(Ordering::SeqCst), 1);

        // The second caller observes the first job's result.
        assert_eq!(
            tickets[1].status(),
            ScrapeJobStatus::Succeeded { items_ingested: 4 }
        );
    }

    #[tokio::test]
    async fn terminal_job_is_evicted_and_next_trigger_is_fresh() {
        let worker = Arc::new(SlowWorker::new(Duration::from_millis(10)));
        let coordinator = ScrapeCoordinator::new(Arc::clone(&worker), 7);

        let mut tickets = [coordinator.trigger("durov", 1)];
        ScrapeCoordinator::<SlowWorker>::await_jobs(&mut tickets, Duration::from_secs(2)).await;

        // Allow the driving task to evict after sending the terminal status
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(coordinator.in_flight(), 0);

        let again = coordinator.trigger("durov", 1);
        assert!(again.newly_created);
        assert_ne!(again.job_id, tickets[0].job_id);
    }

    #[tokio::test]
    async fn timed_out_wait_leaves_job_running() {
        let worker = Arc::new(SlowWorker::new(Duration::from_millis(200)));
        let coordinator = ScrapeCoordinator::new(Arc::clone(&worker), 7);

        let mut tickets = [coordinator.trigger("durov", 1)];
        let finished =
            ScrapeCoordinator::<SlowWorker>::await_jobs(&mut tickets, Duration::from_millis(20))
                .await;
        assert_eq!(finished, 0);
        assert!(!tickets[0].status().is_terminal());

        // The job keeps running in the background and still completes.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(
            tickets[0].status(),
            ScrapeJobStatus::Succeeded { items_ingested: 4 }
        );
    }

    #[tokio::test]
    async fn failed_scrape_reports_failed_status() {
        let mut worker = SlowWorker::new(Duration::from_millis(5));
        worker.fail = true;
        let coordinator = ScrapeCoordinator::new(Arc::new(worker), 7);

        let mut tickets = [coordinator.trigger("durov", 1)];
        let finished =
            ScrapeCoordinator::<SlowWorker>::await_jobs(&mut tickets, Duration::from_secs(1)).await;
        assert_eq!(finished, 1);
        assert_eq!(tickets[0].status(), ScrapeJobStatus::Failed);
    }

    #[tokio::test]
    async fn status_of_reports_in_flight_job() {
        let worker = Arc::new(SlowWorker::new(Duration::from_millis(100)));
        let coordinator = ScrapeCoordinator::new(worker, 7);

        assert!(coordinator.status_of("durov").is_none());
        let _ticket = coordinator.trigger("durov", 1);
        assert!(coordinator.status_of("@Durov").is_some());
    }
}
