//! Feed orchestrator: the top-level coordinator for feed delivery.
//!
//! On a feed request it consults the recommendation oracle; when too few
//! fresh candidates exist it triggers deduplicated scrape jobs for the
//! user's channels, waits a bounded time, re-queries once, and renders
//! whatever is available. A short feed is a degraded result, never an
//! error -- `FeedError` is reserved for upstream unavailability.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use pulsefeed_types::config::FeedConfig;
use pulsefeed_types::error::{FeedError, TransportError};
use pulsefeed_types::feed::{FeedRequest, RecommendedItem};
use pulsefeed_types::message::{MediaKind, MessageContent, RetentionClass, purpose};

use crate::messaging::{ChatTransport, MessageRegistry};
use crate::scrape::{ScrapeCoordinator, ScrapeTicket, ScrapeWorker};

use super::oracle::{ChannelSelector, RecommendationOracle};

/// Top-level feed coordinator.
pub struct FeedOrchestrator<O, C, W>
where
    O: RecommendationOracle,
    C: ChannelSelector,
    W: ScrapeWorker,
{
    oracle: Arc<O>,
    channels: Arc<C>,
    coordinator: Arc<ScrapeCoordinator<W>>,
    config: FeedConfig,
}

impl<O, C, W> FeedOrchestrator<O, C, W>
where
    O: RecommendationOracle,
    C: ChannelSelector,
    W: ScrapeWorker,
{
    pub fn new(
        oracle: Arc<O>,
        channels: Arc<C>,
        coordinator: Arc<ScrapeCoordinator<W>>,
        config: FeedConfig,
    ) -> Self {
        Self {
            oracle,
            channels,
            coordinator,
            config,
        }
    }

    pub fn coordinator(&self) -> &ScrapeCoordinator<W> {
        &self.coordinator
    }

    /// Produce an ordered item sequence for the request.
    ///
    /// Oracle order is preserved verbatim; the result may be shorter than
    /// requested (degraded), which callers render as-is.
    pub async fn get_feed(
        &self,
        request: FeedRequest,
    ) -> Result<Vec<RecommendedItem>, FeedError> {
        let min_viable = request.min_viable.unwrap_or(self.config.min_viable);

        let items = self.oracle.recommend(request.user_id, request.count).await?;
        if items.len() >= min_viable {
            debug!(
                user_id = request.user_id,
                count = items.len(),
                "candidate pool sufficient, no scrape"
            );
            return Ok(items);
        }

        info!(
            user_id = request.user_id,
            count = items.len(),
            min_viable,
            "candidate pool under-stocked, triggering scrapes"
        );

        let channels = match self.channels.channels_for(request.user_id).await {
            Ok(channels) => channels,
            Err(e) => {
                // No channel list means nothing to scrape; degrade to what
                // the oracle already gave us.
                warn!(user_id = request.user_id, error = %e, "channel selection failed");
                return Ok(items);
            }
        };
        if channels.is_empty() {
            return Ok(items);
        }

        let mut tickets: Vec<ScrapeTicket> = channels
            .iter()
            .map(|channel| self.coordinator.trigger(channel, request.user_id))
            .collect();

        let wait = Duration::from_secs(self.config.scrape_wait_secs);
        let finished = ScrapeCoordinator::<W>::await_jobs(&mut tickets, wait).await;
        debug!(
            user_id = request.user_id,
            submitted = tickets.len(),
            finished,
            "scrape wait elapsed"
        );

        // One re-query with whatever new content arrived. If the oracle
        // dropped out between the two calls, fall back to the first batch
        // rather than failing a request that already has candidates.
        match self.oracle.recommend(request.user_id, request.count).await {
            Ok(fresh) => Ok(fresh),
            Err(e) => {
                warn!(user_id = request.user_id, error = %e, "re-query failed, degrading");
                Ok(items)
            }
        }
    }

    /// Render items into the user's chat in oracle order.
    ///
    /// Each item becomes one message with the configured feed retention
    /// class, tagged with a per-delivery interaction context, followed by
    /// an ephemeral controls message. A failed item send is logged and
    /// skipped; only a chat where nothing could be delivered is an error.
    ///
    /// Returns the interaction context for the delivery.
    pub async fn render_feed<T: ChatTransport>(
        &self,
        registry: &mut MessageRegistry<T>,
        items: &[RecommendedItem],
    ) -> Result<String, FeedError> {
        let context = format!("feed:{}", Uuid::now_v7());
        let mut delivered = 0usize;
        let mut last_error: Option<TransportError> = None;

        for item in items {
            let content = self.item_content(item).await;
            // Purposes are keyed by item so items in one delivery never
            // replace each other; only a re-send of the same item does.
            let item_purpose = format!("{}:{}", purpose::FEED_ITEM, item.item_id);
            match registry
                .send(
                    &content,
                    self.config.item_retention,
                    &item_purpose,
                    Some(&context),
                )
                .await
            {
                Ok(_) => delivered += 1,
                Err(e) => {
                    warn!(item_id = item.item_id, error = %e, "feed item send failed");
                    last_error = Some(e);
                }
            }
        }

        if delivered == 0 {
            if let Some(e) = last_error {
                return Err(FeedError::TransportUnavailable(e.to_string()));
            }
            // Nothing to deliver; an empty feed is a degraded result.
            return Ok(context);
        }

        if let Err(e) = registry
            .send(
                &MessageContent::text("👆"),
                RetentionClass::Ephemeral,
                purpose::FEED_CONTROLS,
                Some(&context),
            )
            .await
        {
            warn!(error = %e, "feed controls send failed");
        }

        info!(delivered, total = items.len(), %context, "feed rendered");
        Ok(context)
    }

    /// Build the outbound body for one item, attaching its first photo
    /// when the worker has it. Media failures degrade to text.
    async fn item_content(&self, item: &RecommendedItem) -> MessageContent {
        let text = format!("📰 @{}\n\n{}", item.channel, item.text);
        let photo = match item.media.iter().find(|m| m.kind == MediaKind::Photo) {
            Some(media) => match self
                .coordinator
                .fetch_media(&item.channel, media.media_id, media.kind)
                .await
            {
                Ok(bytes) => bytes,
                Err(e) => {
                    debug!(item_id = item.item_id, error = %e, "media fetch failed");
                    None
                }
            },
            None => None,
        };
        MessageContent { text, photo }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
