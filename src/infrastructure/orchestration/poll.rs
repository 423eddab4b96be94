//! Polling loop for pull-based sources.
//!
//! Every tick fetches pages at the current watermark until the source has
//! nothing more to give, the page budget is spent or the watermark stops
//! moving. Pages never use offsets: each one is re-anchored at the watermark
//! the previous page left behind.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::application::Pipeline;
use crate::domain::Cursor;
use crate::error::Result;
use crate::infrastructure::config::source::SourceConfig;
use crate::port::outbound::source::{PollRequest, PollingSource};

/// Pacing of the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub page_size: usize,
    pub max_page_size: usize,
    pub max_pages_per_cycle: u32,
}

impl From<&SourceConfig> for PollSettings {
    fn from(config: &SourceConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.poll_interval_secs),
            page_size: config.page_size,
            max_page_size: config.max_page_size,
            max_pages_per_cycle: config.max_pages_per_cycle,
        }
    }
}

/// What one tick accomplished.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub pages: u32,
    pub delivered: usize,
    pub failed: usize,
    /// The tick stopped on a crowded timestamp the largest page could not get past.
    pub stuck: bool,
}

/// Consecutive failing ticks on an unmoved watermark before the stall is
/// reported, and again every this many ticks after.
pub const STALL_WARN_TICKS: u32 = 5;

/// Counts ticks whose deliveries failed while the watermark stayed put.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StallTracker {
    held_at: Option<Cursor>,
    ticks: u32,
}

impl StallTracker {
    /// Record a finished tick. Returns the number of stalled ticks when a
    /// warning is due.
    pub fn observe(&mut self, report: &TickReport, cursor: Cursor) -> Option<u32> {
        if report.failed == 0 {
            *self = Self::default();
            return None;
        }
        if self.held_at == Some(cursor) {
            self.ticks += 1;
        } else {
            self.held_at = Some(cursor);
            self.ticks = 1;
        }
        (self.ticks % STALL_WARN_TICKS == 0).then_some(self.ticks)
    }
}

/// Fetch and process pages until caught up.
///
/// A truncated page that moved the watermark is followed immediately by the
/// next one. A truncated page that could not move it means one timestamp
/// holds more events than fit in a page, so the page size doubles up to
/// `max_page_size`. A failed delivery ends the tick; the next tick retries.
///
/// # Errors
///
/// Returns the source's error for transport failures. Pages processed before
/// the failure stay committed.
pub async fn catch_up(
    pipeline: &mut Pipeline,
    source: &dyn PollingSource,
    settings: &PollSettings,
) -> Result<TickReport> {
    let mut report = TickReport::default();
    let mut limit = settings.page_size;

    while report.pages < settings.max_pages_per_cycle {
        let before = pipeline.cursor();
        let batch = source.poll(PollRequest::new(before, limit)).await?;
        report.pages += 1;

        let truncated = batch.truncated;
        let cycle = pipeline.run_cycle(batch).await;
        report.delivered += cycle.delivered;
        report.failed += cycle.failed;

        if !truncated || cycle.failed > 0 {
            break;
        }
        if pipeline.cursor() > before {
            continue;
        }
        if limit >= settings.max_page_size {
            warn!(
                source = source.source_name(),
                cursor = %before,
                limit,
                "Page full at a single timestamp, raise max_page_size to get past it"
            );
            report.stuck = true;
            break;
        }
        limit = limit.saturating_mul(2).min(settings.max_page_size);
        debug!(limit, cursor = %before, "Growing page size");
    }

    Ok(report)
}

/// Run the polling loop until `shutdown` flips to `true` or closes.
///
/// Source errors are logged and the tick is skipped; the loop itself only
/// stops on shutdown.
pub async fn run_polling(
    pipeline: &mut Pipeline,
    source: &dyn PollingSource,
    settings: PollSettings,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(
        source = source.source_name(),
        interval_secs = settings.interval.as_secs(),
        page_size = settings.page_size,
        cursor = %pipeline.cursor(),
        "Polling started"
    );

    let mut interval = tokio::time::interval(settings.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut stall = StallTracker::default();

    loop {
        tokio::select! {
            result = shutdown.changed() => {
                if result.is_err() || *shutdown.borrow() {
                    info!("Polling stopped");
                    break;
                }
            }
            _ = interval.tick() => {
                match catch_up(pipeline, source, &settings).await {
                    Ok(report) => {
                        if report.pages > 1 {
                            debug!(pages = report.pages, delivered = report.delivered, "Caught up");
                        }
                        if let Some(ticks) = stall.observe(&report, pipeline.cursor()) {
                            warn!(
                                ticks,
                                cursor = %pipeline.cursor(),
                                failed = report.failed,
                                "Deliveries keep failing at the same watermark, relay is stalled"
                            );
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, source = source.source_name(), "Poll failed, skipping cycle");
                    }
                }
            }
        }
    }
}
