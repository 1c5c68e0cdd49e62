//! Change detector
//!
//! [`PollListener`] turns a [`Poll`] operation and a trigger source into a
//! stream of change notifications.
//!
//! ## Event Flow
//!
//! 1. Resolve once immediately, independent of the trigger source
//! 2. Emit that first successful result unconditionally
//! 3. On every tick, resolve again and emit only if the result differs from
//!    the last emitted one
//!
//! Resolve failures are logged and skipped. They never update the baseline,
//! so a later success equal to the pre-failure value is not re-emitted.
//!
//! ## Backpressure
//!
//! Sends on `out` wait for capacity. A slow subscriber therefore delays the
//! next resolve cycle; ticks that fire meanwhile are delayed, not queued.

use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::traits::poll::{ListerPoll, ResolverPoll};
use crate::traits::{DomainLister, IpResolver, Listener, Logger, ObservableSet, Poll};

/// Trigger source: yields one item whenever a re-check should occur
pub type Ticks = Pin<Box<dyn Stream<Item = ()> + Send>>;

/// Longest period an interval trigger is run with
const MAX_TICK_PERIOD: Duration = Duration::from_secs(365 * 86_400);

/// Build a wall-clock trigger source
///
/// The first tick fires one full `period` after creation. Ticks missed while
/// the detector is busy are delayed rather than bursted. The period is
/// clamped to between one millisecond and one year.
pub fn interval_ticks(period: Duration) -> Ticks {
    let period = period.clamp(Duration::from_millis(1), MAX_TICK_PERIOD);
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Box::pin(IntervalStream::new(interval).map(|_| ()))
}

/// Build an event-driven trigger source
///
/// Every item of `events` (container lifecycle events, orchestrator watch
/// notifications, ...) becomes one tick. The trigger source ends with the
/// event stream.
pub fn event_ticks<S>(events: S) -> Ticks
where
    S: Stream + Send + 'static,
{
    Box::pin(events.map(|_| ()))
}

/// Proxy `ticker` and add one tick per item of `events`
///
/// Keeps a periodic re-check as a safety net for missed events. Ends once
/// both the ticker and the event stream have ended.
pub fn with_events<S>(ticker: Ticks, events: S) -> Ticks
where
    S: Stream + Send + 'static,
{
    Box::pin(ticker.merge(event_ticks(events)))
}

/// Poll-diff-emit loop over a single data source
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use ddns_sync_core::listener::{interval_ticks, PollListener};
/// use ddns_sync_core::source::StaticResolver;
/// use ddns_sync_core::traits::{Listener, TracingLogger};
/// use ddns_sync_core::CancellationToken;
///
/// # async fn demo() {
/// let mut listener = PollListener::from_resolver(
///     interval_ticks(Duration::from_secs(5)),
///     Arc::new(TracingLogger::new("ips")),
///     StaticResolver::new(vec!["203.0.113.7".to_string()]),
/// );
///
/// let (tx, mut rx) = tokio::sync::mpsc::channel(1);
/// tokio::spawn(async move { listener.listen(tx, CancellationToken::new()).await });
/// assert_eq!(rx.recv().await, Some(vec!["203.0.113.7".to_string()]));
/// # }
/// ```
pub struct PollListener {
    /// Names the source in log lines
    label: String,

    /// Trigger source
    ticker: Ticks,

    /// Sink for resolve failures
    logger: Arc<dyn Logger>,

    /// The resolve operation
    poll: Box<dyn Poll>,
}

impl PollListener {
    /// Create a listener over an arbitrary [`Poll`] operation
    pub fn new(
        label: impl Into<String>,
        ticker: Ticks,
        logger: Arc<dyn Logger>,
        poll: Box<dyn Poll>,
    ) -> Self {
        Self {
            label: label.into(),
            ticker,
            logger,
            poll,
        }
    }

    /// Create a listener producing IP address sets
    pub fn from_resolver<R>(ticker: Ticks, logger: Arc<dyn Logger>, resolver: R) -> Self
    where
        R: IpResolver + 'static,
    {
        Self::new("ips", ticker, logger, Box::new(ResolverPoll(resolver)))
    }

    /// Create a listener producing domain name sets
    pub fn from_lister<L>(ticker: Ticks, logger: Arc<dyn Logger>, lister: L) -> Self
    where
        L: DomainLister + 'static,
    {
        Self::new("domains", ticker, logger, Box::new(ListerPoll(lister)))
    }

    /// Replace the label used in log lines
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// The label used in log lines
    pub fn label(&self) -> &str {
        &self.label
    }
}

#[async_trait]
impl Listener for PollListener {
    async fn listen(&mut self, out: mpsc::Sender<ObservableSet>, cancel: CancellationToken) {
        let Self {
            label,
            ticker,
            logger,
            poll,
        } = self;
        let mut last_emitted: Option<ObservableSet> = None;

        // Baseline, independent of the trigger source
        let step = check(
            label.as_str(),
            &**poll,
            &**logger,
            &mut last_emitted,
            &out,
            &cancel,
        );
        if step.await.is_break() {
            return;
        }

        loop {
            let tick = tokio::select! {
                _ = cancel.cancelled() => break,
                tick = ticker.next() => tick,
            };

            if tick.is_none() {
                debug!(source = %label, "trigger source exhausted, stopping");
                break;
            }

            let step = check(
                label.as_str(),
                &**poll,
                &**logger,
                &mut last_emitted,
                &out,
                &cancel,
            );
            if step.await.is_break() {
                break;
            }
        }
    }
}

/// Resolve once and emit if the result changed
async fn check(
    label: &str,
    poll: &dyn Poll,
    logger: &dyn Logger,
    last_emitted: &mut Option<ObservableSet>,
    out: &mpsc::Sender<ObservableSet>,
    cancel: &CancellationToken,
) -> ControlFlow<()> {
    let polled = tokio::select! {
        _ = cancel.cancelled() => return ControlFlow::Break(()),
        polled = poll.poll() => polled,
    };

    let current = match polled {
        Ok(current) => current,
        Err(e) => {
            logger.log(format_args!("error: failed to resolve {}: {}", label, e));
            return ControlFlow::Continue(());
        }
    };

    if !has_changed(last_emitted.as_deref(), &current) {
        debug!(source = %label, "no change");
        return ControlFlow::Continue(());
    }

    debug!(source = %label, "change detected: [{}]", current.join(","));

    tokio::select! {
        _ = cancel.cancelled() => ControlFlow::Break(()),
        sent = out.send(current.clone()) => match sent {
            Ok(()) => {
                *last_emitted = Some(current);
                ControlFlow::Continue(())
            }
            Err(_) => {
                debug!(source = %label, "subscriber dropped, stopping");
                ControlFlow::Break(())
            }
        },
    }
}

/// Positional comparison against the last emitted set
fn has_changed(previous: Option<&[String]>, current: &[String]) -> bool {
    match previous {
        None => true,
        Some(previous) => {
            previous.len() != current.len()
                || previous.iter().zip(current).any(|(old, new)| old != new)
        }
    }
}
