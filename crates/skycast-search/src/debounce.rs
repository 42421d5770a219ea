//! Debounced geocoding lookups.
//!
//! Every keystroke restarts a quiet-period timer; only the query that is still
//! current when the timer fires reaches the geocoder. Each dispatched lookup
//! carries a sequence number so the caller can discard responses that were
//! superseded while in flight.

use crate::geocode::Geocoder;
use crate::types::{City, GeocodeError};
use skycast_core::{NetworkError, SearchConfig};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(1500);
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle to a scheduled task. Cancelling is idempotent.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(CancellationToken);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// Run `task` after `delay` unless cancelled first.
///
/// Cancelling after the delay also aborts the task at its next await point.
pub fn schedule<F>(delay: Duration, task: F) -> CancelToken
where
    F: Future<Output = ()> + Send + 'static,
{
    let token = CancelToken::default();
    let cancelled = token.0.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = cancelled.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
        tokio::select! {
            _ = cancelled.cancelled() => {}
            _ = task => {}
        }
    });

    token
}

/// Result of a finished lookup
#[derive(Debug)]
pub struct LookupOutcome {
    pub seq: u64,
    pub query: String,
    pub result: Result<Vec<City>, GeocodeError>,
}

/// What a query change did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryChange {
    /// Blank text: results should be cleared, nothing is pending
    Cleared,
    /// Lookup scheduled under this sequence number
    Scheduled(u64),
}

pub struct Debouncer {
    geocoder: Arc<dyn Geocoder>,
    quiet_period: Duration,
    lookup_timeout: Duration,
    seq: u64,
    pending: Option<CancelToken>,
    outcomes: mpsc::UnboundedSender<LookupOutcome>,
}

impl Debouncer {
    /// Create a debouncer and the receiving end of its outcomes
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        quiet_period: Duration,
        lookup_timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<LookupOutcome>) {
        let (outcomes, rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            geocoder,
            quiet_period,
            lookup_timeout,
            seq: 0,
            pending: None,
            outcomes,
        };
        (debouncer, rx)
    }

    pub fn from_config(
        geocoder: Arc<dyn Geocoder>,
        config: &SearchConfig,
    ) -> (Self, mpsc::UnboundedReceiver<LookupOutcome>) {
        Self::new(
            geocoder,
            Duration::from_millis(config.debounce_ms),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Called on every keystroke
    pub fn on_query_change(&mut self, text: &str) -> QueryChange {
        self.cancel();

        let query = text.trim();
        if query.is_empty() {
            return QueryChange::Cleared;
        }

        let seq = self.seq;
        let query = query.to_string();
        let geocoder = self.geocoder.clone();
        let outcomes = self.outcomes.clone();
        let timeout = self.lookup_timeout;

        let token = schedule(self.quiet_period, async move {
            tracing::debug!(seq, query = %query, "Dispatching geocoding lookup");
            let result = match tokio::time::timeout(timeout, geocoder.search(&query)).await {
                Ok(result) => result,
                Err(_) => Err(GeocodeError::Network(NetworkError::Timeout)),
            };
            // Receiver gone means the overlay was dropped
            let _ = outcomes.send(LookupOutcome { seq, query, result });
        });

        self.pending = Some(token);
        QueryChange::Scheduled(seq)
    }

    /// Cancel any pending or in-flight lookup. Late responses become stale.
    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
        self.seq += 1;
    }

    /// True only for the most recently scheduled lookup
    pub fn is_current(&self, seq: u64) -> bool {
        self.pending.is_some() && seq == self.seq
    }

    pub fn has_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// Mark the current lookup as delivered
    pub fn complete(&mut self, seq: u64) {
        if self.is_current(seq) {
            self.pending = None;
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
