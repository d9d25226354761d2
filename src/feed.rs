use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::contest::{Contest, ContestId, SiteId};
use crate::credential::{ApiCredential, Credential};
use crate::http::{HttpFetch, HttpTransport, TransportError};

/// Timestamp layout clist.by expects for `start__gt` / `start__lt`.
pub const QUERY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("no usable contest feed credential configured")]
    MissingCredential,
    #[error("contest feed transport failed: {0}")]
    Transport(#[from] TransportError),
    #[error("contest feed response was malformed: {0}")]
    Malformed(String),
}

impl FeedError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingCredential)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub window: TimeDelta,
    pub sites: BTreeSet<SiteId>,
    pub now: DateTime<Utc>,
}

impl FeedQuery {
    /// Saturates at the latest representable instant.
    pub fn window_end(&self) -> DateTime<Utc> {
        self.now
            .checked_add_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn contains(&self, start: DateTime<Utc>) -> bool {
        start > self.now && start <= self.window_end()
    }

    fn sites_param(&self) -> String {
        self.sites
            .iter()
            .map(SiteId::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

pub struct ContestFeedClient<T = HttpTransport> {
    endpoint: Url,
    credential: Credential,
    transport: T,
}

impl<T: HttpFetch> ContestFeedClient<T> {
    pub fn with_transport(endpoint: Url, credential: Credential, transport: T) -> Self {
        Self {
            endpoint,
            credential,
            transport,
        }
    }

    pub fn fetch_upcoming(
        &self,
        window: TimeDelta,
        sites: &BTreeSet<SiteId>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Contest>, FeedError> {
        let query = FeedQuery {
            window,
            sites: sites.clone(),
            now,
        };
        self.fetch(&query)
    }

    pub fn fetch(&self, query: &FeedQuery) -> Result<Vec<Contest>, FeedError> {
        let Some(credential) = self.credential.usable() else {
            return Err(FeedError::MissingCredential);
        };
        let url = build_request_url(&self.endpoint, credential, query);
        debug!(
            sites = %query.sites_param(),
            window_end = %query.window_end(),
            "requesting contest listing"
        );
        let body = self.transport.get_text(&url)?;
        parse_contest_listing(&body, query)
    }

    /// Folded form used by the UI: every failure becomes an empty listing.
    pub fn upcoming_or_empty(&self, query: &FeedQuery) -> Vec<Contest> {
        match self.fetch(query) {
            Ok(contests) => {
                info!(count = contests.len(), "fetched contest listing");
                contests
            }
            Err(err) if err.is_configuration() => {
                warn!(error = %err, "skipping contest fetch");
                Vec::new()
            }
            Err(err) => {
                warn!(error = %err, "contest fetch failed");
                Vec::new()
            }
        }
    }
}

pub fn build_request_url(endpoint: &Url, credential: &ApiCredential, query: &FeedQuery) -> Url {
    let mut url = endpoint.clone();
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in credential.query_pairs() {
            pairs.append_pair(&key, &value);
        }
        pairs
            .append_pair("resource_id__in", &query.sites_param())
            .append_pair(
                "start__gt",
                &query.now.format(QUERY_TIME_FORMAT).to_string(),
            )
            .append_pair(
                "start__lt",
                &query.window_end().format(QUERY_TIME_FORMAT).to_string(),
            )
            .append_pair("order_by", "start");
    }
    url
}

#[derive(Debug, Deserialize)]
struct ContestListing {
    objects: Vec<ContestRecord>,
}

#[derive(Debug, Deserialize)]
struct ContestRecord {
    id: RecordId,
    event: String,
    resource: String,
    start: String,
    href: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordId {
    Number(u64),
    Text(String),
}

impl RecordId {
    fn into_contest_id(self) -> ContestId {
        match self {
            Self::Number(value) => ContestId::new(value.to_string()),
            Self::Text(value) => ContestId::new(value),
        }
    }
}

/// Parses a listing body, keeping service order and ids. Records starting
/// outside the query window are dropped.
pub fn parse_contest_listing(body: &str, query: &FeedQuery) -> Result<Vec<Contest>, FeedError> {
    let listing: ContestListing =
        serde_json::from_str(body).map_err(|err| FeedError::Malformed(err.to_string()))?;
    let mut contests = Vec::with_capacity(listing.objects.len());
    for record in listing.objects {
        let start_time = parse_feed_timestamp(&record.start).ok_or_else(|| {
            FeedError::Malformed(format!("unparseable start time {:?}", record.start))
        })?;
        if !query.contains(start_time) {
            debug!(event = %record.event, start = %start_time, "dropping contest outside window");
            continue;
        }
        contests.push(Contest {
            id: record.id.into_contest_id(),
            event_name: record.event,
            site: record.resource,
            start_time,
            url: record.href,
        });
    }
    Ok(contests)
}

/// Accepts RFC 3339 with an offset, or a naive ISO-8601 timestamp taken as UTC.
pub fn parse_feed_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    value
        .parse::<NaiveDateTime>()
        .ok()
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Loaded {
        contests: Vec<Contest>,
        fetched_at: DateTime<Utc>,
    },
}

/// Runs one fetch at a time on a background thread; results are drained by
/// the UI loop.
pub struct FeedWorker {
    event_tx: Sender<FeedEvent>,
    event_rx: Receiver<FeedEvent>,
    in_flight: Arc<AtomicBool>,
}

impl FeedWorker {
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        Self {
            event_tx,
            event_rx,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns false without starting anything when a fetch is already running.
    pub fn request<T>(&self, client: Arc<ContestFeedClient<T>>, query: FeedQuery) -> bool
    where
        T: HttpFetch + Send + Sync + 'static,
    {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("contest fetch already in flight; request rejected");
            return false;
        }
        let tx = self.event_tx.clone();
        let guard = InFlightGuard(self.in_flight.clone());
        thread::spawn(move || {
            let contests =
                panic::catch_unwind(AssertUnwindSafe(|| client.upcoming_or_empty(&query)))
                    .unwrap_or_else(|_| {
                        warn!("contest fetch panicked; treating it as an empty listing");
                        Vec::new()
                    });
            drop(guard);
            let _ = tx.send(FeedEvent::Loaded {
                contests,
                fetched_at: query.now,
            });
        });
        true
    }

    pub fn drain_events_limited(&self, max_events: usize) -> Vec<FeedEvent> {
        let mut events = Vec::new();
        while events.len() < max_events {
            let Ok(event) = self.event_rx.try_recv() else {
                break;
            };
            events.push(event);
        }
        events
    }
}

/// Clears the in-flight flag however the fetch thread ends.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "../tests/unit/feed_tests.rs"]
mod tests;
