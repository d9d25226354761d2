use super::*;

use std::net::TcpListener;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

use chrono::TimeZone;

struct FakeTransport {
    calls: AtomicUsize,
    urls: Mutex<Vec<Url>>,
    response: Result<String, TransportError>,
}

impl FakeTransport {
    fn answering(body: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
            response: Ok(body.to_string()),
        }
    }

    fn failing(err: TransportError) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
            response: Err(err),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HttpFetch for FakeTransport {
    fn get_text(&self, url: &Url) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().expect("urls lock").push(url.clone());
        self.response.clone()
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 20, 12, 0, 0).unwrap()
}

fn sites() -> BTreeSet<SiteId> {
    [SiteId(1), SiteId(93)].into_iter().collect()
}

fn query() -> FeedQuery {
    FeedQuery {
        window: TimeDelta::days(2),
        sites: sites(),
        now: now(),
    }
}

fn endpoint() -> Url {
    Url::parse("https://clist.by/api/v4/contest/").expect("endpoint")
}

fn credential() -> Credential {
    Credential::from_value(Some("username=me&api_key=abc123"))
}

fn client(transport: FakeTransport) -> ContestFeedClient<FakeTransport> {
    ContestFeedClient::with_transport(endpoint(), credential(), transport)
}

const LISTING: &str = r#"{
  "meta": {"limit": 100},
  "objects": [
    {"id": 5301, "event": "Codeforces Round #900 (Div. 3)", "resource": "codeforces.com",
     "start": "2024-09-20T14:35:00", "href": "https://codeforces.com/contests/1875", "duration": 8100},
    {"id": 77, "event": "AtCoder Beginner Contest 372", "resource": "atcoder.jp",
     "start": "2024-09-21T12:00:00", "href": "https://atcoder.jp/contests/abc372"},
    {"id": 9, "event": "Educational Round", "resource": "codeforces.com",
     "start": "2024-09-20T13:00:00+00:00", "href": "https://codeforces.com/contests/1876"}
  ]
}"#;

#[test]
fn missing_credential_never_touches_the_network() {
    for credential in [Credential::Missing, Credential::Empty] {
        let client = ContestFeedClient::with_transport(
            endpoint(),
            credential,
            FakeTransport::answering(LISTING),
        );
        let result = client.fetch_upcoming(TimeDelta::days(2), &sites(), now());
        assert!(matches!(result, Err(FeedError::MissingCredential)));
        assert!(client.upcoming_or_empty(&query()).is_empty());
        assert_eq!(client.transport.call_count(), 0);
    }
}

#[test]
fn builds_query_with_window_sites_order_and_credential() {
    let client = client(FakeTransport::answering(r#"{"objects": []}"#));
    client
        .fetch_upcoming(TimeDelta::days(2), &sites(), now())
        .expect("fetch should succeed");

    assert_eq!(client.transport.call_count(), 1);
    let urls = client.transport.urls.lock().expect("urls lock");
    let url = &urls[0];
    assert_eq!(url.host_str(), Some("clist.by"));
    assert_eq!(url.path(), "/api/v4/contest/");
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(
        pairs,
        vec![
            ("username".to_string(), "me".to_string()),
            ("api_key".to_string(), "abc123".to_string()),
            ("resource_id__in".to_string(), "1,93".to_string()),
            ("start__gt".to_string(), "2024-09-20 12:00:00".to_string()),
            ("start__lt".to_string(), "2024-09-22 12:00:00".to_string()),
            ("order_by".to_string(), "start".to_string()),
        ]
    );
}

#[test]
fn passes_through_service_order_and_ids() {
    let client = client(FakeTransport::answering(LISTING));
    let contests = client
        .fetch_upcoming(TimeDelta::days(2), &sites(), now())
        .expect("fetch should succeed");

    let ids: Vec<&str> = contests.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["5301", "77", "9"]);
    assert_eq!(contests[0].event_name, "Codeforces Round #900 (Div. 3)");
    assert_eq!(contests[0].site, "codeforces.com");
    assert_eq!(contests[0].url, "https://codeforces.com/contests/1875");
    assert_eq!(
        contests[0].start_time,
        Utc.with_ymd_and_hms(2024, 9, 20, 14, 35, 0).unwrap()
    );
}

#[test]
fn every_returned_contest_lies_inside_the_window() {
    let body = r#"{"objects": [
        {"id": 1, "event": "past", "resource": "r", "start": "2024-09-20T11:00:00", "href": "h"},
        {"id": 2, "event": "exactly now", "resource": "r", "start": "2024-09-20T12:00:00", "href": "h"},
        {"id": 3, "event": "inside", "resource": "r", "start": "2024-09-20T12:00:01", "href": "h"},
        {"id": 4, "event": "window end", "resource": "r", "start": "2024-09-22T12:00:00", "href": "h"},
        {"id": 5, "event": "too late", "resource": "r", "start": "2024-09-22T12:00:01", "href": "h"}
    ]}"#;
    let client = client(FakeTransport::answering(body));
    let query = query();
    let contests = client.fetch(&query).expect("fetch should succeed");

    let ids: Vec<&str> = contests.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["3", "4"]);
    for contest in &contests {
        assert!(query.now < contest.start_time);
        assert!(contest.start_time <= query.now + query.window);
    }
}

#[test]
fn keeps_string_ids_verbatim() {
    let body = r#"{"objects": [
        {"id": "abc-1", "event": "e", "resource": "r", "start": "2024-09-20T15:00:00Z", "href": "h"}
    ]}"#;
    let contests = client(FakeTransport::answering(body))
        .fetch(&query())
        .expect("fetch should succeed");
    assert_eq!(contests[0].id, ContestId::new("abc-1"));
}

#[test]
fn malformed_bodies_are_feed_errors() {
    for body in [
        "not json",
        r#"{"meta": {}}"#,
        r#"{"objects": [{"id": 1, "event": "e"}]}"#,
        r#"{"objects": [{"id": 1, "event": "e", "resource": "r", "start": "tomorrow", "href": "h"}]}"#,
    ] {
        let client = client(FakeTransport::answering(body));
        assert!(
            matches!(client.fetch(&query()), Err(FeedError::Malformed(_))),
            "body: {body}"
        );
        assert!(client.upcoming_or_empty(&query()).is_empty());
    }
}

#[test]
fn http_status_failures_fold_into_empty_listing() {
    let client = client(FakeTransport::failing(TransportError::Status(401)));
    assert!(matches!(
        client.fetch(&query()),
        Err(FeedError::Transport(TransportError::Status(401)))
    ));
    assert!(client.upcoming_or_empty(&query()).is_empty());
}

#[test]
fn refused_connection_looks_like_an_empty_listing() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe listener");
        listener.local_addr().expect("local addr").port()
    };
    let endpoint = Url::parse(&format!("http://127.0.0.1:{port}/api/v4/contest/")).expect("url");
    let transport = HttpTransport::new(Duration::from_secs(2)).expect("transport");
    let refused = ContestFeedClient::with_transport(endpoint, credential(), transport);
    assert!(matches!(refused.fetch(&query()), Err(FeedError::Transport(_))));

    let empty = client(FakeTransport::answering(r#"{"objects": []}"#));
    assert_eq!(refused.upcoming_or_empty(&query()), empty.upcoming_or_empty(&query()));
}

#[test]
fn parses_naive_and_offset_timestamps_as_utc() {
    let expected = Utc.with_ymd_and_hms(2024, 9, 20, 14, 35, 0).unwrap();
    assert_eq!(parse_feed_timestamp("2024-09-20T14:35:00"), Some(expected));
    assert_eq!(parse_feed_timestamp("2024-09-20T14:35:00Z"), Some(expected));
    assert_eq!(parse_feed_timestamp("2024-09-20T17:35:00+03:00"), Some(expected));
    assert_eq!(parse_feed_timestamp("2024-09-20"), None);
}

fn wait_for_feed_events(worker: &FeedWorker) -> Vec<FeedEvent> {
    let mut events = Vec::new();
    for _ in 0..80 {
        events.extend(worker.drain_events_limited(16));
        if !events.is_empty() {
            break;
        }
        std::thread::sleep(Duration::from_millis(25));
    }
    events
}

#[test]
fn worker_reports_listing_and_rejects_overlapping_requests() {
    let worker = FeedWorker::new();
    let client = Arc::new(client(FakeTransport::answering(LISTING)));

    worker.in_flight.store(true, Ordering::SeqCst);
    assert!(!worker.request(client.clone(), query()));
    assert_eq!(client.transport.call_count(), 0);
    worker.in_flight.store(false, Ordering::SeqCst);

    assert!(worker.request(client.clone(), query()));
    let events = wait_for_feed_events(&worker);
    assert_eq!(events.len(), 1);
    let FeedEvent::Loaded {
        contests,
        fetched_at,
    } = &events[0];
    assert_eq!(contests.len(), 3);
    assert_eq!(*fetched_at, now());
    assert!(!worker.in_flight.load(Ordering::SeqCst));
    assert_eq!(client.transport.call_count(), 1);
}

struct PanickingTransport;

impl HttpFetch for PanickingTransport {
    fn get_text(&self, _url: &Url) -> Result<String, TransportError> {
        panic!("transport blew up");
    }
}

#[test]
fn panicking_fetch_reports_empty_listing_and_frees_the_worker() {
    let worker = FeedWorker::new();
    let client = Arc::new(ContestFeedClient::with_transport(
        endpoint(),
        credential(),
        PanickingTransport,
    ));

    assert!(worker.request(client.clone(), query()));
    let events = wait_for_feed_events(&worker);
    assert_eq!(events.len(), 1);
    let FeedEvent::Loaded { contests, .. } = &events[0];
    assert!(contests.is_empty());
    assert!(!worker.in_flight.load(Ordering::SeqCst));
    assert!(worker.request(client, query()));
}

#[test]
fn oversized_window_saturates_instead_of_overflowing() {
    let query = FeedQuery {
        window: TimeDelta::days(365 * 300_000),
        sites: sites(),
        now: now(),
    };
    assert_eq!(query.window_end(), DateTime::<Utc>::MAX_UTC);
    assert!(query.contains(now() + TimeDelta::hours(1)));
    assert!(!query.contains(now()));
}
