//! End-to-end tests of the fan-out search.
//!
//! Sources are served by a local wiremock server or by in-process fetchers,
//! so no test here touches the public network.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fanout_image_search::{
    AdapterConfig, HttpFetcher, PageFetcher, Result, Search, SearchConfig, SearchError,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn image_page(source: &str, count: usize) -> String {
    let mut html = String::from("<html><body>");
    for i in 0..count {
        html.push_str(&format!(
            r#"<img class="photo" src="https://cdn.{source}.test/photo/{i}.jpg">"#
        ));
    }
    html.push_str("</body></html>");
    html
}

fn adapter_for(server: &MockServer, source: &str) -> AdapterConfig {
    AdapterConfig::new(
        source,
        format!("{}/{source}/{{query}}", server.uri()),
        r#" src=['"](https://cdn\.[a-z]+\.test/photo/.*?)/?['"]"#,
    )
}

async fn mount_page(server: &MockServer, source: &str, count: usize) {
    Mock::given(method("GET"))
        .and(path(format!("/{source}/cats")))
        .respond_with(ResponseTemplate::new(200).set_body_string(image_page(source, count)))
        .mount(server)
        .await;
}

fn http_search(server: &MockServer, sources: &[&str]) -> anyhow::Result<Search> {
    let config = SearchConfig::default()
        .with_adapters(sources.iter().map(|s| adapter_for(server, s)).collect());
    Ok(Search::from_config(config, Arc::new(HttpFetcher::new()?))?)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn three_sources_all_succeed() -> anyhow::Result<()> {
    init_tracing();
    let server = MockServer::start().await;
    for source in ["alpha", "beta", "gamma"] {
        mount_page(&server, source, 5).await;
    }
    let search = http_search(&server, &["alpha", "beta", "gamma"])?;

    let outcome = search.search("cats", Duration::from_secs(2)).await;

    assert!(outcome.error.is_none(), "unexpected error: {:?}", outcome.error);
    assert_eq!(outcome.results.len(), 15);
    assert_eq!(outcome.stats.len(), 3);
    for source in ["alpha", "beta", "gamma"] {
        assert_eq!(outcome.stats.get(source), 5);
    }
    assert_eq!(outcome.stats.total(), outcome.results.len());

    let unique: HashSet<_> = outcome.results.iter().map(|r| &r.location).collect();
    assert_eq!(unique.len(), 15);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn third_source_fails_after_others_complete() -> anyhow::Result<()> {
    init_tracing();
    let server = MockServer::start().await;
    mount_page(&server, "alpha", 5).await;
    mount_page(&server, "beta", 5).await;
    Mock::given(method("GET"))
        .and(path("/gamma/cats"))
        .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_millis(400)))
        .mount(&server)
        .await;
    let search = http_search(&server, &["alpha", "beta", "gamma"])?;

    let outcome = search.search("cats", Duration::from_secs(2)).await;

    match &outcome.error {
        Some(SearchError::Transport { adapter, cause, .. }) => {
            assert_eq!(adapter, "gamma");
            assert!(matches!(**cause, SearchError::Status { status: 500, .. }));
        }
        other => panic!("expected transport error from gamma, got {other:?}"),
    }
    assert!(outcome.results.len() <= 10);
    assert!(outcome.results.iter().all(|r| r.source != "gamma"));
    assert_eq!(outcome.stats.get("gamma"), 0);
    assert_eq!(outcome.stats.total(), outcome.results.len());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_result_is_counted_for_its_source() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_page(&server, "alpha", 3).await;
    mount_page(&server, "beta", 7).await;
    let search = http_search(&server, &["alpha", "beta"])?;

    let outcome = search.search("cats", Duration::from_secs(2)).await;

    assert!(outcome.error.is_none());
    for result in &outcome.results {
        assert!(outcome.stats.get(&result.source) >= 1);
    }
    assert_eq!(outcome.stats.get("alpha"), 3);
    assert_eq!(outcome.stats.get("beta"), 7);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn duplicate_locations_in_one_page_count_once() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let page = format!("{}{}", image_page("alpha", 4), image_page("alpha", 4));
    Mock::given(method("GET"))
        .and(path("/alpha/cats"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(&server)
        .await;
    let search = http_search(&server, &["alpha"])?;

    let outcome = search.search("cats", Duration::from_secs(2)).await;

    assert!(outcome.error.is_none());
    assert_eq!(outcome.results.len(), 4);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn zero_timeout_reports_timeout_with_results_present() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_page(&server, "alpha", 5).await;
    let search = http_search(&server, &["alpha"])?;

    let outcome = search.search("cats", Duration::ZERO).await;

    assert!(matches!(outcome.error, Some(SearchError::Timeout(_))));
    assert!(outcome.results.len() <= 5);
    assert_eq!(outcome.stats.total(), outcome.results.len());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_searches_do_not_share_results() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    for (query, count) in [("cats", 2), ("dogs", 6)] {
        Mock::given(method("GET"))
            .and(path(format!("/alpha/{query}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(image_page("alpha", count)))
            .mount(&server)
            .await;
    }
    let search = http_search(&server, &["alpha"])?;

    let (cats, dogs) = futures::join!(
        search.search("cats", Duration::from_secs(2)),
        search.search("dogs", Duration::from_secs(2)),
    );

    assert!(cats.error.is_none());
    assert!(dogs.error.is_none());
    assert_eq!(cats.stats.get("alpha"), 2);
    assert_eq!(dogs.stats.get("alpha"), 6);
    Ok(())
}

/// Counts fetches in flight; a fetch that is dropped mid-way still leaves.
struct SlowFetcher {
    in_flight: Arc<AtomicUsize>,
    completed: Arc<AtomicBool>,
    delay: Duration,
}

struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PageFetcher for SlowFetcher {
    async fn fetch(&self, _url: &str) -> Result<String> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlight(Arc::clone(&self.in_flight));
        tokio::time::sleep(self.delay).await;
        self.completed.store(true, Ordering::SeqCst);
        Ok(image_page("slow", 3))
    }
}

fn slow_search(delay: Duration) -> (Search, Arc<AtomicUsize>, Arc<AtomicBool>) {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(AtomicBool::new(false));
    let fetcher = SlowFetcher {
        in_flight: Arc::clone(&in_flight),
        completed: Arc::clone(&completed),
        delay,
    };
    let mut search = Search::new(Arc::new(fetcher));
    for config in fanout_image_search::adapters::builtin_configs() {
        search
            .add_adapter(fanout_image_search::RegexAdapter::new(config).unwrap())
            .unwrap();
    }
    (search, in_flight, completed)
}

#[tokio::test(start_paused = true)]
async fn timeout_cancels_pending_fetches() {
    let (search, in_flight, completed) = slow_search(Duration::from_secs(30));

    let outcome = search.search("cats", Duration::from_secs(1)).await;

    assert!(matches!(outcome.error, Some(SearchError::Timeout(_))));
    assert!(outcome.results.is_empty());
    assert_eq!(in_flight.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(!completed.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn dropping_the_search_cancels_workers() {
    let (search, in_flight, completed) = slow_search(Duration::from_secs(30));

    let dropped = tokio::time::timeout(
        Duration::from_millis(100),
        search.search("cats", Duration::from_secs(60)),
    )
    .await;
    assert!(dropped.is_err());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    assert!(!completed.load(Ordering::SeqCst));
}
