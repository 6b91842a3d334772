//! Search orchestration.
//!
//! One worker task per adapter fetches, parses and streams its results onto
//! a shared channel. The caller's task runs the control loop, which races
//! the stream against the first hard error, the deadline and the
//! all-workers-finished signal. Whatever arrived before the terminal event
//! is returned, and every worker is cancelled before `search` returns.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{Id, JoinHandle, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::adapters;
use crate::fetcher::PageFetcher;
use crate::fetcher_http::HttpFetcher;
use crate::{
    AggregationOutcome, RegexAdapter, Result, SearchConfig, SearchError, SearchResult,
    SourceAdapter,
};

/// Meta search engine that fans a query out to every configured source.
pub struct Search {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    fetcher: Arc<dyn PageFetcher>,
    pacing_delay: Duration,
    shutdown_grace: Duration,
    channel_capacity: usize,
}

impl Search {
    /// Creates a search instance with no adapters.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        let config = SearchConfig::default();
        Self {
            adapters: Vec::new(),
            fetcher,
            pacing_delay: config.pacing_delay(),
            shutdown_grace: config.shutdown_grace(),
            channel_capacity: config.channel_capacity,
        }
    }

    /// Creates a search instance querying the built-in image sources over HTTP.
    pub fn with_builtin_adapters() -> Result<Self> {
        let mut search = Self::new(Arc::new(HttpFetcher::new()?));
        for adapter in adapters::builtin()? {
            search.add_adapter(adapter)?;
        }
        Ok(search)
    }

    /// Builds a search instance from `config`.
    ///
    /// Every adapter config is compiled up front; an invalid one fails
    /// construction instead of a later search.
    pub fn from_config(config: SearchConfig, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        config.validate()?;
        let mut search = Self {
            adapters: Vec::with_capacity(config.adapters.len()),
            fetcher,
            pacing_delay: config.pacing_delay(),
            shutdown_grace: config.shutdown_grace(),
            channel_capacity: config.channel_capacity,
        };
        for adapter_config in config.adapters {
            search.add_adapter(RegexAdapter::new(adapter_config)?)?;
        }
        Ok(search)
    }

    /// Builds a search instance from `config` using an [`HttpFetcher`].
    pub fn from_config_http(config: SearchConfig) -> Result<Self> {
        let fetcher = match &config.user_agent {
            Some(user_agent) => HttpFetcher::with_user_agent(user_agent)?,
            None => HttpFetcher::new()?,
        };
        Self::from_config(config, Arc::new(fetcher))
    }

    /// Adds a source adapter.
    ///
    /// Names key the per-source stats, so a name already in use is rejected.
    pub fn add_adapter<A: SourceAdapter + 'static>(&mut self, adapter: A) -> Result<()> {
        if self.adapters.iter().any(|a| a.name() == adapter.name()) {
            return Err(SearchError::InvalidAdapter {
                name: adapter.name().to_string(),
                reason: "duplicate adapter name".into(),
            });
        }
        self.adapters.push(Arc::new(adapter));
        Ok(())
    }

    /// Sets the pause between two results of the same source.
    pub fn set_pacing_delay(&mut self, delay: Duration) {
        self.pacing_delay = delay;
    }

    /// Sets how long cancelled workers get to stop before being aborted.
    pub fn set_shutdown_grace(&mut self, grace: Duration) {
        self.shutdown_grace = grace;
    }

    /// Returns the number of configured adapters.
    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    /// Returns the adapter names in fan-out order.
    pub fn adapter_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// Queries every adapter concurrently, for at most `timeout`.
    ///
    /// The call ends on the first of:
    /// - a source failing to fetch: `error` is [`SearchError::Transport`]
    /// - a worker panicking: `error` is [`SearchError::WorkerPanicked`]
    /// - the deadline: `error` is [`SearchError::Timeout`]
    /// - every source finishing: `error` is `None`
    ///
    /// If a failure and the deadline are ready together, the failure is
    /// reported. Results collected up to the terminal event are always
    /// returned, in arrival order.
    pub async fn search(&self, query: &str, timeout: Duration) -> AggregationOutcome {
        if self.adapters.is_empty() {
            return AggregationOutcome::failed(SearchError::NoAdapters);
        }
        if query.trim().is_empty() {
            return AggregationOutcome::failed(SearchError::InvalidQuery(
                "Query cannot be empty".into(),
            ));
        }

        let start = Instant::now();
        debug!(query, adapters = self.adapters.len(), "fanning out search");

        let cancel = CancellationToken::new();
        // Cancels the workers if this future is dropped before returning.
        let _cancel_on_drop = cancel.clone().drop_guard();

        let (result_tx, result_rx) = mpsc::channel(self.channel_capacity.max(1));
        let (error_tx, error_rx) = mpsc::channel(self.adapters.len());
        let (done_tx, done_rx) = oneshot::channel();

        let query: Arc<str> = Arc::from(query);
        let mut workers = JoinSet::new();
        let mut names = HashMap::with_capacity(self.adapters.len());
        for adapter in &self.adapters {
            let handle = workers.spawn(run_worker(Worker {
                adapter: Arc::clone(adapter),
                fetcher: Arc::clone(&self.fetcher),
                query: Arc::clone(&query),
                pacing_delay: self.pacing_delay,
                results: result_tx.clone(),
                errors: error_tx.clone(),
                cancel: cancel.child_token(),
            }));
            names.insert(handle.id(), adapter.name().to_string());
        }
        drop(result_tx);

        let mut watcher = tokio::spawn(watch_workers(workers, names, error_tx, done_tx));

        let mut outcome = collect(result_rx, error_rx, done_rx, timeout).await;

        cancel.cancel();
        shutdown_workers(&mut watcher, self.shutdown_grace).await;

        outcome.duration_ms = start.elapsed().as_millis() as u64;
        match &outcome.error {
            None => debug!(
                results = outcome.results.len(),
                duration_ms = outcome.duration_ms,
                "search complete"
            ),
            Some(err) => warn!(
                results = outcome.results.len(),
                duration_ms = outcome.duration_ms,
                "search aborted: {}",
                err
            ),
        }
        outcome
    }
}

/// Everything one worker task owns.
struct Worker {
    adapter: Arc<dyn SourceAdapter>,
    fetcher: Arc<dyn PageFetcher>,
    query: Arc<str>,
    pacing_delay: Duration,
    results: mpsc::Sender<SearchResult>,
    errors: mpsc::Sender<SearchError>,
    cancel: CancellationToken,
}

async fn run_worker(worker: Worker) {
    let name = worker.adapter.name();
    if worker.cancel.is_cancelled() {
        return;
    }

    let url = worker.adapter.build_query_url(&worker.query);
    let fetched = tokio::select! {
        biased;
        _ = worker.cancel.cancelled() => {
            debug!(adapter = name, "cancelled during fetch");
            return;
        }
        fetched = worker.fetcher.fetch(&url) => fetched,
    };

    let body = match fetched {
        Ok(body) => body,
        Err(cause) => {
            warn!(adapter = name, url = %url, "fetch failed: {}", cause);
            // Capacity equals the worker count, so this never waits.
            let _ = worker
                .errors
                .send(SearchError::transport(name, url, cause))
                .await;
            return;
        }
    };

    let items = worker.adapter.parse(&body);
    debug!(adapter = name, count = items.len(), "parsed results");

    let mut emitted = 0usize;
    for item in items {
        if emitted > 0 && !worker.pacing_delay.is_zero() {
            tokio::select! {
                biased;
                _ = worker.cancel.cancelled() => break,
                _ = tokio::time::sleep(worker.pacing_delay) => {}
            }
        }
        if worker.cancel.is_cancelled() {
            break;
        }
        let sent = tokio::select! {
            biased;
            _ = worker.cancel.cancelled() => break,
            sent = worker.results.send(item) => sent,
        };
        if sent.is_err() {
            break;
        }
        emitted += 1;
    }
    debug!(adapter = name, emitted, "worker finished");
}

/// Waits for every worker, then signals completion.
///
/// A panicked worker is reported as a hard error of its adapter before
/// completion is signalled.
async fn watch_workers(
    mut workers: JoinSet<()>,
    names: HashMap<Id, String>,
    errors: mpsc::Sender<SearchError>,
    done: oneshot::Sender<()>,
) {
    while let Some(joined) = workers.join_next_with_id().await {
        let Err(err) = joined else {
            continue;
        };
        if !err.is_panic() {
            continue;
        }
        let adapter = names
            .get(&err.id())
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());
        warn!(adapter = %adapter, "search worker panicked: {}", err);
        // A panicked worker never sent its own error, so a slot is free.
        let _ = errors.try_send(SearchError::WorkerPanicked {
            adapter,
            message: err.to_string(),
        });
    }
    drop(errors);
    let _ = done.send(());
}

/// Stand-in deadline for timeouts too large to represent.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// The control loop.
///
/// Precedence among ready events: error, deadline, result, completion.
async fn collect(
    mut results: mpsc::Receiver<SearchResult>,
    mut errors: mpsc::Receiver<SearchError>,
    mut done: oneshot::Receiver<()>,
    timeout: Duration,
) -> AggregationOutcome {
    let mut outcome = AggregationOutcome::default();
    let now = Instant::now();
    let deadline = now
        .checked_add(timeout)
        .unwrap_or_else(|| now + FAR_FUTURE);
    let expired = tokio::time::sleep_until(deadline);
    tokio::pin!(expired);

    loop {
        // A timer only fires once the driver ticks, so events that are
        // already due are checked here to keep the precedence exact.
        if let Some(err) = due_event(&mut errors, deadline, timeout) {
            outcome.error = Some(err);
            return outcome;
        }

        tokio::select! {
            biased;
            Some(err) = errors.recv() => {
                outcome.error = Some(err);
                return outcome;
            }
            _ = &mut expired => {
                outcome.error = Some(errors.try_recv().unwrap_or(SearchError::Timeout(timeout)));
                return outcome;
            }
            Some(result) = results.recv() => {
                outcome.stats.increment(&result.source);
                outcome.results.push(result);
            }
            _ = &mut done => {
                return outcome;
            }
        }
    }
}

/// Returns a terminal event that is already due, errors first.
///
/// The clock is read before the error queue, so an error queued by the
/// time the deadline is seen to pass still wins.
fn due_event(
    errors: &mut mpsc::Receiver<SearchError>,
    deadline: Instant,
    timeout: Duration,
) -> Option<SearchError> {
    let expired = Instant::now() >= deadline;
    match errors.try_recv() {
        Ok(err) => Some(err),
        Err(_) if expired => Some(SearchError::Timeout(timeout)),
        Err(_) => None,
    }
}

/// Gives cancelled workers `grace` to wind down, then aborts the rest.
async fn shutdown_workers(watcher: &mut JoinHandle<()>, grace: Duration) {
    if tokio::time::timeout(grace, &mut *watcher).await.is_err() {
        warn!(?grace, "workers still running after grace period, aborting");
        // Dropping the watcher's JoinSet aborts every remaining worker.
        watcher.abort();
    }
}

impl std::fmt::Debug for Search {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Search")
            .field("adapters", &self.adapter_names())
            .field("pacing_delay", &self.pacing_delay)
            .field("shutdown_grace", &self.shutdown_grace)
            .field("channel_capacity", &self.channel_capacity)
            .finish()
    }
}
