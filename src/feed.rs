//! Marker feed.
//! Polls the marker endpoint on a fixed interval and keeps one subscriber
//! supplied with `{markers, loading, error}`.
//!
//! - Every tick issues a fresh fetch; fetches may overlap when the endpoint is
//!   slower than the interval.
//! - Each fetch carries a sequence number. A completion older than the newest
//!   applied one is dropped, so a slow response never overwrites newer data.
//! - A failed cycle keeps the previous markers and only sets `error`.
//! - Stopping the handle clears the active flag under the state lock and aborts
//!   the poll task: nothing is applied or reported afterwards.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, error, info, warn};
use reqwest::Client;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

use crate::error::FeedError;
use crate::marker::{MarkerRecord, parse_markers};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

// *************** State ***************

/// Snapshot handed to the subscriber.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeedState {
    pub markers: Vec<MarkerRecord>,
    pub loading: bool,
    pub error: Option<String>,
    /// Poll cycles applied so far (successful or failed).
    pub completed_cycles: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

impl FeedState {
    pub fn status(&self) -> FeedStatus {
        if self.loading {
            FeedStatus::Loading
        } else if self.error.is_some() {
            FeedStatus::Failed
        } else if self.completed_cycles > 0 {
            FeedStatus::Ready
        } else {
            FeedStatus::Idle
        }
    }
}

// *************** Sources ***************

/// Where marker snapshots come from.
pub trait MarkerSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<Vec<MarkerRecord>, FeedError>> + Send;
}

/// Fetches the marker list over HTTP.
#[derive(Clone, Debug)]
pub struct HttpMarkerSource {
    client: Client,
    url: String,
}

impl HttpMarkerSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Builds a dedicated client; `timeout` of `None` leaves requests unbounded.
    pub fn with_timeout(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, FeedError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::new(builder.build()?, url))
    }
}

impl MarkerSource for HttpMarkerSource {
    async fn fetch(&self) -> Result<Vec<MarkerRecord>, FeedError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status { status });
        }

        let body = response.bytes().await?;
        Ok(parse_markers(&body)?)
    }
}

// *************** Subscription ***************

type FeedCallback = Box<dyn Fn(&FeedState) + Send + Sync>;

struct Shared {
    state: FeedState,
    active: bool,
    in_flight: usize,
    latest_applied: u64,
}

struct Subscription {
    shared: Mutex<Shared>,
    /// Serializes callback delivery; held while the callback runs, never
    /// together with a long-lived `shared` guard.
    delivery: Mutex<()>,
    callback: FeedCallback,
}

impl Subscription {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `change` if still active, then hands a snapshot to the callback
    /// with only the delivery gate held.
    fn update(&self, change: impl FnOnce(&mut Shared)) -> bool {
        let _delivery = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = {
            let mut shared = self.lock();
            if !shared.active {
                return false;
            }
            change(&mut shared);
            shared.state.clone()
        };
        (self.callback)(&snapshot);
        true
    }

    /// Marks a fetch as started. Returns `false` once the subscription is stopped.
    fn begin(&self) -> bool {
        self.update(|shared| {
            shared.in_flight += 1;
            shared.state.loading = true;
        })
    }

    fn finish(&self, seq: u64, result: Result<Vec<MarkerRecord>, FeedError>) {
        let applied = self.update(|shared| {
            shared.in_flight = shared.in_flight.saturating_sub(1);

            if seq < shared.latest_applied {
                debug!("Dropping fetch #{} (already applied #{})", seq, shared.latest_applied);
            } else {
                shared.latest_applied = seq;
                shared.state.completed_cycles += 1;
                match result {
                    Ok(markers) => {
                        debug!("Fetch #{} returned {} markers", seq, markers.len());
                        shared.state.markers = markers;
                        shared.state.error = None;
                    }
                    Err(err) => {
                        warn!("Error fetching marker positions: {}", err);
                        shared.state.error = Some(err.to_string());
                    }
                }
            }

            shared.state.loading = shared.in_flight > 0;
        });
        if !applied {
            debug!("Feed stopped; discarding result of fetch #{}", seq);
        }
    }

    /// A fetch task died without a result.
    fn abandon(&self) {
        self.update(|shared| {
            shared.in_flight = shared.in_flight.saturating_sub(1);
            shared.state.loading = shared.in_flight > 0;
        });
    }

    /// Waits out any callback in progress, so nothing is delivered after this returns.
    fn deactivate(&self) -> bool {
        let _delivery = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut self.lock().active, false)
    }
}

async fn poll_loop<S: MarkerSource>(source: Arc<S>, subscription: Arc<Subscription>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut fetches = JoinSet::new();
    let mut seq = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !subscription.begin() {
                    break;
                }
                seq += 1;
                let source = Arc::clone(&source);
                let this_seq = seq;
                fetches.spawn(async move { (this_seq, source.fetch().await) });
            }
            Some(joined) = fetches.join_next() => match joined {
                Ok((done, result)) => subscription.finish(done, result),
                Err(err) => {
                    if !err.is_cancelled() {
                        error!("Marker fetch task failed: {}", err);
                    }
                    subscription.abandon();
                }
            },
        }
    }
}

/// Polls a [`MarkerSource`] for any number of independent subscribers.
pub struct MarkerFeed<S> {
    source: Arc<S>,
    interval: Duration,
}

impl<S: MarkerSource> MarkerFeed<S> {
    pub fn new(source: S, interval: Duration) -> Self {
        Self {
            source: Arc::new(source),
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts a subscription: fetches immediately, then once per interval.
    ///
    /// `callback` sees a snapshot of every state change and may read the
    /// feed through a [`FeedReader`]; it must not stop the subscription itself.
    /// Must be called from within a tokio runtime.
    pub fn start<F>(&self, callback: F) -> FeedHandle
    where
        F: Fn(&FeedState) + Send + Sync + 'static,
    {
        let subscription = Arc::new(Subscription {
            shared: Mutex::new(Shared {
                state: FeedState::default(),
                active: true,
                in_flight: 0,
                latest_applied: 0,
            }),
            delivery: Mutex::new(()),
            callback: Box::new(callback),
        });

        info!("Starting marker feed (every {:?})", self.interval);
        let task = tokio::spawn(poll_loop(
            Arc::clone(&self.source),
            Arc::clone(&subscription),
            self.interval,
        ));

        FeedHandle {
            subscription,
            task: Some(task),
        }
    }

    /// Tears down a subscription; same as [`FeedHandle::stop`].
    pub fn stop(&self, handle: FeedHandle) {
        handle.stop();
    }
}

/// Owns one subscription's timer. Dropping the handle stops it.
pub struct FeedHandle {
    subscription: Arc<Subscription>,
    task: Option<JoinHandle<()>>,
}

impl FeedHandle {
    pub fn state(&self) -> FeedState {
        self.subscription.lock().state.clone()
    }

    /// Read-only view that can be shared with other consumers.
    pub fn reader(&self) -> FeedReader {
        FeedReader {
            subscription: Arc::clone(&self.subscription),
        }
    }

    pub fn is_active(&self) -> bool {
        self.subscription.lock().active
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.subscription.deactivate() {
            info!("Stopping marker feed");
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Cloneable read access to a subscription's latest state.
#[derive(Clone)]
pub struct FeedReader {
    subscription: Arc<Subscription>,
}

impl FeedReader {
    pub fn state(&self) -> FeedState {
        self.subscription.lock().state.clone()
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// *************** Tests ***************
