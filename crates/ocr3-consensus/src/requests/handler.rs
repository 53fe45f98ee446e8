//! # Request Handler
//!
//! Correlates requests from the capability front door with responses from
//! the transmitter.
//!
//! All state lives in a single worker task; callers only talk to it over
//! channels, so the pending map and the response cache need no locks.
//!
//! ```text
//!   send_request ──┐                      ┌──→ RequestStore (read by the plugin)
//!                  ├──→ [worker task] ────┤
//!   send_response ─┘        │  ▲          └──→ callback (oneshot, exactly once)
//!                           │  │
//!               expiry tick ┘  └ cache tick
//! ```
//!
//! Per execution id:
//! 1. request, response cached → deliver cached response, never stored
//! 2. request, no cached response → pending + added to the store
//! 3. pending, response arrives → evicted from the store, delivered
//! 4. pending, past expiry at a sweep → evicted, timeout error delivered
//! 5. response, nothing pending → cached until `response_cache_expiry`

use crate::config::Ocr3Config;
use crate::domain::{Request, Response};
use crate::error::{HandlerError, ResponseError};
use crate::metrics;
use crate::ports::RequestSender;
use crate::requests::store::RequestStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// A request travelling to the worker together with its caller's channel.
struct RequestEnvelope {
    request: Request,
    callback: oneshot::Sender<Response>,
}

struct PendingRequest {
    expires_at: Instant,
    callback: oneshot::Sender<Response>,
}

impl PendingRequest {
    /// Expiry is strict: a request is still live at exactly `expires_at`.
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

struct CachedResponse {
    response: Response,
    cached_at: Instant,
}

/// Handle to the request correlation worker.
pub struct RequestHandler {
    request_tx: mpsc::Sender<RequestEnvelope>,
    response_tx: mpsc::Sender<Response>,
    /// Worker waiting to be spawned; taken by `start()`.
    worker: Mutex<Option<HandlerWorker>>,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RequestHandler {
    /// Creates a handler over `store`. Nothing runs until [`start`](Self::start).
    pub fn new(store: Arc<RequestStore>, config: &Ocr3Config) -> Self {
        Self::with_timing(
            store,
            config.sweep_interval(),
            config.response_cache_expiry(),
        )
    }

    /// Creates a handler with explicit sweep cadence and cache TTL.
    pub fn with_timing(
        store: Arc<RequestStore>,
        sweep_interval: Duration,
        response_cache_expiry: Duration,
    ) -> Self {
        // capacity 1: senders wait for the worker instead of queueing work
        let (request_tx, request_rx) = mpsc::channel(1);
        let (response_tx, response_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let worker = HandlerWorker {
            request_rx,
            response_rx,
            shutdown_rx,
            state: HandlerState {
                store,
                pending: HashMap::new(),
                response_cache: HashMap::new(),
                response_cache_expiry,
            },
            sweep_interval,
        };

        Self {
            request_tx,
            response_tx,
            worker: Mutex::new(Some(worker)),
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            task: Mutex::new(None),
        }
    }

    /// Spawns the worker task on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// `HandlerError::AlreadyStarted` on a second call.
    pub fn start(&self) -> Result<(), HandlerError> {
        let worker = self.worker.lock().take().ok_or(HandlerError::AlreadyStarted)?;
        let handle = tokio::spawn(worker.run());
        *self.task.lock() = Some(handle);
        info!("Request handler started");
        Ok(())
    }

    /// Stops the worker and waits for it to exit. Pending callers are left
    /// without a response; their receivers observe a closed channel.
    pub async fn close(&self) {
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(());
        }
        // never started: dropping the worker closes the channels
        self.worker.lock().take();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(error = %e, "Request handler task failed");
            }
        }
        info!("Request handler stopped");
    }
}

#[async_trait]
impl RequestSender for RequestHandler {
    async fn send_request(
        &self,
        request: Request,
        callback: oneshot::Sender<Response>,
    ) -> Result<(), HandlerError> {
        self.request_tx
            .send(RequestEnvelope { request, callback })
            .await
            .map_err(|_| HandlerError::Closed)
    }

    async fn send_response(&self, response: Response) -> Result<(), HandlerError> {
        self.response_tx
            .send(response)
            .await
            .map_err(|_| HandlerError::Closed)
    }
}

struct HandlerWorker {
    request_rx: mpsc::Receiver<RequestEnvelope>,
    response_rx: mpsc::Receiver<Response>,
    shutdown_rx: oneshot::Receiver<()>,
    state: HandlerState,
    sweep_interval: Duration,
}

impl HandlerWorker {
    async fn run(self) {
        let HandlerWorker {
            mut request_rx,
            mut response_rx,
            mut shutdown_rx,
            mut state,
            sweep_interval,
        } = self;

        let mut expiry_ticker = interval(sweep_interval);
        expiry_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cache_ticker = interval(sweep_interval);
        cache_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                // resolves on an explicit close or when the handle is dropped
                _ = &mut shutdown_rx => break,

                _ = cache_ticker.tick() => state.expire_cached_responses(),

                _ = expiry_ticker.tick() => state.expire_requests(Instant::now()),

                Some(envelope) = request_rx.recv() => state.on_request(envelope),

                Some(response) = response_rx.recv() => state.on_response(response),
            }
        }

        debug!(
            pending = state.pending.len(),
            cached = state.response_cache.len(),
            "Request handler worker exiting"
        );
    }
}

/// State owned exclusively by the worker task.
struct HandlerState {
    store: Arc<RequestStore>,
    pending: HashMap<String, PendingRequest>,
    response_cache: HashMap<String, CachedResponse>,
    response_cache_expiry: Duration,
}

impl HandlerState {
    fn on_request(&mut self, envelope: RequestEnvelope) {
        let RequestEnvelope { request, callback } = envelope;
        let id = request.workflow_execution_id().to_string();

        if let Some(cached) = self.response_cache.remove(&id) {
            debug!(execution_id = %id, "Found cached response for request");
            deliver(callback, cached.response);
            return;
        }

        if self.pending.contains_key(&id) {
            warn!(execution_id = %id, "Rejecting request already pending");
            deliver(
                callback,
                Response::err(&id, ResponseError::DuplicateRequest(id.clone())),
            );
            return;
        }

        let expires_at = request.expires_at;
        if let Err(e) = self.store.add(request) {
            error!(execution_id = %id, error = %e, "Failed to add request to store");
            deliver(callback, Response::err(&id, ResponseError::Failed(e.to_string())));
            return;
        }
        self.pending.insert(
            id,
            PendingRequest {
                expires_at,
                callback,
            },
        );
    }

    fn on_response(&mut self, response: Response) {
        let id = response.workflow_execution_id.clone();
        match self.pending.remove(&id) {
            Some(pending) => {
                self.store.evict(&id);
                deliver(pending.callback, response);
            }
            None => {
                debug!(execution_id = %id, "Caching response without request");
                metrics::record_response_cached();
                self.response_cache.insert(
                    id,
                    CachedResponse {
                        response,
                        cached_at: Instant::now(),
                    },
                );
            }
        }
    }

    fn expire_requests(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, p)| p.is_expired(now))
            .map(|(id, _)| id.clone())
            .collect();

        for id in expired {
            if let Some(pending) = self.pending.remove(&id) {
                self.store.evict(&id);
                warn!(execution_id = %id, "Request expired before a response arrived");
                metrics::record_request_expired();
                deliver(pending.callback, Response::timeout(&id));
            }
        }
    }

    fn expire_cached_responses(&mut self) {
        let expiry = self.response_cache_expiry;
        self.response_cache.retain(|id, cached| {
            let keep = cached.cached_at.elapsed() <= expiry;
            if !keep {
                debug!(execution_id = %id, "Expired cached response");
            }
            keep
        });
    }
}

/// Sends the single response a caller will ever get. The sender is consumed,
/// which closes the channel.
fn deliver(callback: oneshot::Sender<Response>, response: Response) {
    let id = response.workflow_execution_id.clone();
    if callback.send(response).is_err() {
        debug!(execution_id = %id, "Response receiver dropped before delivery");
    }
}
