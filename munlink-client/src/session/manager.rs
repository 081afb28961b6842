//! Session manager - access-token lifecycle
//!
//! Keeps a continuously valid access token available to the HTTP client
//! without explicit caller intervention: in-memory storage, pre-expiry
//! renewal scheduling, single-flight refresh, and session restore on startup.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cache::TokenCache;
use super::claims::decode_claims;
use super::refresh::RefreshTransport;

/// Renewal fires this many seconds before the token's `exp`, tolerating clock
/// skew and request latency.
pub const REFRESH_SAFETY_MARGIN_SECS: i64 = 60;

/// Session lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A token was installed after an explicit login.
    Authenticated,
    /// A scheduled or reactive refresh produced a new token.
    Refreshed,
    /// The session could not be recovered; callers must re-authenticate.
    Expired,
}

type SharedRefresh = Shared<BoxFuture<'static, Option<String>>>;

struct SessionState {
    /// Authoritative in-memory token.
    access_token: Mutex<Option<String>>,
    /// At most one armed renewal task, always targeting the current token.
    refresh_timer: Mutex<Option<JoinHandle<()>>>,
    /// At most one network refresh in flight; concurrent callers share it.
    refresh_inflight: Mutex<Option<SharedRefresh>>,
    cache: Box<dyn TokenCache>,
    transport: Arc<dyn RefreshTransport>,
    events: broadcast::Sender<SessionEvent>,
}

/// Owns the access-token lifecycle for one client instance.
///
/// Construct one per client and inject it wherever requests are made; clones
/// share the same session.
#[derive(Clone)]
pub struct SessionManager {
    state: Arc<SessionState>,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn RefreshTransport>, cache: Box<dyn TokenCache>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Arc::new(SessionState {
                access_token: Mutex::new(None),
                refresh_timer: Mutex::new(None),
                refresh_inflight: Mutex::new(None),
                cache,
                transport,
                events,
            }),
        }
    }

    /// Current access token. Pure read, no I/O.
    pub fn access_token(&self) -> Option<String> {
        self.state
            .access_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the in-memory token and mirror it into the session cache.
    ///
    /// Cache failures are swallowed by the cache implementation; the
    /// in-memory copy is authoritative.
    pub fn set_access_token(&self, token: Option<&str>) {
        *self
            .state
            .access_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = token.map(str::to_string);
        match token {
            Some(token) => self.state.cache.store(token),
            None => self.state.cache.clear(),
        }
    }

    /// Install a token and arrange its renewal. This is the entry point used
    /// right after a login succeeds.
    pub fn set_session_access_token(&self, token: Option<&str>) {
        self.set_access_token(token);
        if let Some(token) = token {
            self.schedule_refresh(token);
            let _ = self.state.events.send(SessionEvent::Authenticated);
        }
    }

    /// Tear the session down: null the token, cancel any armed renewal, clear
    /// the cache mirror. Idempotent.
    ///
    /// An in-flight network refresh is not cancelled; if it resolves after an
    /// explicit logout it will repopulate the token. The race is accepted and
    /// matches the product's long-standing behavior.
    pub fn clear(&self) {
        *self
            .state
            .access_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        if let Some(timer) = self
            .state
            .refresh_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            timer.abort();
        }
        self.state.cache.clear();
    }

    /// `clear` plus an `Expired` broadcast. Used when session recovery failed
    /// and callers must send the user back through authentication.
    pub fn expire(&self) {
        self.clear();
        let _ = self.state.events.send(SessionEvent::Expired);
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.state.events.subscribe()
    }

    /// Arm the one-shot renewal timer for `token`, replacing any armed timer.
    /// Tokens without a readable `exp` are treated as non-expiring and get no
    /// timer.
    fn schedule_refresh(&self, token: &str) {
        let mut timer = self
            .state
            .refresh_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = timer.take() {
            old.abort();
        }

        let Some(exp) = decode_claims(token).and_then(|claims| claims.exp) else {
            return;
        };

        let delay_secs = (exp - Utc::now().timestamp() - REFRESH_SAFETY_MARGIN_SECS).max(0);
        debug!(delay_secs, "Scheduling access-token renewal");

        let session = self.clone();
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(delay_secs as u64)).await;
            // A failed scheduled renewal is swallowed; the reactive
            // refresh-on-401 path remains the safety net.
            if session.refresh().await.is_none() {
                debug!("Scheduled renewal did not produce a token");
            }
        }));
    }

    /// Obtain a fresh access token, sharing a single in-flight network
    /// refresh among all concurrent callers.
    ///
    /// The first caller starts the operation and parks it in the shared slot;
    /// later callers await the same pending result. The slot is cleared once
    /// the operation settles so the next distinct refresh need starts fresh.
    pub async fn refresh(&self) -> Option<String> {
        let shared = {
            let mut inflight = self
                .state
                .refresh_inflight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(pending) = inflight.clone() {
                pending
            } else {
                let session = self.clone();
                let fut: SharedRefresh = async move {
                    let token = session.do_refresh().await;
                    session
                        .state
                        .refresh_inflight
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .take();
                    token
                }
                .boxed()
                .shared();
                *inflight = Some(fut.clone());
                fut
            }
        };
        shared.await
    }

    /// One real network refresh. On success the new token is installed,
    /// mirrored, rescheduled, and announced; on failure existing state is
    /// left untouched.
    async fn do_refresh(&self) -> Option<String> {
        match self.state.transport.refresh().await {
            Some(token) => {
                self.set_access_token(Some(token.as_str()));
                self.schedule_refresh(&token);
                let _ = self.state.events.send(SessionEvent::Refreshed);
                info!("Access token refreshed");
                Some(token)
            }
            None => {
                warn!("Access-token refresh attempt failed");
                None
            }
        }
    }

    /// Restore a session at startup.
    ///
    /// Warm path: a cached token is installed and its renewal armed right
    /// away, with an opportunistic background refresh fired unawaited;
    /// returns `true` optimistically and lets the 401 path correct a stale
    /// token. Cold path: probe for a refresh credential first so anonymous
    /// visitors never pay a guaranteed-401 round trip; refresh only when the
    /// probe says one exists.
    pub async fn bootstrap(&self) -> bool {
        if let Some(saved) = self.state.cache.load() {
            self.set_access_token(Some(saved.as_str()));
            self.schedule_refresh(&saved);
            let session = self.clone();
            tokio::spawn(async move {
                let _ = session.refresh().await;
            });
            return true;
        }

        if self.state.transport.probe().await {
            self.refresh().await.is_some()
        } else {
            false
        }
    }
}
