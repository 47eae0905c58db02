use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use formpilot_protocol::DomQuery;
use formpilot_protocol::DomSnapshot;
use formpilot_protocol::ScanRequest;
use formpilot_protocol::ScanResponse;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;

use crate::state::StateStore;

pub const DOM_QUERY_TIMEOUT: Duration = Duration::from_secs(5);
pub const SCAN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("probe did not answer dom query {request_id} within {timeout:?}")]
    DomTimeout { request_id: u64, timeout: Duration },

    #[error("probe did not answer scan {request_id} within {timeout:?}")]
    ScanTimeout { request_id: u64, timeout: Duration },
}

/// How the action engine asks the probe for DOM state. The production
/// implementation is [`ProbeBridge`]; tests substitute a scripted one.
#[async_trait]
pub trait ProbeClient: Send + Sync {
    async fn query(
        &self,
        selector: &str,
        label_text: Option<&str>,
    ) -> Result<DomSnapshot, QueryError>;

    async fn scan(&self) -> Result<ScanResponse, QueryError>;
}

/// Request/response correlation between the action engine and the polling
/// probe: a registry of one-shot waiters keyed by request id. The resolve
/// path and the timeout path each lookup-remove their own entry; no lock is
/// held across an await.
pub struct ProbeBridge {
    state: Arc<StateStore>,
    next_id: AtomicU64,
    dom_waiters: Mutex<HashMap<u64, oneshot::Sender<DomSnapshot>>>,
    scan_waiters: Mutex<HashMap<u64, oneshot::Sender<ScanResponse>>>,
}

impl ProbeBridge {
    pub fn new(state: Arc<StateStore>) -> Self {
        Self {
            state,
            next_id: AtomicU64::new(1),
            dom_waiters: Mutex::new(HashMap::new()),
            scan_waiters: Mutex::new(HashMap::new()),
        }
    }

    fn lock<T>(
        waiters: &Mutex<HashMap<u64, oneshot::Sender<T>>>,
    ) -> MutexGuard<'_, HashMap<u64, oneshot::Sender<T>>> {
        match waiters.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Deliver a probe DOM response. Responses with no registered waiter are
    /// late (their query already timed out) and are silently discarded.
    pub fn resolve_query(&self, snapshot: DomSnapshot) -> bool {
        if let Some(bounds) = snapshot.bounds.to_bounds() {
            self.state.set_viewport(bounds);
        }
        self.state.clear_pending_query(snapshot.request_id);
        let waiter = Self::lock(&self.dom_waiters).remove(&snapshot.request_id);
        match waiter {
            Some(tx) => tx.send(snapshot).is_ok(),
            None => {
                debug!("discarding late dom response {}", snapshot.request_id);
                false
            }
        }
    }

    /// Deliver a probe scan response; same discipline as DOM responses.
    pub fn resolve_scan(&self, response: ScanResponse) -> bool {
        if let Some(bounds) = response.bounds.to_bounds() {
            self.state.set_viewport(bounds);
        }
        self.state
            .report_cursor(Some(response.cursor_x), Some(response.cursor_y));
        self.state.clear_pending_scan(response.request_id);
        let waiter = Self::lock(&self.scan_waiters).remove(&response.request_id);
        match waiter {
            Some(tx) => tx.send(response).is_ok(),
            None => {
                debug!("discarding late scan response {}", response.request_id);
                false
            }
        }
    }
}

#[async_trait]
impl ProbeClient for ProbeBridge {
    async fn query(
        &self,
        selector: &str,
        label_text: Option<&str>,
    ) -> Result<DomSnapshot, QueryError> {
        let request_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        Self::lock(&self.dom_waiters).insert(request_id, tx);
        self.state.set_pending_query(DomQuery {
            request_id,
            selector: selector.to_string(),
            label_text: label_text.map(str::to_string),
        });
        debug!("dom query {request_id}: {selector} label={label_text:?}");

        match tokio::time::timeout(DOM_QUERY_TIMEOUT, rx).await {
            Ok(Ok(snapshot)) => Ok(snapshot),
            // Elapsed, or the waiter was dropped; either way clean up our own
            // entry and surface the timeout.
            Ok(Err(_)) | Err(_) => {
                Self::lock(&self.dom_waiters).remove(&request_id);
                self.state.clear_pending_query(request_id);
                Err(QueryError::DomTimeout {
                    request_id,
                    timeout: DOM_QUERY_TIMEOUT,
                })
            }
        }
    }

    async fn scan(&self) -> Result<ScanResponse, QueryError> {
        let request_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        Self::lock(&self.scan_waiters).insert(request_id, tx);
        self.state.set_pending_scan(ScanRequest { request_id });
        debug!("scan {request_id} issued");

        match tokio::time::timeout(SCAN_TIMEOUT, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) | Err(_) => {
                Self::lock(&self.scan_waiters).remove(&request_id);
                self.state.clear_pending_scan(request_id);
                Err(QueryError::ScanTimeout {
                    request_id,
                    timeout: SCAN_TIMEOUT,
                })
            }
        }
    }
}
