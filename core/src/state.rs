use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use formpilot_protocol::Action;
use formpilot_protocol::DomQuery;
use formpilot_protocol::Point;
use formpilot_protocol::ScanRequest;
use formpilot_protocol::ViewportBounds;
use serde_json::Value;

/// The element currently under the pointer, as last reported by the probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverTarget {
    pub id: String,
    pub name: String,
}

#[derive(Default)]
struct Inner {
    cursor: Option<Point>,
    hover: Option<HoverTarget>,
    viewport: Option<ViewportBounds>,
    pending_query: Option<DomQuery>,
    pending_scan: Option<ScanRequest>,
    parked: Option<Vec<Action>>,
    last_form_fields: Option<Value>,
}

/// Process-wide shared state. Mutated only through the narrow setters below;
/// critical sections are field-granular and never span an await.
#[derive(Default)]
pub struct StateStore {
    inner: Mutex<Inner>,
    automating: AtomicBool,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn cursor(&self) -> Option<Point> {
        self.lock().cursor
    }

    /// Trusted write from the engines; always overwrites.
    pub fn set_cursor(&self, point: Point) {
        self.lock().cursor = Some(point);
    }

    /// Intake from the probe. Missing or `(0,0)` coordinates come from
    /// hover-only relays and never clobber a real reading.
    pub fn report_cursor(&self, x: Option<f64>, y: Option<f64>) {
        let (Some(x), Some(y)) = (x, y) else {
            return;
        };
        if x == 0.0 && y == 0.0 {
            return;
        }
        self.lock().cursor = Some(Point::new(x, y));
    }

    pub fn hover(&self) -> Option<HoverTarget> {
        self.lock().hover.clone()
    }

    /// Never touches the cursor.
    pub fn set_hover(&self, hover: HoverTarget) {
        self.lock().hover = Some(hover);
    }

    pub fn viewport(&self) -> Option<ViewportBounds> {
        self.lock().viewport
    }

    pub fn set_viewport(&self, bounds: ViewportBounds) {
        self.lock().viewport = Some(bounds);
    }

    /// Poll for bounds for up to `timeout`; the probe usually reports them
    /// within its first mousemove batch.
    pub async fn wait_for_viewport(&self, timeout: Duration) -> Option<ViewportBounds> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(bounds) = self.viewport() {
                return Some(bounds);
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }

    pub fn pending_query(&self) -> Option<DomQuery> {
        self.lock().pending_query.clone()
    }

    /// Park a query for the probe to poll. Replaces any previous one; the
    /// overwritten waiter is left to its own timeout.
    pub fn set_pending_query(&self, query: DomQuery) {
        self.lock().pending_query = Some(query);
    }

    /// Clear the slot, but only if it still holds `request_id`.
    pub fn clear_pending_query(&self, request_id: u64) {
        let mut inner = self.lock();
        if inner
            .pending_query
            .as_ref()
            .is_some_and(|q| q.request_id == request_id)
        {
            inner.pending_query = None;
        }
    }

    pub fn pending_scan(&self) -> Option<ScanRequest> {
        self.lock().pending_scan
    }

    pub fn set_pending_scan(&self, scan: ScanRequest) {
        self.lock().pending_scan = Some(scan);
    }

    pub fn clear_pending_scan(&self, request_id: u64) {
        let mut inner = self.lock();
        if inner
            .pending_scan
            .is_some_and(|s| s.request_id == request_id)
        {
            inner.pending_scan = None;
        }
    }

    /// Park a command list for a later `/start`. Replaces any previous one
    /// and never cancels a running sequence.
    pub fn park(&self, actions: Vec<Action>) {
        self.lock().parked = Some(actions);
    }

    pub fn take_parked(&self) -> Option<Vec<Action>> {
        self.lock().parked.take()
    }

    pub fn automating(&self) -> bool {
        self.automating.load(Ordering::SeqCst)
    }

    pub fn set_automating(&self, on: bool) {
        self.automating.store(on, Ordering::SeqCst);
    }

    pub fn last_form_fields(&self) -> Option<Value> {
        self.lock().last_form_fields.clone()
    }

    pub fn set_last_form_fields(&self, fields: Value) {
        self.lock().last_form_fields = Some(fields);
    }
}
