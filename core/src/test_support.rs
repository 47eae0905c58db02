#![allow(clippy::unwrap_used)]

use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use formpilot_injector::CommandSink;
use formpilot_protocol::DomSnapshot;
use formpilot_protocol::InjectorCommand;
use formpilot_protocol::ScanResponse;

use crate::query::DOM_QUERY_TIMEOUT;
use crate::query::ProbeClient;
use crate::query::QueryError;
use crate::query::SCAN_TIMEOUT;

/// Records every line the engines would have written to the device.
#[derive(Default)]
pub(crate) struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub(crate) fn moves(&self) -> Vec<(i32, i32)> {
        self.lines()
            .iter()
            .filter_map(|line| {
                let rest = line.strip_prefix("MOVE,")?;
                let (dx, dy) = rest.split_once(',')?;
                Some((dx.parse().ok()?, dy.parse().ok()?))
            })
            .collect()
    }

    pub(crate) fn count_of(&self, prefix: &str) -> usize {
        self.lines()
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl CommandSink for RecordingSink {
    async fn send(&self, command: InjectorCommand) -> formpilot_injector::Result<()> {
        self.lines.lock().unwrap().push(command.to_string());
        Ok(())
    }

    fn write_move(&self, dx: i32, dy: i32) -> formpilot_injector::Result<()> {
        self.lines
            .lock()
            .unwrap()
            .push(InjectorCommand::Move { dx, dy }.to_string());
        Ok(())
    }
}

type Responder =
    dyn Fn(usize, &str, Option<&str>) -> Result<DomSnapshot, QueryError> + Send + Sync;

/// A scripted probe: the responder closure sees the zero-based call index
/// plus the selector/label of each query.
pub(crate) struct FakeProbe {
    responder: Box<Responder>,
    calls: Mutex<Vec<(String, Option<String>)>>,
    counter: AtomicUsize,
}

impl FakeProbe {
    pub(crate) fn new<F>(responder: F) -> Self
    where
        F: Fn(usize, &str, Option<&str>) -> Result<DomSnapshot, QueryError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProbeClient for FakeProbe {
    async fn query(
        &self,
        selector: &str,
        label_text: Option<&str>,
    ) -> Result<DomSnapshot, QueryError> {
        let index = self.counter.fetch_add(1, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push((selector.to_string(), label_text.map(str::to_string)));
        (self.responder)(index, selector, label_text)
    }

    async fn scan(&self) -> Result<ScanResponse, QueryError> {
        Err(QueryError::ScanTimeout {
            request_id: 0,
            timeout: SCAN_TIMEOUT,
        })
    }
}

/// A found, in-viewport snapshot centered at (`x`, `y`) with the probe's
/// cursor at (`cx`, `cy`).
pub(crate) fn visible_snapshot(x: f64, y: f64, cx: f64, cy: f64) -> DomSnapshot {
    DomSnapshot {
        request_id: 0,
        found: true,
        x,
        y,
        cursor_x: cx,
        cursor_y: cy,
        in_viewport: true,
        ..Default::default()
    }
}

pub(crate) fn probe_timeout() -> QueryError {
    QueryError::DomTimeout {
        request_id: 0,
        timeout: DOM_QUERY_TIMEOUT,
    }
}
