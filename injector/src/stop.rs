use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// Process-wide kill switch. Every long loop polls it; once triggered the
/// command queue drains without writing and public operations return
/// immediately. It never interrupts a write mid-line.
#[derive(Debug, Clone, Default)]
pub struct EmergencyStop(Arc<AtomicBool>);

impl EmergencyStop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
