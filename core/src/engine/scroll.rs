use std::time::Duration;

use formpilot_injector::CommandSink;
use formpilot_protocol::DomSnapshot;
use formpilot_protocol::InjectorCommand;
use tracing::warn;

use super::ActionEngine;
use super::jitter_i32;
use super::jitter_ms;
use crate::query::ProbeClient;

const SCROLL_ITERATIONS: u32 = 12;
/// Under this remaining distance the element is close enough to aim at.
const SCROLL_TOLERANCE: f64 = 50.0;
const SCROLL_SETTLE: Duration = Duration::from_millis(150);

impl ActionEngine {
    /// Nudge the page in small wheel increments until the element is inside
    /// the content area, driven by the probe's `scroll_delta_needed`
    /// feedback. Returns the latest snapshot; callers treat
    /// `in_viewport == false` as a failed attempt.
    pub(super) async fn scroll_into_view(
        &self,
        selector: &str,
        label: Option<&str>,
    ) -> Option<DomSnapshot> {
        let mut last = None;
        for _ in 0..SCROLL_ITERATIONS {
            let snapshot = match self.probe.query(selector, label).await {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    warn!("scroll query on {selector} failed: {err}");
                    return last;
                }
            };
            if !snapshot.found {
                return Some(snapshot);
            }
            if snapshot.in_viewport {
                tokio::time::sleep(SCROLL_SETTLE).await;
                return match self.probe.query(selector, label).await {
                    Ok(latest) => Some(latest),
                    Err(_) => Some(snapshot),
                };
            }

            let delta = snapshot.scroll_delta_needed;
            if delta.abs() < SCROLL_TOLERANCE {
                // Close enough to work with even though the probe still
                // reports it outside.
                let mut accepted = snapshot;
                accepted.in_viewport = true;
                tokio::time::sleep(SCROLL_SETTLE).await;
                return Some(accepted);
            }

            let magnitude = jitter_i32(4, 8);
            let units = if delta > 0.0 { magnitude } else { -magnitude };
            if let Err(err) = self.sink.send(InjectorCommand::Scroll { units }).await {
                warn!("scroll write failed: {err}");
                return last;
            }
            tokio::time::sleep(Duration::from_millis(jitter_ms(80, 120))).await;
            last = Some(snapshot);
        }
        last
    }
}
