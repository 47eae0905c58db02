use std::time::Duration;

use formpilot_injector::CommandSink;
use formpilot_protocol::InjectorCommand;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::ActionEngine;
use super::ActionError;
use super::OPTION_ATTEMPTS;
use super::jitter_f64;
use super::jitter_i32;
use crate::motion::MoveProfile;
use crate::query::ProbeClient;

const RETRY_DELAY: Duration = Duration::from_millis(500);
const HOVER_SETTLE: Duration = Duration::from_millis(100);
const STRIKE_SETTLE: Duration = Duration::from_millis(500);
/// React re-renders can briefly drop the element after a strike; the verify
/// polls through that window.
const VERIFY_RETRIES: u32 = 4;
const VERIFY_SPACING: Duration = Duration::from_millis(400);

impl ActionEngine {
    /// Select the option inside `container` whose label matches `label`.
    /// Verified exclusively by the probe reporting `checked == true`.
    pub(super) async fn click_option(
        &self,
        container: &str,
        label: &str,
    ) -> Result<(), ActionError> {
        // Fast path: nothing to do when the option is already selected.
        if let Ok(pre) = self.probe.query(container, Some(label)).await {
            if pre.found && pre.checked == Some(true) {
                info!("{label:?} in {container} already selected, skipping");
                return Ok(());
            }
        }

        for attempt in 1..=OPTION_ATTEMPTS {
            if self.stop.is_triggered() {
                return Err(ActionError::Stopped);
            }
            match self.option_attempt(container, label, attempt).await {
                Ok(true) => {
                    info!("selected {label:?} in {container}");
                    return Ok(());
                }
                Ok(false) => debug!("option attempt {attempt} on {container} did not land"),
                Err(ActionError::Stopped) => return Err(ActionError::Stopped),
                Err(err) => {
                    warn!("option attempt {attempt} on {container}: {err}");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
        Err(ActionError::Unverified {
            action: "CLICK_OPTION",
            selector: container.to_string(),
            attempts: OPTION_ATTEMPTS,
        })
    }

    async fn option_attempt(
        &self,
        container: &str,
        label: &str,
        attempt: u32,
    ) -> Result<bool, ActionError> {
        let mut snapshot = self.probe.query(container, Some(label)).await?;
        if !snapshot.found {
            tokio::time::sleep(RETRY_DELAY).await;
            return Ok(false);
        }
        if snapshot.checked == Some(true) {
            // A previous strike landed while we were looping.
            return Ok(true);
        }
        if !snapshot.in_viewport {
            match self.scroll_into_view(container, Some(label)).await {
                Some(scrolled) if scrolled.in_viewport => snapshot = scrolled,
                _ => return Ok(false),
            }
        }

        if attempt >= 2 {
            // Nudge the pointer a few pixels so the probe refreshes its
            // hover tracking, then look again before striking.
            let jx = jitter_i32(-3, 3);
            let jy = jitter_i32(-3, 3);
            if jx != 0 || jy != 0 {
                self.sink.write_move(jx, jy)?;
                self.sink.write_move(-jx, -jy)?;
            }
            tokio::time::sleep(HOVER_SETTLE).await;
            snapshot = self.probe.query(container, Some(label)).await?;
            if snapshot.checked == Some(true) {
                return Ok(true);
            }
        }

        // The probe's cursor reading is authoritative.
        self.state.set_cursor(snapshot.cursor());
        let mut target = snapshot.center();
        if attempt >= 2 {
            target.x += jitter_f64(-5.0, 5.0);
            target.y += jitter_f64(-5.0, 5.0);
        }
        self.motion.move_to(target, MoveProfile::Direct).await?;
        tokio::time::sleep(HOVER_SETTLE).await;

        // Only strike while the probe sees the right label under the cursor.
        let hover = self.probe.query(container, Some(label)).await?;
        let hovered = hover.hovered_label_text.unwrap_or_default().to_lowercase();
        if !hovered.contains(&label.to_lowercase()) {
            debug!("hovering {hovered:?}, want {label:?}; holding the click");
            return Ok(false);
        }

        self.sink.send(InjectorCommand::Click).await?;
        tokio::time::sleep(STRIKE_SETTLE).await;

        for _ in 0..VERIFY_RETRIES {
            match self.probe.query(container, Some(label)).await {
                Ok(after) if after.found && after.checked == Some(true) => return Ok(true),
                Ok(_) | Err(_) => tokio::time::sleep(VERIFY_SPACING).await,
            }
        }
        Ok(false)
    }
}
