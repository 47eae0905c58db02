use std::time::Duration;

use formpilot_injector::CommandSink;
use formpilot_protocol::InjectorCommand;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::ActionEngine;
use super::ActionError;
use super::CLICK_ATTEMPTS;
use crate::motion::MoveProfile;
use crate::query::ProbeClient;

const CLICK_SETTLE: Duration = Duration::from_millis(200);

impl ActionEngine {
    /// Click an element. When the element is checkable the strike is
    /// verified by watching `checked` flip; otherwise a clean strike after a
    /// successful move is taken at face value.
    pub(super) async fn click_selector(&self, selector: &str) -> Result<(), ActionError> {
        // Tri-state prior: None means there is nothing observable to verify
        // against.
        let prior_checked = self
            .probe
            .query(selector, None)
            .await
            .ok()
            .filter(|s| s.found)
            .and_then(|s| s.checked);

        for attempt in 1..=CLICK_ATTEMPTS {
            if self.stop.is_triggered() {
                return Err(ActionError::Stopped);
            }
            match self.click_attempt(selector, prior_checked).await {
                Ok(true) => {
                    info!("clicked {selector}");
                    return Ok(());
                }
                Ok(false) => debug!("click attempt {attempt} on {selector} did not verify"),
                Err(ActionError::Stopped) => return Err(ActionError::Stopped),
                Err(err) => warn!("click attempt {attempt} on {selector}: {err}"),
            }
        }
        Err(ActionError::Unverified {
            action: "CLICK_SELECTOR",
            selector: selector.to_string(),
            attempts: CLICK_ATTEMPTS,
        })
    }

    async fn click_attempt(
        &self,
        selector: &str,
        prior_checked: Option<bool>,
    ) -> Result<bool, ActionError> {
        let snapshot = self.probe.query(selector, None).await?;
        if !snapshot.found {
            warn!("{selector} not found");
            return Ok(false);
        }
        let Some(snapshot) = self.ensure_visible(selector, snapshot).await else {
            return Ok(false);
        };

        self.state.set_cursor(snapshot.cursor());
        self.motion
            .move_to(snapshot.center(), MoveProfile::Curved)
            .await?;
        self.sink.send(InjectorCommand::Click).await?;
        tokio::time::sleep(CLICK_SETTLE).await;

        match prior_checked {
            Some(was) => {
                let after = self.probe.query(selector, None).await?;
                Ok(after.checked.is_some_and(|now| now != was))
            }
            None => Ok(true),
        }
    }
}
