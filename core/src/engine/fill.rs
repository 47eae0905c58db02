use std::time::Duration;

use formpilot_injector::CommandSink;
use formpilot_protocol::DomSnapshot;
use formpilot_protocol::InjectorCommand;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::ActionEngine;
use super::ActionError;
use super::FILL_ATTEMPTS;
use super::value_matches;
use crate::motion::MoveProfile;
use crate::query::ProbeClient;
use crate::typing::typing_program;

const CLICK_SETTLE: Duration = Duration::from_millis(250);
const CLEAR_SETTLE: Duration = Duration::from_millis(120);
const TYPE_SETTLE: Duration = Duration::from_millis(200);

impl ActionEngine {
    /// Focus the field, replace its content, and verify the value landed.
    pub(super) async fn fill_field(&self, selector: &str, text: &str) -> Result<(), ActionError> {
        for attempt in 1..=FILL_ATTEMPTS {
            if self.stop.is_triggered() {
                return Err(ActionError::Stopped);
            }
            match self.fill_attempt(selector, text).await {
                Ok(true) => {
                    info!("filled {selector}");
                    return Ok(());
                }
                Ok(false) => debug!("fill attempt {attempt} on {selector} did not verify"),
                Err(ActionError::Stopped) => return Err(ActionError::Stopped),
                Err(err) => warn!("fill attempt {attempt} on {selector}: {err}"),
            }
        }
        Err(ActionError::Unverified {
            action: "FILL_FIELD",
            selector: selector.to_string(),
            attempts: FILL_ATTEMPTS,
        })
    }

    async fn fill_attempt(&self, selector: &str, text: &str) -> Result<bool, ActionError> {
        let snapshot = self.probe.query(selector, None).await?;
        if !snapshot.found {
            warn!("{selector} not found");
            return Ok(false);
        }
        let Some(snapshot) = self.ensure_visible(selector, snapshot).await else {
            return Ok(false);
        };

        // The probe's cursor reading is authoritative for the start point.
        self.state.set_cursor(snapshot.cursor());
        self.motion
            .move_to(snapshot.center(), MoveProfile::Curved)
            .await?;
        self.sink.send(InjectorCommand::Click).await?;
        tokio::time::sleep(CLICK_SETTLE).await;

        let mut focused = self.is_focused(selector).await;
        if !focused {
            debug!("{selector} did not take focus, re-striking");
            self.motion
                .move_to(snapshot.center(), MoveProfile::Curved)
                .await?;
            self.sink.send(InjectorCommand::Click).await?;
            tokio::time::sleep(CLICK_SETTLE).await;
            focused = self.is_focused(selector).await;
        }
        if !focused {
            return Ok(false);
        }

        // Select-all so the typed text replaces whatever is there.
        self.sink.send(InjectorCommand::combo("ctrl+a")).await?;
        tokio::time::sleep(CLEAR_SETTLE).await;

        let program = typing_program(text, &mut rand::rng());
        for step in program {
            if self.stop.is_triggered() {
                return Err(ActionError::Stopped);
            }
            self.sink.send(step.command).await?;
            tokio::time::sleep(step.pause).await;
        }
        tokio::time::sleep(TYPE_SETTLE).await;

        let after = self.probe.query(selector, None).await?;
        Ok(value_matches(&after.value, text))
    }

    async fn is_focused(&self, selector: &str) -> bool {
        self.probe
            .query(selector, None)
            .await
            .map(|s| s.focused)
            .unwrap_or(false)
    }

    /// Scroll the element into the content area when needed. `None` means
    /// this attempt is over.
    pub(super) async fn ensure_visible(
        &self,
        selector: &str,
        snapshot: DomSnapshot,
    ) -> Option<DomSnapshot> {
        if snapshot.in_viewport {
            return Some(snapshot);
        }
        match self.scroll_into_view(selector, None).await {
            Some(scrolled) if scrolled.in_viewport => Some(scrolled),
            _ => {
                warn!("{selector} still outside the viewport");
                None
            }
        }
    }
}
