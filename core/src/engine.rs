use std::sync::Arc;
use std::time::Duration;

use formpilot_injector::CommandSink;
use formpilot_injector::EmergencyStop;
use formpilot_protocol::Action;
use formpilot_protocol::InjectorCommand;
use rand::Rng;
use thiserror::Error;
use tracing::error;
use tracing::info;

use crate::motion::MotionEngine;
use crate::motion::MotionError;
use crate::query::ProbeClient;
use crate::query::QueryError;
use crate::state::StateStore;

mod click;
mod fill;
mod option;
mod scroll;
#[cfg(test)]
mod tests;

/// Attempt ceilings per action kind. Option toggles in React forms can need
/// several strikes before one lands.
const FILL_ATTEMPTS: u32 = 4;
const CLICK_ATTEMPTS: u32 = 4;
const OPTION_ATTEMPTS: u32 = 20;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{action} {selector}: no verified change after {attempts} attempts")]
    Unverified {
        action: &'static str,
        selector: String,
        attempts: u32,
    },

    #[error("emergency stop")]
    Stopped,

    #[error(transparent)]
    Injector(#[from] formpilot_injector::InjectorError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Motion(#[from] MotionError),
}

/// Executes action lists one directive at a time: query the probe, plan a
/// motion, strike, re-query, and only advance once the DOM confirms the
/// change. Anything unverifiable halts the whole list.
pub struct ActionEngine {
    pub(crate) state: Arc<StateStore>,
    pub(crate) probe: Arc<dyn ProbeClient>,
    pub(crate) sink: Arc<dyn CommandSink>,
    pub(crate) motion: MotionEngine,
    pub(crate) stop: EmergencyStop,
}

impl ActionEngine {
    pub fn new(
        state: Arc<StateStore>,
        probe: Arc<dyn ProbeClient>,
        sink: Arc<dyn CommandSink>,
        stop: EmergencyStop,
    ) -> Self {
        let motion = MotionEngine::new(Arc::clone(&state), Arc::clone(&sink));
        Self {
            state,
            probe,
            sink,
            motion,
            stop,
        }
    }

    /// Run one command list to completion or hard halt. The `automating`
    /// flag is true exactly while this runs; it is cleared on every exit
    /// path and the process never resumes a halted list on its own.
    pub async fn run(&self, actions: Vec<Action>) {
        self.state.set_automating(true);
        let outcome = self.run_list(&actions).await;
        self.state.set_automating(false);
        match outcome {
            Ok(()) => info!("sequence finished ({} actions)", actions.len()),
            Err(err) => error!("sequence halted: {err}"),
        }
    }

    async fn run_list(&self, actions: &[Action]) -> Result<(), ActionError> {
        for (index, action) in actions.iter().enumerate() {
            if self.stop.is_triggered() {
                return Err(ActionError::Stopped);
            }
            info!("action {index}: {action:?}");
            self.run_action(action).await?;
            tokio::time::sleep(Duration::from_millis(jitter_ms(100, 300))).await;
        }
        Ok(())
    }

    async fn run_action(&self, action: &Action) -> Result<(), ActionError> {
        match action {
            Action::Delay { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
                Ok(())
            }
            Action::FillField { selector, text } => self.fill_field(selector, text).await,
            Action::ClickSelector { selector } => self.click_selector(selector).await,
            Action::ClickOption { container, label } => self.click_option(container, label).await,
            Action::Raw(line) => {
                let command = InjectorCommand::parse(line);
                self.sink.send(command).await.map_err(Into::into)
            }
        }
    }
}

/// Uniform jitter in `[lo, hi]` milliseconds.
pub(crate) fn jitter_ms(lo: u64, hi: u64) -> u64 {
    rand::rng().random_range(lo..=hi)
}

pub(crate) fn jitter_i32(lo: i32, hi: i32) -> i32 {
    rand::rng().random_range(lo..=hi)
}

pub(crate) fn jitter_f64(lo: f64, hi: f64) -> f64 {
    rand::rng().random_range(lo..=hi)
}

/// Case-folded, trimmed prefix comparison for fill verification: success
/// when either side begins with the first 20 characters of the other.
pub(crate) fn value_matches(current: &str, target: &str) -> bool {
    let current = current.trim().to_lowercase();
    let target = target.trim().to_lowercase();
    let current_head: String = current.chars().take(20).collect();
    let target_head: String = target.chars().take(20).collect();
    current.starts_with(&target_head) || target.starts_with(&current_head)
}
