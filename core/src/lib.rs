//! The coordinator core: process-wide state, the probe query bridge, the
//! motion planner, the typing generator, and the verify-before-proceed
//! action engine.

mod engine;
mod motion;
mod query;
mod state;
#[cfg(test)]
mod test_support;
mod typing;

pub use engine::ActionEngine;
pub use engine::ActionError;
pub use motion::MotionEngine;
pub use motion::MotionError;
pub use motion::MoveProfile;
pub use query::DOM_QUERY_TIMEOUT;
pub use query::ProbeBridge;
pub use query::ProbeClient;
pub use query::QueryError;
pub use query::SCAN_TIMEOUT;
pub use state::HoverTarget;
pub use state::StateStore;
pub use typing::TypingStep;
pub use typing::typing_program;
