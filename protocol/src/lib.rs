//! Wire types shared by the control plane, the action engine, and the
//! injector link: the probe JSON contract, the injector command grammar, and
//! the high-level action grammar accepted at `/automation`.

mod action;
mod command;
mod geometry;
mod wire;

pub use action::Action;
pub use action::ActionParseError;
pub use command::InjectorCommand;
pub use geometry::Point;
pub use geometry::ViewportBounds;
pub use wire::AutomationRequest;
pub use wire::CursorReport;
pub use wire::DomQuery;
pub use wire::DomSnapshot;
pub use wire::HoverReport;
pub use wire::Question;
pub use wire::QuestionKind;
pub use wire::ScanRequest;
pub use wire::ScanResponse;
pub use wire::StatusResponse;
pub use wire::TestMoveRequest;
pub use wire::WireBounds;
