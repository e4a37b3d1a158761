//! Core session logic layer
//!
//! Line classification, output panes and the session orchestrator.
//! NO imports from frontend/ or transport code.
//! Core produces session events, frontends read and render them.

pub mod console;
pub mod session;
pub mod triggers;

pub use session::{Location, Pane, Session, SessionEvent};
