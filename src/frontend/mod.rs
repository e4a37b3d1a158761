//! Frontend abstraction layer
//!
//! This module defines the `Frontend` trait that output frontends implement.
//! The core produces [`SessionEvent`]s; a frontend turns them into pixels or
//! terminal output and never touches session state.

pub mod console;
pub mod events;

use crate::core::SessionEvent;
use anyhow::Result;
pub use console::ConsoleFrontend;
pub use events::FrontendEvent;

/// Frontend trait - implemented by every output frontend
pub trait Frontend {
    /// Draw a batch of session events in order
    fn apply(&mut self, events: &[SessionEvent]) -> Result<()>;

    /// Restore the terminal / close windows before exit
    fn cleanup(&mut self) -> Result<()>;
}
