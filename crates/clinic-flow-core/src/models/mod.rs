//! Domain models for the clinic-flow orchestrator.

mod appointment;
mod entry;
mod pet;
mod session;
mod staff;

pub use appointment::*;
pub use entry::*;
pub use pet::*;
pub use session::*;
pub use staff::*;
