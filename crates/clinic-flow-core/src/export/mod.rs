//! Export of finished sessions for the billing system.

mod billing;

pub use billing::*;
