//! Admission control for the download service.
//!
//! Two independent knobs gate the work the service accepts:
//!
//! - [`RateLimiter`] bounds how many requests a single client may make per
//!   window, deciding admission message by message.
//! - [`DownloadGate`] bounds how many downloads may stream at once,
//!   suspending sessions past the cap until a slot frees.

mod gate;
mod rate;

pub use gate::{DownloadGate, DownloadPermit, GateError};
pub use rate::RateLimiter;
