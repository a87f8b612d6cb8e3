//! nmtv library
//!
//! Linear TV channels over an on-demand catalog: a playback queue per
//! channel and time-based restoration when the viewer comes back.

pub mod core;
pub mod error;
pub mod storage;
pub mod types;
pub mod ui;
pub mod utils;
