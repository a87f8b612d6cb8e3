//! Channel engine: queue, block selection, saved state, restoration

pub mod catalog;
pub mod channel_state;
pub mod clock;
pub mod dedup;
pub mod player;
pub mod queue;
pub mod restore;
pub mod selector;
pub mod tuner;
