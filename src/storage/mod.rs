//! Storage modules: config, last channel, user playlists, year cache

pub mod cache;
pub mod config;
pub mod last_channel;
pub mod playlists;
