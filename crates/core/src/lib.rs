//! Core shared types and logic for Steam Play Together
//!
//! This crate contains:
//! - Data models shared between the backend proxy and the browser client
//! - Proxy request/response message types
//! - Error types and the Steam error classifier
//! - The common-games resolver
//! - The client-side snapshot cache and the domain state controllers

pub mod models;
pub mod messages;
pub mod error;
pub mod classify;
pub mod steam;
pub mod resolver;
pub mod cache;
pub mod table;
pub mod format;
pub mod controllers;

#[cfg(test)]
mod testing;

pub use models::*;
pub use messages::*;
pub use error::*;
pub use classify::{classify, log_steam_error, NetworkFailure, RawFailure};
pub use steam::SteamApi;
pub use resolver::{dedup_friend_ids, resolve_common_games};
pub use cache::{CacheDomain, Clock, KeyValueStore, MemoryStore, SnapshotCache, SystemClock};
pub use controllers::{FriendsController, LibraryController, LoadPhase, PlayTogether, SettingsController, ThemeEnvironment};
