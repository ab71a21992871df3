//! # MoodTune Common Library
//!
//! Shared code for the MoodTune client crates including:
//! - REST resource models (users, sessions, inferences, playlists, rules, audit logs, OAuth tokens)
//! - Emotion, intention and mood-key enums
//! - Configuration loading and data directory resolution
//! - Persistent key-value storage
//! - Session change events

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod storage;

pub use error::{Error, Result};
pub use models::{Emotion, Intention, MoodKey};
