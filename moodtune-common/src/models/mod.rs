//! Data model shared by the MoodTune client
//!
//! Types mirror the backend REST resources one-to-one. Field names stay in
//! snake_case because they travel over the wire unchanged.

pub mod emotion;
pub mod resources;

pub use emotion::{ActorType, Emotion, Intention, MoodKey, MusicProvider};
pub use resources::*;
