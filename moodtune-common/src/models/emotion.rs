//! Emotion vocabulary
//!
//! Two vocabularies coexist: the classifier speaks [`Emotion`]
//! (joy/sadness/anger) while the recommendation service speaks [`MoodKey`]
//! (happy/sad/angry/...). [`Emotion::mood_key`] is the only bridge between them.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Emotion produced by facial emotion recognition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Joy,
    Sadness,
    Anger,
}

impl Emotion {
    pub const ALL: [Emotion; 3] = [Emotion::Joy, Emotion::Sadness, Emotion::Anger];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Joy => "joy",
            Emotion::Sadness => "sadness",
            Emotion::Anger => "anger",
        }
    }

    /// Map a classifier emotion onto the recommendation vocabulary
    pub fn mood_key(&self) -> MoodKey {
        match self {
            Emotion::Joy => MoodKey::Happy,
            Emotion::Sadness => MoodKey::Sad,
            Emotion::Anger => MoodKey::Angry,
        }
    }

    /// Parse a label coming from a remote classifier (case-insensitive)
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "joy" => Some(Emotion::Joy),
            "sadness" => Some(Emotion::Sadness),
            "anger" => Some(Emotion::Anger),
            _ => None,
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Emotion::from_label(s)
            .ok_or_else(|| Error::InvalidInput(format!("unsupported emotion: {}", s)))
    }
}

/// User's stated goal for the detected mood
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intention {
    /// Keep the current mood
    Maintain,
    /// Move towards a different, user-chosen mood
    Change,
}

impl Intention {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intention::Maintain => "maintain",
            Intention::Change => "change",
        }
    }
}

impl fmt::Display for Intention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intention {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "maintain" => Ok(Intention::Maintain),
            "change" => Ok(Intention::Change),
            other => Err(Error::InvalidInput(format!("unsupported intention: {}", other))),
        }
    }
}

/// Mood key understood by the recommendation service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodKey {
    Happy,
    Sad,
    Angry,
    Relaxed,
    Calm,
    Energetic,
}

impl MoodKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoodKey::Happy => "happy",
            MoodKey::Sad => "sad",
            MoodKey::Angry => "angry",
            MoodKey::Relaxed => "relaxed",
            MoodKey::Calm => "calm",
            MoodKey::Energetic => "energetic",
        }
    }
}

impl fmt::Display for MoodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoodKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "happy" => Ok(MoodKey::Happy),
            "sad" => Ok(MoodKey::Sad),
            "angry" => Ok(MoodKey::Angry),
            "relaxed" => Ok(MoodKey::Relaxed),
            "calm" => Ok(MoodKey::Calm),
            "energetic" => Ok(MoodKey::Energetic),
            other => Err(Error::InvalidInput(format!("unsupported mood: {}", other))),
        }
    }
}

/// Music provider hosting external playlists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MusicProvider {
    #[default]
    Spotify,
    AppleMusic,
    AmazonMusic,
}

impl MusicProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            MusicProvider::Spotify => "spotify",
            MusicProvider::AppleMusic => "apple_music",
            MusicProvider::AmazonMusic => "amazon_music",
        }
    }
}

impl fmt::Display for MusicProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MusicProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spotify" => Ok(MusicProvider::Spotify),
            "apple_music" => Ok(MusicProvider::AppleMusic),
            "amazon_music" => Ok(MusicProvider::AmazonMusic),
            other => Err(Error::InvalidInput(format!("unsupported provider: {}", other))),
        }
    }
}

/// Who performed an audited action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    System,
    User,
}
