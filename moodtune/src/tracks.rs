//! Canonical track shape and selection state
//!
//! The recommendation service returns loosely typed tracks with several
//! alias fields for the cover image. They are normalized once at the client
//! boundary into [`Track`], which carries a single resolved `cover_url`.

use serde::{Deserialize, Serialize};

/// Track as returned by the recommendation service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTrack {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub valence: Option<f64>,
    #[serde(default)]
    pub energy: Option<f64>,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub artwork_url: Option<String>,
    #[serde(default, rename = "artworkUrl")]
    pub artwork_url_camel: Option<String>,
    #[serde(default, rename = "artworkUrl100")]
    pub artwork_url_100: Option<String>,
}

/// Normalized suggested track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: Option<String>,
    pub uri: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub preview_url: Option<String>,
    pub cover_url: Option<String>,
    pub valence: Option<f64>,
    pub energy: Option<f64>,
    pub mood: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Upgrade iTunes `100x100bb.jpg|png` artwork to 300x300
pub fn upgrade_artwork(url: &str) -> String {
    let lower = url.to_ascii_lowercase();
    for ext in ["jpg", "png"] {
        let suffix = format!("100x100bb.{}", ext);
        if lower.ends_with(&suffix) {
            let stem = &url[..url.len() - suffix.len()];
            let original_ext = &url[url.len() - ext.len()..];
            return format!("{}300x300bb.{}", stem, original_ext);
        }
    }
    url.to_string()
}

impl From<RawTrack> for Track {
    fn from(raw: RawTrack) -> Self {
        let cover_url = [
            raw.cover_url,
            raw.image_url,
            raw.thumbnail_url,
            raw.artwork_url,
            raw.artwork_url_camel,
            raw.artwork_url_100,
        ]
        .into_iter()
        .find_map(non_empty)
        .map(|url| upgrade_artwork(&url));

        Self {
            id: non_empty(raw.id),
            uri: non_empty(raw.uri),
            title: non_empty(raw.title),
            artist: non_empty(raw.artist),
            preview_url: non_empty(raw.preview_url),
            cover_url,
            valence: raw.valence,
            energy: raw.energy,
            mood: non_empty(raw.mood),
        }
    }
}

impl Track {
    /// Stable key for selection state
    ///
    /// Joins the non-empty `uri`, `id`, `title`, `artist` with `|`; when all
    /// are missing, falls back to cover/preview and the list position.
    pub fn selection_key(&self, index: usize) -> String {
        let parts: Vec<&str> = [&self.uri, &self.id, &self.title, &self.artist]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect();
        if !parts.is_empty() {
            return parts.join("|");
        }

        let mut fallback: Vec<String> = [&self.cover_url, &self.preview_url]
            .into_iter()
            .filter_map(|p| p.clone())
            .collect();
        fallback.push(index.to_string());
        fallback.join("|")
    }

    /// `Title - Artist` label for listings
    pub fn label(&self) -> String {
        let title = self.title.as_deref().unwrap_or("Untitled");
        match self.artist.as_deref() {
            Some(artist) => format!("{} - {}", title, artist),
            None => title.to_string(),
        }
    }
}

/// Ordered checked/unchecked state over a track list
#[derive(Debug, Clone, Default)]
pub struct TrackSelection {
    keys: Vec<String>,
}

impl TrackSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// Flip one key; returns the new state
    pub fn toggle(&mut self, key: &str) -> bool {
        if let Some(pos) = self.keys.iter().position(|k| k == key) {
            self.keys.remove(pos);
            false
        } else {
            self.keys.push(key.to_string());
            true
        }
    }

    pub fn select_all(&mut self, tracks: &[Track]) {
        self.keys = tracks
            .iter()
            .enumerate()
            .map(|(i, t)| t.selection_key(i))
            .collect();
        self.keys.dedup();
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Selected tracks in list order
    pub fn selected<'a>(&self, tracks: &'a [Track]) -> Vec<&'a Track> {
        tracks
            .iter()
            .enumerate()
            .filter(|(i, t)| self.is_selected(&t.selection_key(*i)))
            .map(|(_, t)| t)
            .collect()
    }
}
