//! Provider URIs and web links for tracks

use crate::tracks::Track;

const SPOTIFY_KINDS: [&str; 4] = ["track", "album", "artist", "playlist"];

fn is_alnum_id(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric())
}

fn is_http(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Resolve a track reference to `spotify:track:<id>`
///
/// Accepts `spotify:track:<id>`, other three-part `spotify:` forms whose kind
/// is `track`, `*.spotify.com/.../track/<id>` URLs and bare alphanumeric ids
/// of at least ten characters. Anything else is not a provider URI.
pub fn normalize_provider_track_uri(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() >= 3 && parts[0].eq_ignore_ascii_case("spotify") {
        if parts[1].eq_ignore_ascii_case("track") && !parts[2].is_empty() {
            return Some(format!("spotify:track:{}", parts[2]));
        }
        return None;
    }

    if is_http(value) {
        let url = reqwest::Url::parse(value).ok()?;
        let host = url.host_str()?.to_ascii_lowercase();
        if !host.contains("spotify.com") {
            return None;
        }
        let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
        let idx = segments
            .iter()
            .position(|s| s.eq_ignore_ascii_case("track"))?;
        return segments
            .get(idx + 1)
            .map(|id| format!("spotify:track:{}", id));
    }

    if value.len() >= 10 && is_alnum_id(value) {
        return Some(format!("spotify:track:{}", value));
    }

    None
}

/// Provider URIs of the given tracks, deduplicated in first-seen order
///
/// Tracks without a recognizable URI are skipped.
pub fn collect_provider_uris<'a, I>(tracks: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Track>,
{
    let mut uris: Vec<String> = Vec::new();
    for track in tracks {
        let Some(uri) = track.uri.as_deref().and_then(normalize_provider_track_uri) else {
            continue;
        };
        if !uris.contains(&uri) {
            uris.push(uri);
        }
    }
    uris
}

fn spotify_web_link(value: &str) -> Option<String> {
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() != 3 || !parts[0].eq_ignore_ascii_case("spotify") {
        return None;
    }
    let kind = parts[1].to_ascii_lowercase();
    if !SPOTIFY_KINDS.contains(&kind.as_str()) || !is_alnum_id(parts[2]) {
        return None;
    }
    Some(format!("https://open.spotify.com/{}/{}", kind, parts[2]))
}

fn apple_music_link(id: &str) -> String {
    format!("https://music.apple.com/us/album/unknown/?i={}", id)
}

/// Clickable web link for a URI, if there is one
pub fn link_for_uri(raw: &str) -> Option<String> {
    let uri = raw.trim();
    if uri.is_empty() {
        return None;
    }
    if is_http(uri) {
        return Some(uri.to_string());
    }
    spotify_web_link(uri)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Spotify,
    Itunes,
    Web,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfo {
    pub url: String,
    pub kind: LinkKind,
}

/// Link and its kind from a URI, with provider + external id as last resort
pub fn link_info(
    uri: Option<&str>,
    provider: Option<&str>,
    external_id: Option<&str>,
) -> Option<LinkInfo> {
    let raw = uri.map(str::trim).unwrap_or_default();
    if !raw.is_empty() {
        if is_http(raw) {
            let lower = raw.to_ascii_lowercase();
            let kind = if lower.contains("open.spotify.com") {
                LinkKind::Spotify
            } else if lower.contains("itunes.apple.com") || lower.contains("music.apple.com") {
                LinkKind::Itunes
            } else {
                LinkKind::Web
            };
            return Some(LinkInfo {
                url: raw.to_string(),
                kind,
            });
        }

        if let Some(url) = spotify_web_link(raw) {
            return Some(LinkInfo {
                url,
                kind: LinkKind::Spotify,
            });
        }

        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() == 3
            && parts[0].eq_ignore_ascii_case("itunes")
            && parts[1].eq_ignore_ascii_case("track")
            && !parts[2].is_empty()
            && parts[2].chars().all(|c| c.is_ascii_digit())
        {
            return Some(LinkInfo {
                url: apple_music_link(parts[2]),
                kind: LinkKind::Itunes,
            });
        }
    }

    let provider = provider.unwrap_or_default().to_ascii_lowercase();
    let eid = external_id.map(str::trim).unwrap_or_default();
    if eid.is_empty() {
        return None;
    }
    match provider.as_str() {
        "spotify" => Some(LinkInfo {
            url: format!("https://open.spotify.com/track/{}", eid),
            kind: LinkKind::Spotify,
        }),
        "itunes" => Some(LinkInfo {
            url: apple_music_link(eid),
            kind: LinkKind::Itunes,
        }),
        _ => None,
    }
}

pub fn link_info_for_track(track: &Track) -> Option<LinkInfo> {
    link_info(track.uri.as_deref(), None, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(uri: &str) -> Track {
        Track {
            uri: Some(uri.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_accepted_forms() {
        assert_eq!(
            normalize_provider_track_uri("spotify:track:4uLU6hMCjMI75M1A2tKUQC").as_deref(),
            Some("spotify:track:4uLU6hMCjMI75M1A2tKUQC")
        );
        assert_eq!(
            normalize_provider_track_uri("SPOTIFY:Track:abc").as_deref(),
            Some("spotify:track:abc")
        );
        assert_eq!(
            normalize_provider_track_uri(
                "https://open.spotify.com/intl-es/track/4uLU6hMCjMI75M1A2tKUQC?si=x"
            )
            .as_deref(),
            Some("spotify:track:4uLU6hMCjMI75M1A2tKUQC")
        );
        assert_eq!(
            normalize_provider_track_uri(" 4uLU6hMCjMI75M1A2tKUQC ").as_deref(),
            Some("spotify:track:4uLU6hMCjMI75M1A2tKUQC")
        );
    }

    #[test]
    fn test_normalize_rejected_forms() {
        assert_eq!(normalize_provider_track_uri("spotify:album:abc"), None);
        assert_eq!(normalize_provider_track_uri("music:track:123"), None);
        assert_eq!(normalize_provider_track_uri("itunes:track:123456"), None);
        assert_eq!(normalize_provider_track_uri("short123"), None);
        assert_eq!(
            normalize_provider_track_uri("https://music.apple.com/track/123"),
            None
        );
        assert_eq!(
            normalize_provider_track_uri("https://open.spotify.com/album/xyz"),
            None
        );
        assert_eq!(normalize_provider_track_uri("   "), None);
    }

    #[test]
    fn test_collect_dedupes_and_excludes() {
        let tracks = vec![
            track("spotify:track:AAAAAAAAAA"),
            track("music:track:1"),
            track("https://open.spotify.com/track/AAAAAAAAAA"),
            track("BBBBBBBBBBBB"),
            Track::default(),
        ];
        assert_eq!(
            collect_provider_uris(&tracks),
            vec!["spotify:track:AAAAAAAAAA", "spotify:track:BBBBBBBBBBBB"]
        );
    }

    #[test]
    fn test_link_for_uri() {
        assert_eq!(
            link_for_uri("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M").as_deref(),
            Some("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M")
        );
        assert_eq!(
            link_for_uri("https://example.com/x").as_deref(),
            Some("https://example.com/x")
        );
        assert_eq!(link_for_uri("spotify:show:abc"), None);
        assert_eq!(link_for_uri("music:track:1"), None);
    }

    #[test]
    fn test_link_info_kinds() {
        let info = link_info(Some("https://music.apple.com/us/album/x"), None, None).unwrap();
        assert_eq!(info.kind, LinkKind::Itunes);

        let info = link_info(Some("itunes:track:12345"), None, None).unwrap();
        assert_eq!(info.url, "https://music.apple.com/us/album/unknown/?i=12345");

        let info = link_info(None, Some("Spotify"), Some("xyz")).unwrap();
        assert_eq!(info.url, "https://open.spotify.com/track/xyz");
        assert_eq!(info.kind, LinkKind::Spotify);

        assert!(link_info(Some("foo:bar"), Some("deezer"), Some("1")).is_none());
        assert_eq!(
            link_info_for_track(&track("https://example.com/t")).map(|i| i.kind),
            Some(LinkKind::Web)
        );
    }
}
