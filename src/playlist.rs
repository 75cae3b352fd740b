use serde::Deserialize;
use url::Url;

/// Playlist ID prefixes YouTube hands out (regular, uploads, favorites,
/// liked-videos, radio/mix playlists)
const KNOWN_ID_PREFIXES: [&str; 5] = ["PL", "UU", "FL", "OL", "RD"];

/// Base URL for the YouTube Data API, overridable via REST_API_ADDRESS
pub fn default_api_base() -> String {
    std::env::var("REST_API_ADDRESS").unwrap_or_else(|_| "https://www.googleapis.com".to_string())
}

/// Return the playlist ID from a playlist URL, or assume the input is an ID.
///
/// URLs must carry the ID in their `list` query parameter. Bare strings are
/// passed through as-is; the API surfaces any error for invalid IDs.
pub fn extract_playlist_id(input: &str) -> Result<String, Box<dyn std::error::Error>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("Empty playlist id/url".into());
    }

    if let Ok(parsed) = Url::parse(trimmed) {
        if matches!(parsed.scheme(), "http" | "https") {
            return match parsed.query_pairs().find(|(key, _)| key == "list") {
                Some((_, id)) if !id.is_empty() => Ok(id.into_owned()),
                _ => Err(format!("Playlist URL has no 'list' parameter: {}", trimmed).into()),
            };
        }
    }

    Ok(trimmed.to_string())
}

/// Whether a bare string looks like a playlist ID with a known prefix
pub fn has_known_prefix(id: &str) -> bool {
    KNOWN_ID_PREFIXES.iter().any(|p| id.starts_with(p))
        && id.len() > 2
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemsPage {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentDetails {
    video_id: Option<String>,
}

/// Client for the playlistItems endpoint of the YouTube Data API v3
pub struct PlaylistClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl PlaylistClient {
    pub fn new(access_token: String) -> Self {
        Self::with_base_url(default_api_base(), access_token)
    }

    pub fn with_base_url(base_url: String, access_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            access_token,
        }
    }

    /// Collect every video ID in the playlist, in playlist order.
    ///
    /// Follows `nextPageToken` until the last page. Items without a video ID
    /// (deleted or private videos) are skipped.
    pub async fn list_video_ids(
        &self,
        playlist_id: &str,
    ) -> Result<Vec<String>, Box<dyn std::error::Error>> {
        let url = format!("{}/youtube/v3/playlistItems", self.base_url);
        let mut video_ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("part", "contentDetails".to_string()),
                ("playlistId", playlist_id.to_string()),
                ("maxResults", "50".to_string()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let response = self
                .http
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&params)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(format!(
                    "Failed to list items of playlist '{}' (status {}): {}",
                    playlist_id, status, body
                )
                .into());
            }

            let page: PlaylistItemsPage = response.json().await?;
            for item in page.items {
                if let Some(id) = item.content_details.and_then(|d| d.video_id) {
                    video_ids.push(id);
                }
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(video_ids)
    }
}
