use crate::config::Config;
use crate::models::{PlaylistItemsResponse, SearchResponse, TokenResponse, Track};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::cell::RefCell;
use ureq::Agent;
use urlencoding::encode;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

const SEARCH_PAGE_SIZE: u32 = 50;
const PLAYLIST_PAGE_SIZE: u32 = 100;

/// One page of tracks plus whether the API advertises a further page.
#[derive(Debug)]
pub struct Page {
    pub tracks: Vec<Track>,
    pub has_next: bool,
}

/// A paginated source of tracks. The client implements this against the
/// real API; the pagination loops below only ever talk to the trait.
#[cfg_attr(test, mockall::automock)]
pub trait TrackSource {
    /// Fetch one page of track-search results for an artist name
    fn search_page(&self, artist_name: &str, offset: u32) -> Result<Page>;

    /// Fetch one page of a playlist's tracks
    fn playlist_page(&self, playlist_id: &str, offset: u32) -> Result<Page>;
}

/// Accumulate tracks for an artist via offset pagination, stopping on an
/// empty page or once `limit` tracks have been gathered.
pub fn collect_artist_tracks(
    source: &dyn TrackSource,
    artist_name: &str,
    limit: usize,
) -> Result<Vec<Track>> {
    let mut tracks = Vec::new();
    let mut offset = 0;

    while tracks.len() < limit {
        let page = source.search_page(artist_name, offset)?;
        if page.tracks.is_empty() {
            break;
        }
        tracks.extend(page.tracks);
        offset += SEARCH_PAGE_SIZE;
    }

    tracks.truncate(limit);
    Ok(tracks)
}

/// Accumulate a playlist's tracks via offset pagination, stopping on an
/// empty page, when no further page is indicated, or at `limit`.
pub fn collect_playlist_tracks(
    source: &dyn TrackSource,
    playlist_id: &str,
    limit: usize,
) -> Result<Vec<Track>> {
    let mut tracks = Vec::new();
    let mut offset = 0;

    while tracks.len() < limit {
        let page = source.playlist_page(playlist_id, offset)?;
        if page.tracks.is_empty() {
            break;
        }
        tracks.extend(page.tracks);
        offset += PLAYLIST_PAGE_SIZE;
        if !page.has_next {
            break;
        }
    }

    tracks.truncate(limit);
    Ok(tracks)
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Spotify Web API client using the client-credentials flow
pub struct SpotifyClient {
    agent: Agent,
    config: Config,
    token: RefCell<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(config: Config) -> Self {
        SpotifyClient {
            agent: Agent::new(),
            config,
            token: RefCell::new(None),
        }
    }

    /// Return a valid bearer token, requesting a fresh one when the cached
    /// token is missing or within a minute of expiry.
    fn bearer_token(&self) -> Result<String> {
        {
            let cached = self.token.borrow();
            if let Some(token) = cached.as_ref() {
                if token.expires_at > Utc::now() + Duration::seconds(60) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let response: TokenResponse = self
            .agent
            .post(TOKEN_URL)
            .send_form(&[
                ("grant_type", "client_credentials"),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
            ])
            .map_err(|e| anyhow::anyhow!("Token request failed: {}", e))?
            .into_json()?;

        let access_token = response.access_token.clone();
        *self.token.borrow_mut() = Some(CachedToken {
            access_token: response.access_token,
            expires_at: Utc::now() + Duration::seconds(response.expires_in),
        });

        Ok(access_token)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let token = self.bearer_token()?;
        let response = self
            .agent
            .get(url)
            .set("Authorization", &format!("Bearer {token}"))
            .call()
            .map_err(|e| anyhow::anyhow!("HTTP request failed: {}", e))?;
        Ok(response.into_json()?)
    }
}

impl TrackSource for SpotifyClient {
    fn search_page(&self, artist_name: &str, offset: u32) -> Result<Page> {
        let url = format!(
            "{}/search?q={}&type=track&limit={}&offset={}",
            API_BASE,
            encode(&format!("artist:{artist_name}")),
            SEARCH_PAGE_SIZE,
            offset
        );

        let response: SearchResponse = self.get_json(&url)?;

        match response.tracks {
            Some(page) => Ok(Page {
                tracks: page.items,
                has_next: page.next.is_some(),
            }),
            None => Ok(Page {
                tracks: vec![],
                has_next: false,
            }),
        }
    }

    fn playlist_page(&self, playlist_id: &str, offset: u32) -> Result<Page> {
        let url = format!(
            "{}/playlists/{}/tracks?limit={}&offset={}",
            API_BASE,
            encode(playlist_id),
            PLAYLIST_PAGE_SIZE,
            offset
        );

        let response: PlaylistItemsResponse = self.get_json(&url)?;

        // Entries whose track object is null (removed tracks) are skipped
        let tracks: Vec<Track> = response
            .items
            .into_iter()
            .filter_map(|item| item.track)
            .collect();

        Ok(Page {
            tracks,
            has_next: response.next.is_some(),
        })
    }
}
