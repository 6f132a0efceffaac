use serde::{Deserialize, Serialize};

/// One row of the persisted track dataset. Field order defines the CSV
/// column order, so new fields go at the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub track_id: String,
    pub track_name: Option<String>,
    pub artist_id: Option<String>,
    pub artist_name: Option<String>,
    pub album_id: Option<String>,
    pub album_name: Option<String>,
    pub album_release_date: Option<String>,
    pub release_date_precision: Option<String>,
    pub popularity: Option<u32>,
    pub duration_ms: Option<u64>,
    pub explicit: Option<bool>,
    pub source: Option<String>,
    pub source_id: Option<String>,
}

impl TrackRecord {
    /// Flatten an API track into a dataset row. Tracks without an id
    /// (local files, removed tracks) cannot be deduplicated and are dropped.
    pub fn from_api(track: &Track, source: &str, source_id: &str) -> Option<TrackRecord> {
        let track_id = track.id.clone()?;
        let first_artist = track.artists.first();

        Some(TrackRecord {
            track_id,
            track_name: track.name.clone(),
            artist_id: first_artist.and_then(|a| a.id.clone()),
            artist_name: first_artist.and_then(|a| a.name.clone()),
            album_id: track.album.as_ref().and_then(|a| a.id.clone()),
            album_name: track.album.as_ref().and_then(|a| a.name.clone()),
            album_release_date: track.album.as_ref().and_then(|a| a.release_date.clone()),
            release_date_precision: track
                .album
                .as_ref()
                .and_then(|a| a.release_date_precision.clone()),
            popularity: track.popularity,
            duration_ms: track.duration_ms,
            explicit: track.explicit,
            source: Some(source.to_string()),
            source_id: Some(source_id.to_string()),
        })
    }
}

/// One row of the audio-feature dataset consumed by the `forest` and
/// `genres` analyses. Extra CSV columns are ignored on load.
#[derive(Debug, Clone, Deserialize)]
pub struct AudioRecord {
    pub popularity: Option<f64>,
    pub track_genre: Option<String>,
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub speechiness: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub valence: Option<f64>,
    pub tempo: Option<f64>,
}

impl AudioRecord {
    pub const FEATURE_NAMES: [&'static str; 8] = [
        "danceability",
        "energy",
        "speechiness",
        "acousticness",
        "instrumentalness",
        "liveness",
        "valence",
        "tempo",
    ];

    /// All eight audio features, or None if any is missing.
    pub fn feature_vector(&self) -> Option<Vec<f64>> {
        Some(vec![
            self.danceability?,
            self.energy?,
            self.speechiness?,
            self.acousticness?,
            self.instrumentalness?,
            self.liveness?,
            self.valence?,
            self.tempo?,
        ])
    }
}

/// Response structure for the client-credentials token request
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

/// Response structure for the track search endpoint
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub tracks: Option<TrackPage>,
}

#[derive(Debug, Deserialize)]
pub struct TrackPage {
    pub items: Vec<Track>,
    pub next: Option<String>,
}

/// Response structure for the playlist items endpoint
#[derive(Debug, Deserialize)]
pub struct PlaylistItemsResponse {
    pub items: Vec<PlaylistItem>,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<Track>,
}

/// A track object as returned by the API. Most fields are optional because
/// local and unavailable tracks come back with nulls.
#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    pub album: Option<AlbumRef>,
    pub popularity: Option<u32>,
    pub duration_ms: Option<u64>,
    pub explicit: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumRef {
    pub id: Option<String>,
    pub name: Option<String>,
    pub release_date: Option<String>,
    pub release_date_precision: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_track(id: Option<&str>) -> Track {
        Track {
            id: id.map(str::to_string),
            name: Some("Levitating".to_string()),
            artists: vec![ArtistRef {
                id: Some("artist1".to_string()),
                name: Some("Dua Lipa".to_string()),
            }],
            album: Some(AlbumRef {
                id: Some("album1".to_string()),
                name: Some("Future Nostalgia".to_string()),
                release_date: Some("2020-03-27".to_string()),
                release_date_precision: Some("day".to_string()),
            }),
            popularity: Some(88),
            duration_ms: Some(203_064),
            explicit: Some(false),
        }
    }

    #[test]
    fn flattens_first_artist_and_album_fields() {
        let record = TrackRecord::from_api(&api_track(Some("t1")), "artist", "Dua Lipa").unwrap();

        assert_eq!(record.track_id, "t1");
        assert_eq!(record.artist_name.as_deref(), Some("Dua Lipa"));
        assert_eq!(record.album_release_date.as_deref(), Some("2020-03-27"));
        assert_eq!(record.release_date_precision.as_deref(), Some("day"));
        assert_eq!(record.popularity, Some(88));
        assert_eq!(record.source.as_deref(), Some("artist"));
        assert_eq!(record.source_id.as_deref(), Some("Dua Lipa"));
    }

    #[test]
    fn drops_tracks_without_an_id() {
        assert!(TrackRecord::from_api(&api_track(None), "artist", "Dua Lipa").is_none());
    }

    #[test]
    fn feature_vector_requires_every_audio_feature() {
        let mut record = AudioRecord {
            popularity: Some(60.0),
            track_genre: Some("pop".to_string()),
            danceability: Some(0.8),
            energy: Some(0.7),
            speechiness: Some(0.05),
            acousticness: Some(0.1),
            instrumentalness: Some(0.0),
            liveness: Some(0.12),
            valence: Some(0.9),
            tempo: Some(118.0),
        };
        assert_eq!(record.feature_vector().unwrap().len(), 8);

        record.tempo = None;
        assert!(record.feature_vector().is_none());
    }
}
