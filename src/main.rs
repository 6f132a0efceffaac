use anyhow::Result;
use clap::{Parser, Subcommand};

mod analysis;
mod client;
mod config;
mod dataset;
mod models;

use crate::client::{collect_artist_tracks, collect_playlist_tracks, SpotifyClient};
use crate::config::load_config;
use crate::dataset::store::TrackStore;
use crate::models::TrackRecord;

const DEFAULT_TRACKS_CSV: &str = "data/raw/spotify_tracks.csv";
const DEFAULT_AUDIO_CSV: &str = "data/raw/dataset.csv";

#[derive(Parser)]
#[command(name = "hit-analyzer")]
#[command(about = "Collects Spotify track data and analyzes what makes a hit")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch tracks from the Spotify API and merge them into the dataset
    Collect {
        /// Comma-separated artist names to search for
        #[arg(long)]
        artists: Option<String>,

        /// Playlist ID to scrape
        #[arg(long)]
        playlist: Option<String>,

        /// Maximum tracks to fetch per artist or playlist
        #[arg(long, default_value_t = 300)]
        limit: usize,

        /// Path of the persisted track table
        #[arg(long, default_value = DEFAULT_TRACKS_CSV)]
        out: String,
    },

    /// k-nearest-neighbors classification of hit tracks
    Knn {
        #[arg(default_value = DEFAULT_TRACKS_CSV)]
        input: String,
    },

    /// Random-forest classification of the Low/Medium/High popularity label
    Forest {
        #[arg(default_value = DEFAULT_AUDIO_CSV)]
        input: String,
    },

    /// Hit rate by release month
    Monthly {
        #[arg(default_value = DEFAULT_TRACKS_CSV)]
        input: String,
    },

    /// Average popularity by genre
    Genres {
        #[arg(default_value = DEFAULT_AUDIO_CSV)]
        input: String,
    },

    /// Summer vs non-summer popularity for high-energy artists
    Summer {
        #[arg(default_value = DEFAULT_TRACKS_CSV)]
        input: String,

        /// Comma-separated artist names (defaults to the high-energy list)
        #[arg(long)]
        artists: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Collect {
            artists,
            playlist,
            limit,
            out,
        } => collect(artists, playlist, limit, &out),
        Command::Knn { input } => analysis::knn::run(&input),
        Command::Forest { input } => analysis::forest::run(&input),
        Command::Monthly { input } => analysis::stats::run_monthly(&input),
        Command::Genres { input } => analysis::stats::run_genres(&input),
        Command::Summer { input, artists } => {
            let artists = match artists {
                Some(list) => split_names(&list),
                None => analysis::stats::HIGH_ENERGY_ARTISTS
                    .iter()
                    .map(|a| a.to_string())
                    .collect(),
            };
            analysis::stats::run_summer(&input, &artists)
        }
    }
}

fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn collect(
    artists: Option<String>,
    playlist: Option<String>,
    limit: usize,
    out: &str,
) -> Result<()> {
    let artist_names = artists.as_deref().map(split_names).unwrap_or_default();

    if artist_names.is_empty() && playlist.is_none() {
        println!("Nothing to do. Provide --artists or --playlist.");
        return Ok(());
    }

    let config = load_config()?;
    let client = SpotifyClient::new(config);

    let mut new_rows: Vec<TrackRecord> = Vec::new();

    for name in &artist_names {
        println!("Searching tracks for artist '{name}' (limit {limit})...");
        let tracks = collect_artist_tracks(&client, name, limit)?;
        let before = new_rows.len();
        new_rows.extend(
            tracks
                .iter()
                .filter_map(|track| TrackRecord::from_api(track, "artist", name)),
        );
        println!(
            "  {} tracks fetched, {} with usable ids",
            tracks.len(),
            new_rows.len() - before
        );
    }

    if let Some(playlist_id) = &playlist {
        println!("Scraping playlist '{playlist_id}' (limit {limit})...");
        let tracks = collect_playlist_tracks(&client, playlist_id, limit)?;
        let before = new_rows.len();
        new_rows.extend(
            tracks
                .iter()
                .filter_map(|track| TrackRecord::from_api(track, "playlist", playlist_id)),
        );
        println!(
            "  {} tracks fetched, {} with usable ids",
            tracks.len(),
            new_rows.len() - before
        );
    }

    let store = TrackStore::new(out);
    let report = store.merge(new_rows)?;
    println!(
        "Saved {} rows -> {} (added {} new)",
        report.total, out, report.added
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_names_trims_and_drops_empties() {
        assert_eq!(
            split_names(" Dua Lipa , Bad Bunny ,,"),
            vec!["Dua Lipa".to_string(), "Bad Bunny".to_string()]
        );
        assert!(split_names("").is_empty());
    }
}
