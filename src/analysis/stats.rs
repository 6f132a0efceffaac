use crate::dataset::features::{self, quantile};
use crate::dataset::store::{load_audio_records, TrackStore};
use crate::models::TrackRecord;
use anyhow::Result;
use std::collections::BTreeMap;

/// The high-energy artists singled out for the summer comparison
pub const HIGH_ENERGY_ARTISTS: [&str; 7] = [
    "Martin Garrix",
    "Major Lazer",
    "Dua Lipa",
    "Doja Cat",
    "Bad Bunny",
    "KAROL G",
    "Travis Scott",
];

const BAR_WIDTH: usize = 40;

/// Hit rate per release month: (month, hit rate in percent, row count).
/// The threshold comes from every row with a popularity; only rows that
/// also carry a release month enter the grouping.
pub fn monthly_hit_rates(records: &[TrackRecord]) -> Vec<(u32, f64, usize)> {
    let popularities: Vec<f64> = records
        .iter()
        .filter_map(|r| r.popularity.map(f64::from))
        .collect();
    let Some(threshold) = features::hit_threshold(&popularities) else {
        return vec![];
    };

    let mut by_month: BTreeMap<u32, (usize, usize)> = BTreeMap::new();
    for record in records {
        let Some(popularity) = record.popularity else {
            continue;
        };
        let Some(month) = features::release_month(record) else {
            continue;
        };
        let entry = by_month.entry(month).or_insert((0, 0));
        entry.1 += 1;
        if features::is_hit(f64::from(popularity), threshold) {
            entry.0 += 1;
        }
    }

    by_month
        .into_iter()
        .map(|(month, (hits, total))| (month, 100.0 * hits as f64 / total as f64, total))
        .collect()
}

/// Mean popularity per genre, ascending
pub fn genre_means(records: &[crate::models::AudioRecord]) -> Vec<(String, f64, usize)> {
    let mut by_genre: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for record in records {
        let (Some(genre), Some(popularity)) = (&record.track_genre, record.popularity) else {
            continue;
        };
        let entry = by_genre.entry(genre.clone()).or_insert((0.0, 0));
        entry.0 += popularity;
        entry.1 += 1;
    }

    let mut means: Vec<(String, f64, usize)> = by_genre
        .into_iter()
        .map(|(genre, (sum, count))| (genre, sum / count as f64, count))
        .collect();
    means.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    means
}

/// The five boxplot statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiveNumberSummary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

pub fn five_number_summary(values: &[f64]) -> Option<FiveNumberSummary> {
    Some(FiveNumberSummary {
        min: quantile(values, 0.0)?,
        q1: quantile(values, 0.25)?,
        median: quantile(values, 0.5)?,
        q3: quantile(values, 0.75)?,
        max: quantile(values, 1.0)?,
    })
}

fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 {
        return String::new();
    }
    let filled = ((value / max) * BAR_WIDTH as f64).round() as usize;
    "#".repeat(filled.min(BAR_WIDTH))
}

fn load_tracks(input: &str) -> Result<Vec<TrackRecord>> {
    anyhow::ensure!(
        std::path::Path::new(input).exists(),
        "Dataset '{}' not found. Run `collect` first.",
        input
    );
    TrackStore::new(input).load()
}

/// Hit-rate-by-release-month table (the monthly bar chart, as text)
pub fn run_monthly(input: &str) -> Result<()> {
    let records = load_tracks(input)?;
    let rates = monthly_hit_rates(&records);
    anyhow::ensure!(!rates.is_empty(), "No rows with popularity and release month");

    let max_rate = rates.iter().map(|&(_, rate, _)| rate).fold(0.0, f64::max);

    println!("=== MONTHLY HIT RATE (top 25% of popularity) ===");
    println!("{:>5} {:>8} {:>6}", "month", "hit rate", "rows");
    for month in 1..=12 {
        match rates.iter().find(|&&(m, _, _)| m == month) {
            Some(&(_, rate, total)) => {
                println!(
                    "{:>5} {:>7.1}% {:>6}  {}",
                    month,
                    rate,
                    total,
                    bar(rate, max_rate)
                );
            }
            None => println!("{:>5} {:>8} {:>6}", month, "-", 0),
        }
    }

    Ok(())
}

/// Average-popularity-by-genre table, ascending
pub fn run_genres(input: &str) -> Result<()> {
    let records = load_audio_records(input)?;
    let means = genre_means(&records);
    anyhow::ensure!(!means.is_empty(), "No rows with genre and popularity");

    let max_mean = means.last().map_or(0.0, |&(_, mean, _)| mean);
    let name_width = means.iter().map(|(g, _, _)| g.len()).max().unwrap_or(5);

    println!("=== AVERAGE POPULARITY BY GENRE ===");
    for (genre, mean, count) in &means {
        println!(
            "{:>name_width$} {:>6.1} ({:>4} tracks)  {}",
            genre,
            mean,
            count,
            bar(*mean, max_mean)
        );
    }

    Ok(())
}

/// Summer vs non-summer popularity summaries for the high-energy artists
pub fn run_summer(input: &str, artists: &[String]) -> Result<()> {
    let records = load_tracks(input)?;

    let mut summer = Vec::new();
    let mut non_summer = Vec::new();

    for record in &records {
        let Some(name) = &record.artist_name else {
            continue;
        };
        if !artists.iter().any(|a| a == name) {
            continue;
        }
        let (Some(popularity), Some(month)) = (record.popularity, features::release_month(record))
        else {
            continue;
        };
        if features::is_summer(month) {
            summer.push(f64::from(popularity));
        } else {
            non_summer.push(f64::from(popularity));
        }
    }

    println!("=== SUMMER VS NON-SUMMER POPULARITY ===");
    println!("Artists: {}", artists.join(", "));

    for (label, values) in [("Summer releases", &summer), ("Non-summer releases", &non_summer)] {
        match five_number_summary(values) {
            Some(summary) => println!(
                "{:>20}: n={:<4} min={:.0} q1={:.1} median={:.1} q3={:.1} max={:.0}",
                label,
                values.len(),
                summary.min,
                summary.q1,
                summary.median,
                summary.q3,
                summary.max
            ),
            None => println!("{label:>20}: no matching tracks"),
        }
    }

    Ok(())
}
