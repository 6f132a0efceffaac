use crate::analysis::metrics::{accuracy, confusion_matrix, print_confusion_matrix, recall};
use crate::analysis::split::train_test_split;
use crate::dataset::features;
use crate::dataset::store::TrackStore;
use anyhow::Result;

const K_VALUES: [usize; 3] = [3, 5, 11];
const TEST_FRACTION: f64 = 0.2;
const SPLIT_SEED: u64 = 42;

/// Per-feature standardization (zero mean, unit variance), fit on the
/// training split only since distance-based models leak otherwise.
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> StandardScaler {
        let n_features = rows.first().map_or(0, Vec::len);
        let n = rows.len().max(1) as f64;

        let mut means = vec![0.0; n_features];
        for row in rows {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value;
            }
        }
        for mean in &mut means {
            *mean /= n;
        }

        let mut stds = vec![0.0; n_features];
        for row in rows {
            for (std, (value, mean)) in stds.iter_mut().zip(row.iter().zip(&means)) {
                *std += (value - mean) * (value - mean);
            }
        }
        for std in &mut stds {
            *std = (*std / n).sqrt();
            // Constant features scale by 1 so they drop out of distances
            if *std == 0.0 {
                *std = 1.0;
            }
        }

        StandardScaler { means, stds }
    }

    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(value, (mean, std))| (value - mean) / std)
            .collect()
    }

    pub fn transform_all(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|row| self.transform(row)).collect()
    }
}

/// k-nearest-neighbors classifier with Euclidean distance and majority
/// vote; vote ties go to the class of the nearest neighbor involved.
pub struct KnnClassifier {
    k: usize,
    rows: Vec<Vec<f64>>,
    labels: Vec<usize>,
}

impl KnnClassifier {
    pub fn fit(k: usize, rows: Vec<Vec<f64>>, labels: Vec<usize>) -> KnnClassifier {
        KnnClassifier { k, rows, labels }
    }

    pub fn predict(&self, row: &[f64]) -> usize {
        let mut neighbors: Vec<(f64, usize)> = self
            .rows
            .iter()
            .zip(&self.labels)
            .map(|(train_row, &label)| (squared_distance(row, train_row), label))
            .collect();
        neighbors.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        neighbors.truncate(self.k);

        let mut votes: Vec<usize> = Vec::new();
        for &(_, label) in &neighbors {
            if votes.len() <= label {
                votes.resize(label + 1, 0);
            }
            votes[label] += 1;
        }
        let top = votes.iter().max().copied().unwrap_or(0);

        neighbors
            .iter()
            .map(|&(_, label)| label)
            .find(|&label| votes[label] == top)
            .unwrap_or(0)
    }

    pub fn predict_all(&self, rows: &[Vec<f64>]) -> Vec<usize> {
        rows.iter().map(|row| self.predict(row)).collect()
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Feature vector for hit classification: duration, explicit flag, and a
/// one-hot release month (all zeros when the month is unknown).
fn hit_features(duration_ms: u64, explicit: bool, month: Option<u32>) -> Vec<f64> {
    let mut row = vec![duration_ms as f64, f64::from(u8::from(explicit))];
    for month_number in 1..=12 {
        row.push(f64::from(u8::from(month == Some(month_number))));
    }
    row
}

/// The most common training label; ties go to the lower class index
fn majority_class(labels: &[usize]) -> usize {
    let mut counts: Vec<usize> = Vec::new();
    for &label in labels {
        if counts.len() <= label {
            counts.resize(label + 1, 0);
        }
        counts[label] += 1;
    }
    let top = counts.iter().max().copied().unwrap_or(0);
    counts.iter().position(|&c| c == top).unwrap_or(0)
}

/// Classify hits with kNN over duration, explicitness and release month
pub fn run(input: &str) -> Result<()> {
    anyhow::ensure!(
        std::path::Path::new(input).exists(),
        "Dataset '{}' not found. Run `collect` first.",
        input
    );

    let records = TrackStore::new(input).load()?;

    // Rows need a popularity (for the label) and a duration (for the model)
    let usable: Vec<(Vec<f64>, f64)> = records
        .iter()
        .filter_map(|record| {
            let popularity = record.popularity? as f64;
            let duration = record.duration_ms?;
            let row = hit_features(
                duration,
                record.explicit.unwrap_or(false),
                features::release_month(record),
            );
            Some((row, popularity))
        })
        .collect();

    println!(
        "Loaded {} rows ({} usable) from {}",
        records.len(),
        usable.len(),
        input
    );

    let popularities: Vec<f64> = usable.iter().map(|(_, p)| *p).collect();
    let threshold = features::hit_threshold(&popularities)
        .ok_or_else(|| anyhow::anyhow!("Dataset has no popularity values"))?;
    println!(
        "Hit threshold (top 25% of popularity): {:.1}",
        threshold
    );

    let rows: Vec<Vec<f64>> = usable.iter().map(|(row, _)| row.clone()).collect();
    let labels: Vec<usize> = popularities
        .iter()
        .map(|&p| usize::from(features::is_hit(p, threshold)))
        .collect();

    let hits = labels.iter().sum::<usize>();
    anyhow::ensure!(
        hits > 0 && hits < labels.len(),
        "Need both hits and non-hits to train; got {}/{} hits",
        hits,
        labels.len()
    );

    let (train_idx, test_idx) = train_test_split(&labels, TEST_FRACTION, SPLIT_SEED);
    anyhow::ensure!(!test_idx.is_empty(), "Dataset too small for a test split");

    let train_rows: Vec<Vec<f64>> = train_idx.iter().map(|&i| rows[i].clone()).collect();
    let train_labels: Vec<usize> = train_idx.iter().map(|&i| labels[i]).collect();
    let test_rows: Vec<Vec<f64>> = test_idx.iter().map(|&i| rows[i].clone()).collect();
    let test_labels: Vec<usize> = test_idx.iter().map(|&i| labels[i]).collect();

    let scaler = StandardScaler::fit(&train_rows);
    let train_scaled = scaler.transform_all(&train_rows);
    let test_scaled = scaler.transform_all(&test_rows);

    let majority = majority_class(&train_labels);
    let baseline = test_labels.iter().filter(|&&l| l == majority).count() as f64
        / test_labels.len() as f64;

    println!("\n=== kNN HIT CLASSIFICATION ===");
    println!("Train: {} rows | Test: {} rows", train_idx.len(), test_idx.len());
    println!("Baseline accuracy (majority class): {baseline:.3}");

    for k in K_VALUES {
        let model = KnnClassifier::fit(k, train_scaled.clone(), train_labels.clone());
        let predicted = model.predict_all(&test_scaled);

        println!("\nk = {k}");
        println!("Accuracy: {:.3}", accuracy(&test_labels, &predicted));
        println!("Hit recall: {:.3}", recall(&test_labels, &predicted, 1));
        print_confusion_matrix(&confusion_matrix(&test_labels, &predicted, 2), &["miss", "hit"]);
    }

    Ok(())
}
