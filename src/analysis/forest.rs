use crate::analysis::metrics::{
    accuracy, classification_report, confusion_matrix, print_classification_report,
    print_confusion_matrix,
};
use crate::analysis::split::train_test_split;
use crate::dataset::features::{popularity_class, popularity_class_bounds, PopularityClass};
use crate::dataset::store::load_audio_records;
use crate::models::AudioRecord;
use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const N_TREES: usize = 200;
const MIN_SAMPLES_SPLIT: usize = 2;
const TEST_FRACTION: f64 = 0.2;
const SEED: u64 = 42;

enum Node {
    Leaf {
        class: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// A gini decision tree grown until its leaves are pure or too small to
/// split, considering a random feature subset at every node.
pub struct DecisionTree {
    root: Node,
}

impl DecisionTree {
    pub fn fit(
        rows: &[Vec<f64>],
        labels: &[usize],
        indices: Vec<usize>,
        n_classes: usize,
        max_features: usize,
        rng: &mut StdRng,
    ) -> DecisionTree {
        DecisionTree {
            root: build_node(rows, labels, indices, n_classes, max_features, rng),
        }
    }

    pub fn predict(&self, row: &[f64]) -> usize {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { class } => return *class,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

fn class_counts(labels: &[usize], indices: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &index in indices {
        counts[labels[index]] += 1;
    }
    counts
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let sum_of_squares: f64 = counts
        .iter()
        .map(|&count| {
            let p = count as f64 / total as f64;
            p * p
        })
        .sum();
    1.0 - sum_of_squares
}

fn majority(counts: &[usize]) -> usize {
    let top = counts.iter().max().copied().unwrap_or(0);
    counts.iter().position(|&c| c == top).unwrap_or(0)
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

/// Scan one feature for the threshold with the lowest weighted gini,
/// using a single sorted pass with running class counts.
fn best_split_for_feature(
    rows: &[Vec<f64>],
    labels: &[usize],
    indices: &[usize],
    feature: usize,
    n_classes: usize,
) -> Option<BestSplit> {
    let mut pairs: Vec<(f64, usize)> = indices
        .iter()
        .map(|&index| (rows[index][feature], labels[index]))
        .collect();
    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let total = pairs.len();
    let mut right_counts = vec![0usize; n_classes];
    for &(_, label) in &pairs {
        right_counts[label] += 1;
    }
    let mut left_counts = vec![0usize; n_classes];

    let mut best: Option<BestSplit> = None;

    for split_at in 1..total {
        let (value, label) = pairs[split_at - 1];
        left_counts[label] += 1;
        right_counts[label] -= 1;

        let next_value = pairs[split_at].0;
        if next_value <= value {
            // No threshold separates equal values
            continue;
        }

        let weighted = (split_at as f64 * gini(&left_counts, split_at)
            + (total - split_at) as f64 * gini(&right_counts, total - split_at))
            / total as f64;

        if best.as_ref().is_none_or(|b| weighted < b.impurity) {
            best = Some(BestSplit {
                feature,
                threshold: (value + next_value) / 2.0,
                impurity: weighted,
            });
        }
    }

    best
}

fn build_node(
    rows: &[Vec<f64>],
    labels: &[usize],
    indices: Vec<usize>,
    n_classes: usize,
    max_features: usize,
    rng: &mut StdRng,
) -> Node {
    let counts = class_counts(labels, &indices, n_classes);
    let impurity = gini(&counts, indices.len());

    if indices.len() < MIN_SAMPLES_SPLIT || impurity == 0.0 {
        return Node::Leaf {
            class: majority(&counts),
        };
    }

    let n_features = rows[indices[0]].len();
    let candidate_features =
        rand::seq::index::sample(rng, n_features, max_features.min(n_features));

    let best = candidate_features
        .into_iter()
        .filter_map(|feature| best_split_for_feature(rows, labels, &indices, feature, n_classes))
        .min_by(|a, b| a.impurity.partial_cmp(&b.impurity).unwrap_or(std::cmp::Ordering::Equal));

    let Some(split) = best else {
        // Identical feature values, nothing left to separate on
        return Node::Leaf {
            class: majority(&counts),
        };
    };

    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&index| rows[index][split.feature] <= split.threshold);

    Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(build_node(
            rows,
            labels,
            left_indices,
            n_classes,
            max_features,
            rng,
        )),
        right: Box::new(build_node(
            rows,
            labels,
            right_indices,
            n_classes,
            max_features,
            rng,
        )),
    }
}

/// Random forest: bootstrap-sampled gini trees with √d feature subsampling
/// and majority voting. Seeded, so runs are repeatable.
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_classes: usize,
}

impl RandomForest {
    pub fn fit(
        rows: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
        n_trees: usize,
        seed: u64,
    ) -> RandomForest {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = rows.len();
        let n_features = rows.first().map_or(0, Vec::len);
        let max_features = ((n_features as f64).sqrt().round() as usize).max(1);

        let trees = (0..n_trees)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::fit(rows, labels, sample, n_classes, max_features, &mut rng)
            })
            .collect();

        RandomForest { trees, n_classes }
    }

    pub fn predict(&self, row: &[f64]) -> usize {
        let mut votes = vec![0usize; self.n_classes];
        for tree in &self.trees {
            votes[tree.predict(row)] += 1;
        }
        majority(&votes)
    }

    pub fn predict_all(&self, rows: &[Vec<f64>]) -> Vec<usize> {
        rows.iter().map(|row| self.predict(row)).collect()
    }
}

/// Classify the three-way popularity label from audio features
pub fn run(input: &str) -> Result<()> {
    let records = load_audio_records(input)?;

    let usable: Vec<(Vec<f64>, f64)> = records
        .iter()
        .filter_map(|record: &AudioRecord| {
            Some((record.feature_vector()?, record.popularity?))
        })
        .collect();

    println!(
        "Loaded {} rows ({} with complete audio features) from {}",
        records.len(),
        usable.len(),
        input
    );

    let popularities: Vec<f64> = usable.iter().map(|(_, p)| *p).collect();
    let bounds = popularity_class_bounds(&popularities)
        .ok_or_else(|| anyhow::anyhow!("Dataset has no popularity values"))?;
    println!(
        "Popularity class bounds: Low <= {:.1} < Medium <= {:.1} < High",
        bounds.0, bounds.1
    );

    let rows: Vec<Vec<f64>> = usable.iter().map(|(row, _)| row.clone()).collect();
    let labels: Vec<usize> = popularities
        .iter()
        .map(|&p| popularity_class(p, bounds).index())
        .collect();

    let (train_idx, test_idx) = train_test_split(&labels, TEST_FRACTION, SEED);
    anyhow::ensure!(!test_idx.is_empty(), "Dataset too small for a test split");

    let train_rows: Vec<Vec<f64>> = train_idx.iter().map(|&i| rows[i].clone()).collect();
    let train_labels: Vec<usize> = train_idx.iter().map(|&i| labels[i]).collect();
    let test_rows: Vec<Vec<f64>> = test_idx.iter().map(|&i| rows[i].clone()).collect();
    let test_labels: Vec<usize> = test_idx.iter().map(|&i| labels[i]).collect();

    println!(
        "Training a {}-tree forest on {} rows ({} features)...",
        N_TREES,
        train_rows.len(),
        AudioRecord::FEATURE_NAMES.len()
    );
    let forest = RandomForest::fit(&train_rows, &train_labels, 3, N_TREES, SEED);
    let predicted = forest.predict_all(&test_rows);

    println!("\n=== RANDOM FOREST POPULARITY CLASSIFICATION ===");
    println!("Accuracy: {:.3}", accuracy(&test_labels, &predicted));

    println!();
    print_classification_report(&classification_report(
        &test_labels,
        &predicted,
        &PopularityClass::LABELS,
    ));

    println!();
    print_confusion_matrix(
        &confusion_matrix(&test_labels, &predicted, 3),
        &PopularityClass::LABELS,
    );

    Ok(())
}
