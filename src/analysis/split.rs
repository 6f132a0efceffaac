use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Stratified train/test split over row indices. Each class contributes
/// `test_fraction` of its rows to the test set, so the class ratio stays
/// consistent across the split. The shuffle is seeded for repeatable runs.
pub fn train_test_split(
    labels: &[usize],
    test_fraction: f64,
    seed: u64,
) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (index, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(index);
    }

    let mut train = Vec::new();
    let mut test = Vec::new();

    for (_, mut indices) in by_class {
        indices.shuffle(&mut rng);

        let mut n_test = (indices.len() as f64 * test_fraction).round() as usize;
        // Never let a class vanish from the training side
        if n_test == indices.len() && n_test > 0 {
            n_test -= 1;
        }

        test.extend(indices.drain(..n_test));
        train.extend(indices);
    }

    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_preserves_class_ratio() {
        // 80 of class 0, 20 of class 1
        let labels: Vec<usize> = (0..100).map(|i| usize::from(i < 20)).collect();
        let (train, test) = train_test_split(&labels, 0.2, 42);

        assert_eq!(train.len(), 80);
        assert_eq!(test.len(), 20);

        let test_hits = test.iter().filter(|&&i| labels[i] == 1).count();
        assert_eq!(test_hits, 4);
    }

    #[test]
    fn split_is_disjoint_and_covers_everything() {
        let labels: Vec<usize> = (0..50).map(|i| i % 3).collect();
        let (train, test) = train_test_split(&labels, 0.2, 42);

        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn same_seed_gives_same_split() {
        let labels: Vec<usize> = (0..40).map(|i| i % 2).collect();
        assert_eq!(
            train_test_split(&labels, 0.2, 42),
            train_test_split(&labels, 0.2, 42)
        );
    }

    #[test]
    fn tiny_class_keeps_a_training_member() {
        let labels = vec![0, 0, 0, 1];
        let (train, _) = train_test_split(&labels, 0.5, 42);
        assert!(train.iter().any(|&i| labels[i] == 1));
    }
}
