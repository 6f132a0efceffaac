/// Fraction of predictions matching the actual labels
pub fn accuracy(actual: &[usize], predicted: &[usize]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let correct = actual
        .iter()
        .zip(predicted)
        .filter(|(a, p)| a == p)
        .count();
    correct as f64 / actual.len() as f64
}

/// Recall for one class: of the rows actually in `class`, the fraction
/// predicted as `class`. Zero when the class never occurs.
pub fn recall(actual: &[usize], predicted: &[usize], class: usize) -> f64 {
    let relevant = actual.iter().filter(|&&a| a == class).count();
    if relevant == 0 {
        return 0.0;
    }
    let found = actual
        .iter()
        .zip(predicted)
        .filter(|&(&a, &p)| a == class && p == class)
        .count();
    found as f64 / relevant as f64
}

/// Precision for one class: of the rows predicted as `class`, the fraction
/// actually in `class`. Zero when the class is never predicted.
pub fn precision(actual: &[usize], predicted: &[usize], class: usize) -> f64 {
    let predicted_as = predicted.iter().filter(|&&p| p == class).count();
    if predicted_as == 0 {
        return 0.0;
    }
    let correct = actual
        .iter()
        .zip(predicted)
        .filter(|&(&a, &p)| a == class && p == class)
        .count();
    correct as f64 / predicted_as as f64
}

/// Confusion matrix with actual classes as rows and predicted as columns
pub fn confusion_matrix(actual: &[usize], predicted: &[usize], n_classes: usize) -> Vec<Vec<usize>> {
    let mut matrix = vec![vec![0usize; n_classes]; n_classes];
    for (&a, &p) in actual.iter().zip(predicted) {
        matrix[a][p] += 1;
    }
    matrix
}

/// Per-class precision/recall/F1 plus support
#[derive(Debug, Clone)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

pub fn classification_report(
    actual: &[usize],
    predicted: &[usize],
    labels: &[&str],
) -> Vec<ClassMetrics> {
    labels
        .iter()
        .enumerate()
        .map(|(class, label)| {
            let p = precision(actual, predicted, class);
            let r = recall(actual, predicted, class);
            let f1 = if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 };
            ClassMetrics {
                label: label.to_string(),
                precision: p,
                recall: r,
                f1,
                support: actual.iter().filter(|&&a| a == class).count(),
            }
        })
        .collect()
}

/// Print a confusion matrix with row/column labels
pub fn print_confusion_matrix(matrix: &[Vec<usize>], labels: &[&str]) {
    let width = labels.iter().map(|l| l.len()).max().unwrap_or(6).max(6);

    print!("{:>width$} |", "actual");
    for label in labels {
        print!(" {label:>width$}");
    }
    println!(" (predicted)");

    for (row, label) in matrix.iter().zip(labels) {
        print!("{label:>width$} |");
        for count in row {
            print!(" {count:>width$}");
        }
        println!();
    }
}

/// Print a per-class report in the familiar precision/recall/f1 layout
pub fn print_classification_report(report: &[ClassMetrics]) {
    println!(
        "{:>10} {:>10} {:>10} {:>10} {:>10}",
        "", "precision", "recall", "f1-score", "support"
    );
    for metrics in report {
        println!(
            "{:>10} {:>10.2} {:>10.2} {:>10.2} {:>10}",
            metrics.label, metrics.precision, metrics.recall, metrics.f1, metrics.support
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn accuracy_counts_matching_predictions() {
        let actual = [0, 1, 1, 0];
        let predicted = [0, 1, 0, 0];
        assert_relative_eq!(accuracy(&actual, &predicted), 0.75);
    }

    #[test]
    fn recall_and_precision_for_the_positive_class() {
        // two actual hits, one found; two predicted hits, one correct
        let actual = [1, 1, 0, 0];
        let predicted = [1, 0, 1, 0];
        assert_relative_eq!(recall(&actual, &predicted, 1), 0.5);
        assert_relative_eq!(precision(&actual, &predicted, 1), 0.5);
    }

    #[test]
    fn recall_of_an_absent_class_is_zero() {
        assert_relative_eq!(recall(&[0, 0], &[0, 0], 1), 0.0);
    }

    #[test]
    fn confusion_matrix_rows_are_actual_classes() {
        let actual = [0, 0, 1, 2, 2];
        let predicted = [0, 1, 1, 2, 0];
        let matrix = confusion_matrix(&actual, &predicted, 3);
        assert_eq!(matrix[0], vec![1, 1, 0]);
        assert_eq!(matrix[1], vec![0, 1, 0]);
        assert_eq!(matrix[2], vec![1, 0, 1]);
    }

    #[test]
    fn report_computes_f1_from_precision_and_recall() {
        let actual = [1, 1, 0, 0];
        let predicted = [1, 0, 1, 0];
        let report = classification_report(&actual, &predicted, &["miss", "hit"]);

        assert_eq!(report[1].support, 2);
        assert_relative_eq!(report[1].f1, 0.5);

        // A class with neither predictions nor rows gets all zeros
        let empty = classification_report(&[0], &[0], &["only", "never"]);
        assert_relative_eq!(empty[1].f1, 0.0);
    }
}
