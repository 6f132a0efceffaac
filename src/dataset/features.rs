use crate::models::TrackRecord;
use chrono::{Datelike, NaiveDate};
use std::fmt;

/// A track is a hit when its popularity sits in the top quarter of the
/// dataset's popularity distribution.
pub const HIT_QUANTILE: f64 = 0.75;

pub const SUMMER_MONTHS: [u32; 3] = [6, 7, 8];

/// Quantile with linear interpolation between order statistics. Returns
/// None for an empty slice or values containing NaN.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || values.iter().any(|v| v.is_nan()) {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("no NaN after check"));

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Popularity threshold above which a track counts as a hit
pub fn hit_threshold(popularities: &[f64]) -> Option<f64> {
    quantile(popularities, HIT_QUANTILE)
}

pub fn is_hit(popularity: f64, threshold: f64) -> bool {
    popularity >= threshold
}

/// Three-way quantile bucketing of the popularity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PopularityClass {
    Low,
    Medium,
    High,
}

impl PopularityClass {
    pub const LABELS: [&'static str; 3] = ["Low", "Medium", "High"];

    pub fn index(self) -> usize {
        match self {
            PopularityClass::Low => 0,
            PopularityClass::Medium => 1,
            PopularityClass::High => 2,
        }
    }

}

impl fmt::Display for PopularityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::LABELS[self.index()])
    }
}

/// Tertile boundaries for the popularity classes: (q1/3, q2/3)
pub fn popularity_class_bounds(popularities: &[f64]) -> Option<(f64, f64)> {
    Some((
        quantile(popularities, 1.0 / 3.0)?,
        quantile(popularities, 2.0 / 3.0)?,
    ))
}

/// Bucket a popularity score using tertile bounds. Intervals are
/// right-closed, so a score exactly on a boundary falls in the lower class.
pub fn popularity_class(popularity: f64, bounds: (f64, f64)) -> PopularityClass {
    if popularity <= bounds.0 {
        PopularityClass::Low
    } else if popularity <= bounds.1 {
        PopularityClass::Medium
    } else {
        PopularityClass::High
    }
}

/// Extract the release month of a track's album, honoring the release-date
/// precision qualifier. Year-only precision carries no month, and malformed
/// dates parse to a missing month rather than an error.
pub fn release_month(record: &TrackRecord) -> Option<u32> {
    let date = record.album_release_date.as_deref()?;

    match record.release_date_precision.as_deref() {
        Some("day") | None => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .ok()
            .map(|d| d.month()),
        Some("month") => NaiveDate::parse_from_str(&format!("{date}-01"), "%Y-%m-%d")
            .ok()
            .map(|d| d.month()),
        _ => None,
    }
}

pub fn is_summer(month: u32) -> bool {
    SUMMER_MONTHS.contains(&month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record_with_date(date: Option<&str>, precision: Option<&str>) -> TrackRecord {
        TrackRecord {
            track_id: "t1".to_string(),
            track_name: None,
            artist_id: None,
            artist_name: None,
            album_id: None,
            album_name: None,
            album_release_date: date.map(str::to_string),
            release_date_precision: precision.map(str::to_string),
            popularity: Some(50),
            duration_ms: Some(180_000),
            explicit: Some(false),
            source: None,
            source_id: None,
        }
    }

    #[test]
    fn quantile_interpolates_between_order_statistics() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(quantile(&values, 0.5).unwrap(), 2.5);
        assert_relative_eq!(quantile(&values, 0.75).unwrap(), 3.25);
        assert_relative_eq!(quantile(&values, 0.0).unwrap(), 1.0);
        assert_relative_eq!(quantile(&values, 1.0).unwrap(), 4.0);
    }

    #[test]
    fn quantile_of_empty_slice_is_none() {
        assert!(quantile(&[], 0.5).is_none());
    }

    #[test]
    fn hit_threshold_marks_the_top_quarter() {
        let popularities: Vec<f64> = (1..=100).map(f64::from).collect();
        let threshold = hit_threshold(&popularities).unwrap();
        assert_relative_eq!(threshold, 75.25);

        assert!(is_hit(80.0, threshold));
        assert!(!is_hit(75.0, threshold));

        let hits = popularities.iter().filter(|&&p| is_hit(p, threshold)).count();
        assert_eq!(hits, 25);
    }

    #[test]
    fn popularity_classes_are_right_closed_tertiles() {
        let popularities: Vec<f64> = (0..=90).map(f64::from).collect();
        let bounds = popularity_class_bounds(&popularities).unwrap();
        assert_relative_eq!(bounds.0, 30.0);
        assert_relative_eq!(bounds.1, 60.0);

        assert_eq!(popularity_class(30.0, bounds), PopularityClass::Low);
        assert_eq!(popularity_class(31.0, bounds), PopularityClass::Medium);
        assert_eq!(popularity_class(60.0, bounds), PopularityClass::Medium);
        assert_eq!(popularity_class(61.0, bounds), PopularityClass::High);
    }

    #[test]
    fn release_month_respects_precision() {
        let day = record_with_date(Some("2021-07-09"), Some("day"));
        assert_eq!(release_month(&day), Some(7));

        let month = record_with_date(Some("2021-07"), Some("month"));
        assert_eq!(release_month(&month), Some(7));

        let year = record_with_date(Some("2021"), Some("year"));
        assert_eq!(release_month(&year), None);
    }

    #[test]
    fn malformed_dates_yield_a_missing_month() {
        let garbage = record_with_date(Some("not-a-date"), Some("day"));
        assert_eq!(release_month(&garbage), None);

        let absent = record_with_date(None, Some("day"));
        assert_eq!(release_month(&absent), None);
    }

    #[test]
    fn summer_covers_june_through_august() {
        assert!(is_summer(6));
        assert!(is_summer(8));
        assert!(!is_summer(5));
        assert!(!is_summer(9));
    }
}
