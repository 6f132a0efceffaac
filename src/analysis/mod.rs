pub mod forest;
pub mod knn;
pub mod metrics;
pub mod split;
pub mod stats;
