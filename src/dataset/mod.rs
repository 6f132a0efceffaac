pub mod features;
pub mod store;
