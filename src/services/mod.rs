pub mod comparative;
pub mod drive_aggregator;
pub mod momentum;
pub mod outcome_classifier;
pub mod upset_report;

pub use comparative::*;
pub use momentum::*;
pub use outcome_classifier::*;
