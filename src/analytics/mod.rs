//! Analytics over a record snapshot.
//!
//! Everything here is a pure function of the records passed in; nothing is
//! cached between calls.

pub mod insights;
pub mod instances;
pub mod metrics;

pub use insights::{all_owners, find_outliers, Observation, ObservationKind};
pub use instances::{best_per_instance, size_distribution, InstanceBest, SizeDistribution};
pub use metrics::{compute, rank_owners, OwnerMetrics, OwnerRanking, SizeBucket};
