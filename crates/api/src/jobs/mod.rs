//! Background jobs.

mod pool_metrics;
mod scheduler;
mod token_cleanup;

pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobScheduler};
pub use token_cleanup::TokenCleanupJob;
