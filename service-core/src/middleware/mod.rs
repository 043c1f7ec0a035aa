pub mod rate_limit;
pub mod recover;
pub mod tracing;
