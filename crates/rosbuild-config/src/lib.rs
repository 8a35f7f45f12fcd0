//! KDL jobs-file parsing for the rosbuild CI master.
//!
//! A jobs file holds one `job` node per package plus an optional
//! `defaults` node whose values are merged into every job.

pub mod error;
pub mod jobs;

pub use error::{ConfigError, ConfigResult};
pub use jobs::{load_jobs, parse_jobs};
