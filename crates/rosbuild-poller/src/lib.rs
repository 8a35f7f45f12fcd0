//! Pull-request change source for the rosbuild CI master.
//!
//! Supplies configuration and instance identity for a pull-request poller:
//! per-instance naming, authentication-token rendering, checkout-link
//! styles and the outbound fetch of open pull requests. The poll loop
//! itself (scheduling, diffing, change emission) is owned by the executing
//! framework.

pub mod change_source;
pub mod client;
pub mod pull_request;

pub use change_source::{
    LinkStyle, PrChangeSource, PrPollerSettings, DEFAULT_POLL_INTERVAL, HOSTED_BASE_URL,
};
pub use client::HttpClientPool;
pub use pull_request::{PrFilter, PullRequest};
