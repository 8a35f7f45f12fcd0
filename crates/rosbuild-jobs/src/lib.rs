//! Testbuild job assembly and result classification.
//!
//! [`ros_testbuild`] wires a source repository into a named CI job: a
//! change source, a single-branch trigger rule, a five-step chroot build
//! pipeline and a builder registration. [`classifier`] maps the raw
//! outcome of the test step to a three-valued result.

pub mod classifier;
pub mod testbuild;

pub use classifier::classify;
pub use testbuild::{parse_ssh_url, ros_testbuild};
