//! Core domain types and traits for the rosbuild CI master configuration.
//!
//! This crate contains:
//! - Master registration surfaces (change sources, schedulers, builders)
//! - The change-source trait seam
//! - Build step and pipeline definitions
//! - Testbuild job specifications
//! - Secret references and storage abstractions
//! - Test outcome classification values

pub mod error;
pub mod job;
pub mod master;
pub mod outcome;
pub mod secret;
pub mod step;

pub use error::{Error, Result};
pub use outcome::TestOutcome;
