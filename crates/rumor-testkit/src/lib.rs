//! # Rumor Testkit
//!
//! Testing utilities for Rumor.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Wire vectors**: exact JSON for each message kind, for cross-implementation checks
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: in-memory clusters driven one round at a time
//!
//! ## Wire Vectors
//!
//! ```rust
//! use rumor_testkit::vectors::verify_all_vectors;
//!
//! for (name, ok) in verify_all_vectors() {
//!     assert!(ok, "{}", name);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use rumor_testkit::generators::{record_set, summary_vector};
//! use rumor_sync::missing_records;
//!
//! proptest! {
//!     #[test]
//!     fn delta_never_covered(records in record_set(20), want in summary_vector()) {
//!         // ...
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use rumor_testkit::fixtures::{stream_records, TestCluster};
//!
//! async fn example() -> rumor::Result<()> {
//!     let cluster = TestCluster::fully_connected(3).await?;
//!     cluster.seed(0, &stream_records("news", 5)).await?;
//!     assert_eq!(cluster.converge(2).await?, Some(1));
//!     Ok(())
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{stream_records, TestCluster, TestNode};
pub use vectors::{all_vectors, verify_all_vectors, WireVector};
