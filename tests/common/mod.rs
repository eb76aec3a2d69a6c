//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestPipeline, TRACK_1_ID};
//!
//! #[tokio::test]
//! async fn test_download_track() {
//!     let pipeline = TestPipeline::new();
//!     let report = pipeline
//!         .download_stage()
//!         .download_references(&[TRACK_1_ID.to_string()])
//!         .await;
//!     assert_eq!(report.counts().success, 1);
//! }
//! ```

mod constants;
mod fakes;
mod harness;

// Public API - this is what tests import
pub use constants::*;
pub use harness::{TestPipeline, TEST_ATTEMPTS, TEST_WORKERS};

#[allow(unused_imports)]
pub use fakes::{artist, track};
