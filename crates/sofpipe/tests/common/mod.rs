//! Shared utilities for sofpipe integration tests.
//!
//! - `fakes`: scripted recognition, classification and extraction services
//! - `harness`: temp directories and pipeline construction

pub mod fakes;
pub mod harness;

pub use fakes::*;
pub use harness::TestHarness;
