//! Shared test utilities for waretrack integration tests.
//!
//! This module provides:
//! - `TestHarness` with an in-memory database, a temp upload directory and a
//!   scripted field extractor
//! - Builders for item and transfer requests

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{png_bytes, ScriptedExtractor, TestHarness, OTHER_STEPS};
