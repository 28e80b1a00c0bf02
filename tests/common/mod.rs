//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - Backends wired to a mock HTTP server
//! - Session and payload fixtures
//! - Custom assertion macros

#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;

// Re-export commonly used utilities
pub use fixtures::*;
