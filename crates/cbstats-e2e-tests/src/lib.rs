//! End-to-end integration tests for cbstats.
//!
//! These tests exercise the full discovery pipeline:
//! - Zip archive extraction into bundle directories
//! - Bucket parsing for every config dump format
//! - Name disambiguation and port assignment
//! - Time range estimation across sources
//! - Live cluster discovery against a fake management API

#![cfg(test)]
