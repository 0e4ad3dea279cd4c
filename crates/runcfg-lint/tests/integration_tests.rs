//! Integration test suite for runcfg-lint.
//!
//! Lints the documents under `tests/fixtures/` end to end: loading,
//! interpolation, schema projection, reference following and reporting.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;
mod integration;
