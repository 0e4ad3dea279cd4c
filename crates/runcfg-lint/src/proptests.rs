//! Property-based tests for the built-in rules.
