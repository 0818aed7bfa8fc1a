//! Common utilities shared by the experiment binary and the integration tests.
//!
//! - **`generators`**: seeded constructors for the dense and sparse random test
//!   problems, so that every run of an experiment sees the same matrices.

pub mod generators;
