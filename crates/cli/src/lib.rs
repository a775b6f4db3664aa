//! Helpers shared by the `artifact-survey` binary and its tests.
pub mod geo;
pub mod output;
