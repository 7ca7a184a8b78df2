//! Core generation logic for examplegen.
//!
//! This crate ties together discovery, notebook normalization, workflow
//! planning/rendering and README emission into one end-to-end run
//! ([`pipeline::generate`]).

pub mod notebook;
pub mod pipeline;
pub mod readme;
pub mod schedule;
pub mod workflow;
