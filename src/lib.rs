//! Pastiche Engine — statistical imitation of dramatic dialogue.
//!
//! Learns who speaks after whom, what shape sentences take, and which words
//! each character uses, then writes new scenes in the style of a source
//! play without neural network inference.

pub mod core;
pub mod schema;

pub use crate::core::pipeline::{PlayGenerator, PipelineError, Script};
pub use crate::schema::play::{Play, Speaker};
