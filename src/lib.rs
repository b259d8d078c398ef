// src/lib.rs
//! Pull a one-dimension, one-metric Google Analytics report for every matching
//! view and sampling level, flatten it into a single table and persist it.

pub mod config;
pub mod duck;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod process;
pub mod schema;
pub mod sink;
