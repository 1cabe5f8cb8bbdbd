//! Play area harness: drives the simulation kernel from the command line.
//!
//! - `runner`: builds and runs one simulation, timing it
//! - `results`: per-run records, batch summaries and JSON persistence

pub mod results;
pub mod runner;
