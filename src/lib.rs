//! Maximum set-cover quadratic binary functions (MAX-SC-QBF).
//!
//! Instances pick a family of subsets of `{1..n}` maximising a quadratic objective over
//! the selection variables, subject to covering every element some subset contains. The
//! crate reads and generates instances, linearizes them into 0/1 integer programs, solves
//! them through a pluggable engine and runs batches of instances with per-batch logs.

pub mod experiment;
pub mod instance;
pub mod model;
pub mod report;
pub mod solver;
pub mod utils;
