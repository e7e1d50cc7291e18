//! The lagline link test evaluation tool.
//!
//! This library supports the lagline binary found elsewhere in this
//! project. A campaign of runs is discovered on disk, each run's two
//! captures are reconciled through `lagline-core` and the results are
//! written out as structured per-run reports for downstream table and
//! diagram tooling.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::multiple_crate_versions)]

pub mod campaign;
pub mod config;
pub mod evaluator;
pub mod report;
