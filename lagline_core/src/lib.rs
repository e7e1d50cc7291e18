//! The lagline reconciliation core
//!
//! This library holds the two pure computations the rest of the lagline
//! project is built around: matching independently captured timestamp
//! streams into per-datagram latency records and repairing polled loss
//! counters into monotonic per-interval series. Everything here is
//! synchronous and operates on fully materialized collections; callers own
//! all I/O.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(clippy::unwrap_used)]
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

pub mod reconcile;
pub mod repair;
