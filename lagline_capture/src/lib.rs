//! Crate regarding lagline's capture files
//!
//! A run under test leaves two capture directories behind, one per
//! observation point: a YAML run description and a line-delimited JSON
//! capture of timestamped datagram observations, loss-counter polls and
//! the end-of-run summary. This crate holds the typed form of those files
//! and the reader that loads them.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::perf)]
#![deny(clippy::suspicious)]
#![deny(clippy::complexity)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]

pub mod description;
pub mod json;
pub mod reader;
