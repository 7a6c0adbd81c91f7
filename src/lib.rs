//! Graphcomputer runs vertex-centric graph programs in bulk-synchronous supersteps.
//!
//! A [`program::VertexProgram`] is executed for every vertex of a graph in each superstep,
//! partitioned across worker threads. Vertices exchange messages that are delivered at the next
//! superstep, and contribute to a shared [`memory::Memory`] that is combined at every barrier.
//! Runs are submitted to a [`computer::GraphComputer`] and end when every vertex has voted to
//! halt with no messages in flight, when the program decides to terminate, or on failure.

// Enable warnings for all clippy lints. This automatically enables new lints shipped with new rust
// versions.
#![warn(
    clippy::correctness,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::pedantic,
    clippy::cargo,
    clippy::restriction
)]
// Now selectively disable unneeded lints.
#![allow(
    clippy::indexing_slicing,               // Allow `vec[i]` indexing.
    clippy::module_name_repetitions,        // Allow.
    clippy::use_debug,                      // Allow.
    clippy::float_arithmetic,               // Allow.
    clippy::integer_arithmetic,             // Allow.
    clippy::integer_division,               // Allow.
    clippy::implicit_return,                // Allow.
    clippy::too_many_arguments,             // Allow.
    clippy::use_self,                       // Allow.
    clippy::shadow_same,                    // Allow.
    clippy::too_many_lines,                 // Allow.
    clippy::multiple_crate_versions,        // Disabled.
    clippy::missing_docs_in_private_items,  // Disabled.
    clippy::missing_errors_doc,             // Disabled.
    clippy::missing_inline_in_public_items, // Disabled.
    clippy::unknown_clippy_lints,           // To enable naming new lints added to nightly.
    clippy::cognitive_complexity,           // Disabled.
    clippy::result_expect_used,             // Should use `expect` rather than `unwrap`.
    clippy::option_expect_used,             // Should use `expect` rather than `unwrap`.
    clippy::panic,                          // Allow.
    clippy::unreachable,                    // Allow.
    clippy::todo,                           // Allow.
    clippy::must_use_candidate,             // Allow.
    clippy::inline_always,                  // Allow.
    clippy::as_conversions,                 // Allow but only when absolutely necessary.
    clippy::implicit_hasher                 // Default hasher is fine for now.
)]
// Do not allow print statements. Use `log::info!()` or equivalent instead.
#![deny(clippy::print_stdout)]

pub mod computer;
pub mod error;
pub mod graph;
pub mod memory;
pub mod messenger;
pub mod program;
pub mod programs;
pub mod util;

#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate derive_new;

pub use crate::computer::{ComputerConfig, ComputerFuture, ComputerResult, GraphComputer};
pub use crate::error::GCError;
pub use crate::program::{VertexContext, VertexProgram};
