//! Vertex programs shipped with the crate, and the registry the binary runs them through.

pub mod builder;
pub mod max_value;
pub mod pagerank;
pub mod sssp;
pub mod wcc;

#[cfg(test)]
mod tests;
