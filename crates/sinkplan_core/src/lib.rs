pub mod arrays;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod execution;
pub mod explain;
pub mod expr;
pub mod flatten;
pub mod optimizer;
pub mod plan;

#[cfg(test)]
mod testutil;
