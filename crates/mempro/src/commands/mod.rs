//! Command implementations for the mempro CLI.

pub mod memory;
