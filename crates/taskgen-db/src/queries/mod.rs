//! Query functions, one module per table.

pub mod specs;
pub mod tasks;
