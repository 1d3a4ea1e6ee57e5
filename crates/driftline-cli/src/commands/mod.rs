// crates/driftline-cli/src/commands/mod.rs
//
// Command module declarations for the driftline CLI.

pub mod drift;
pub mod evaluate;
pub mod fit;
pub mod reference;
pub mod serve;
