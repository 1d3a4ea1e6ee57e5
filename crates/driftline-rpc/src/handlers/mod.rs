// crates/driftline-rpc/src/handlers/mod.rs
//
// Handler modules for the HTTP endpoints. Each module defines its
// request/response types and handler function.

pub mod health;
pub mod predict;
