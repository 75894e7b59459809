//! Integration test common infrastructure.
//!
//! Spawns the `bazaard` binary against a throwaway config and database, and
//! provides a small JSON client for driving its HTTP API.

pub mod server;

#[allow(unused_imports)]
pub use server::{ADMIN_PASSWORD, TOKEN_SECRET, TestServer};
