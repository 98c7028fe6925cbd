//! JSON-RPC API Layer
//!
//! Implements the JSON-RPC 2.0 server for the Transcache engine: render,
//! run, progress, bulk, status and admin methods.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use handler::{RpcHandler, RpcServices};
pub use server::{method, RpcServer, RpcServerConfig};
