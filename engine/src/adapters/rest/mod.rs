//! REST API Driving Adapter
//!
//! Read-only aggregate status over HTTP (JSON)
//!
//! Supports two transports:
//! - Unix sockets (Linux/macOS)
//! - TCP (all platforms)

pub mod handlers;
pub mod router;
pub mod unix_socket;

pub use router::build_router;
#[cfg(unix)]
pub use unix_socket::serve_on_unix_socket;
pub use unix_socket::{serve_on_tcp, ServeError};
