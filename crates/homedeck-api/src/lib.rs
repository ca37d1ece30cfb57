// homedeck-api: Async Rust client for the Home Assistant REST API

pub mod client;
pub mod error;
pub mod transport;

pub use client::HubClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
