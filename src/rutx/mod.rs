//! Teltonika RUTX router REST integration
//!
//! - `transport`: HTTPS transport (self-signed certs accepted)
//! - `session`: Login token lifecycle
//! - `client`: SMS, signal and status operations
//! - `poller`: Background connection/signal polling

pub mod client;
pub mod poller;
pub mod session;
pub mod transport;

pub use client::RouterClient;
pub use poller::StatusPoller;
