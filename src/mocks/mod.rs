//! Test doubles for the transport, the mail provider and the resolver.
//!
//! Public so integration tests and downstream crates can route sends
//! without network access.

mod provider;
mod transport;

pub use provider::{MockMailProvider, MockResolver};
pub use transport::{MockResponse, MockTransport};
