//! Terminal front end for the nutrient prediction client.

pub mod args;
pub mod session;
pub mod transport;

pub use transport::UreqTransport;
