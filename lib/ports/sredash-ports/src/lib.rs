//! Port traits for the dashboard's outbound I/O.

mod error;
mod http;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use error::ProbeError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
