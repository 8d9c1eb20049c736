//! Endpoint-mode transport: drives the storefront through its private
//! JSON API with ordered endpoint fallbacks, bearer/cookie session
//! material, and polite request pacing.

pub mod client;
pub mod endpoints;
pub mod geo;
pub mod transport;

pub use client::{ApiError, HttpClient};
pub use geo::{detect_location, GeoLocation};
pub use transport::HttpTransport;
