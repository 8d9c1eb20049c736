//! Page-mode transport: drives the storefront's rendered UI through a
//! [`PageDriver`] implementation, with outcome probes standing in for the
//! status codes the endpoint surface would give.

pub mod driver;
pub mod selectors;
pub mod transport;

pub use driver::{PageDriver, PageFault};
pub use transport::PageTransport;
